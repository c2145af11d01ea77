use serde_json::Value;

use crate::ui::prelude::{Level, emit};

pub(super) fn log_event(level: Level, code: &str, message: impl Into<String>) {
    emit(level, code, &message.into(), None);
}

/// Like [`log_event`], with a JSON payload for `--format json` consumers.
pub(super) fn log_event_with(level: Level, code: &str, message: impl Into<String>, data: Value) {
    emit(level, code, &message.into(), Some(data));
}
