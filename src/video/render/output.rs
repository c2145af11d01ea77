use std::path::Path;

use anyhow::{Context, Result, bail};

pub(super) fn prepare_output_destination(output_path: &Path, inputs: &[&Path]) -> Result<()> {
    if inputs.iter().any(|input| *input == output_path) {
        bail!(
            "Output path {} would overwrite one of its inputs",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    Ok(())
}
