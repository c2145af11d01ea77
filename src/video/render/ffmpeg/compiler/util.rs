use std::path::Path;

pub fn format_time(value: f64) -> String {
    format!("{value:.6}")
}

/// Backslash-escape `specials` (and the backslash itself).
fn backslash_escape(value: &str, specials: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '\\' || specials.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Escape a path used as an unquoted filter option value.
///
/// The value is unescaped twice: first by the filtergraph parser, then by
/// the filter's option parser.
pub fn escape_ffmpeg_path(path: &Path) -> String {
    let option_level = backslash_escape(&path.to_string_lossy(), &['\'', ':']);
    backslash_escape(&option_level, &['\'', '[', ']', ',', ';'])
}

/// Escape a caption word for a single-quoted drawtext `text` value.
///
/// The filtergraph parser strips the quotes and keeps their content as is.
/// The option parser then removes one level of backslashes, and drawtext's
/// text expansion treats `\` and `%` as special, so those two need a double
/// escape. A straight apostrophe cannot appear inside a quoted value and is
/// rendered as a typographic one.
pub fn escape_drawtext_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\\\\\"),
            '%' => escaped.push_str("\\\\%"),
            '\'' => escaped.push('\u{2019}'),
            ':' | ',' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}
