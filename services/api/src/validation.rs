//! Input validation utilities

/// Require a non-blank text field, returning it unchanged
pub fn required_text<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(format!("{} required", field)),
    }
}

/// Optional text field where blank counts as absent
pub fn optional_text(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}
