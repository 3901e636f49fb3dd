//! Shared stderr diagnostics helpers.

/// Print a warning without aborting the run.
pub fn warn(msg: impl AsRef<str>) {
    eprintln!("WARN: {}", msg.as_ref());
}

/// Format a fatal error message consistently.
pub fn error_message(msg: impl Into<String>) -> String {
    format!("ERROR: {}", msg.into())
}
