//! Settings and policy persistence errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration or reading/writing the policy.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing a file failed.
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A file held invalid JSON, or JSON of the wrong shape.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The host settings file exists but its top level is not an object,
    /// so the policy cannot be stored under a key without clobbering it.
    #[error("host settings file {} is not a JSON object", .0.display())]
    NotAnObject(PathBuf),

    /// A value failed validation.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),

    /// The backing store refused the operation.
    #[error("policy store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_mark_lifts_io_and_json_failures() {
        fn read(path: &str) -> Result<serde_json::Value> {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        let missing = read("/nonexistent/breakline/settings.json").unwrap_err();
        assert!(matches!(missing, SettingsError::Io(_)));
        assert!(missing.to_string().starts_with("settings I/O failed"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{hideLeading: yes}").unwrap();
        let bad = read(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(bad, SettingsError::Json(_)));
    }

    #[test]
    fn not_an_object_names_the_file() {
        let err = SettingsError::NotAnObject(PathBuf::from("/tmp/host.json"));
        assert_eq!(
            err.to_string(),
            "host settings file /tmp/host.json is not a JSON object"
        );
    }

    #[test]
    fn store_refusals_carry_their_reason() {
        let err = SettingsError::Unavailable("read-only".into());
        assert_eq!(err.to_string(), "policy store unavailable: read-only");
    }
}
