//! Settings error types.

/// Errors that can occur when loading, saving, or validating settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write the settings file to disk.
    #[error("failed to write settings: {0}")]
    WriteError(#[source] std::io::Error),

    /// Failed to parse RON content.
    #[error("failed to parse settings: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// Failed to serialize settings to RON.
    #[error("failed to serialize settings: {0}")]
    SerializeError(#[source] ron::Error),

    /// A settings value (or combination of values) is out of range.
    ///
    /// Raised at startup by [`Settings::validate`]; the engine refuses to
    /// construct with invalid settings rather than degrade silently.
    ///
    /// [`Settings::validate`]: crate::Settings::validate
    #[error("invalid settings: {0}")]
    Invalid(String),
}
