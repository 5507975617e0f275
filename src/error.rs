//! Error types for the print pipeline

use thiserror::Error;

/// Result type alias for print operations
pub type Result<T> = std::result::Result<T, Error>;

/// Notice shown when the content element cannot be resolved
pub const CONTENT_NOT_FOUND_NOTICE: &str = "Content not found!";

/// Notice shown when the host refuses to open a popup
pub const POPUP_BLOCKED_NOTICE: &str = "Pop-up blocked. Please allow pop-ups for this site.";

/// Errors that can occur while rendering a print popup
///
/// A print call silently ignored by the platform is not represented here: the
/// host has no way to observe it, so it is never reported.
#[derive(Error, Debug)]
pub enum Error {
    /// The identified element is absent from the page
    #[error("Content not found: {0}")]
    ContentNotFound(String),

    /// The host refused to create a new browsing context
    #[error("Pop-up blocked")]
    PopupBlocked,

    /// A write was attempted after the popup document was sealed
    #[error("Popup document is already sealed")]
    DocumentSealed,

    /// Writing into the popup document failed
    #[error("Failed to write popup document: {0}")]
    DocumentWrite(String),

    /// Failed to load the source page
    #[error("Failed to load page: {0}")]
    LoadError(String),

    /// Invalid configuration or preset
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// I/O error (spooling, preset files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The user-facing notice for failures that surface one
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Error::ContentNotFound(_) => Some(CONTENT_NOT_FOUND_NOTICE),
            Error::PopupBlocked => Some(POPUP_BLOCKED_NOTICE),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
