//! Error types for `sedoc_core`.
//!
//! All per-call failures are funnelled through [`SolidEdgeError`], which
//! uses `thiserror` for `Display` and `Error` derives.  Per-item failures
//! (one document, one property) never reach this type: the iterators turn
//! them into skips.

use thiserror::Error;

/// Top-level error type for the `sedoc_core` library.
///
/// Each variant corresponds to a distinct subsystem.
#[derive(Debug, Error)]
pub enum SolidEdgeError {
    /// The running application could not be reached (not running, or no
    /// active document where one is required).
    #[error("HostUnavailable: {0}")]
    HostUnavailable(String),

    /// COM runtime / IDispatch failure.
    #[error("ComError: {0}")]
    ComError(String),

    /// A document member could not be read or had an unexpected shape.
    #[error("DocumentError: {0}")]
    DocumentError(String),

    /// Property set or property member failure.
    #[error("PropertyError: {0}")]
    PropertyError(String),
}

impl SolidEdgeError {
    /// `true` when the failure means the host itself is out of reach, as
    /// opposed to "connected but something went wrong".
    pub fn is_host_unavailable(&self) -> bool {
        matches!(self, Self::HostUnavailable(_))
    }
}

/// Convert a `windows::core::Error` (COM HRESULT failure) into a
/// `SolidEdgeError::ComError`.
#[cfg(windows)]
impl From<windows::core::Error> for SolidEdgeError {
    fn from(err: windows::core::Error) -> Self {
        SolidEdgeError::ComError(format!("Windows COM error: {err}"))
    }
}
