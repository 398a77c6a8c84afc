//! Errors returned across the scrape/store boundary.

use crate::browser::BrowserError;
use crate::domain::{InvalidLineId, InvalidLineType, LineId};

/// A failed lookup, carrying the HTTP status it maps to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScrapeError {
    /// The line or type is not advertised by the source site
    #[error("{message}")]
    NotFound { message: String },

    /// The request named something malformed
    #[error("{message}")]
    InvalidInput { message: String },

    /// The page didn't load, lacked the expected structure, or extraction failed
    #[error("{message}")]
    Upstream { message: String },
}

impl ScrapeError {
    pub fn line_not_found(id: &LineId) -> Self {
        ScrapeError::NotFound {
            message: format!("Line {id} not found"),
        }
    }

    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ScrapeError::NotFound { .. } => 404,
            ScrapeError::InvalidInput { .. } => 400,
            ScrapeError::Upstream { .. } => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ScrapeError::NotFound { message }
            | ScrapeError::InvalidInput { message }
            | ScrapeError::Upstream { message } => message,
        }
    }
}

impl From<BrowserError> for ScrapeError {
    fn from(e: BrowserError) -> Self {
        ScrapeError::Upstream {
            message: e.to_string(),
        }
    }
}

impl From<InvalidLineId> for ScrapeError {
    fn from(e: InvalidLineId) -> Self {
        ScrapeError::InvalidInput {
            message: e.to_string(),
        }
    }
}

impl From<InvalidLineType> for ScrapeError {
    fn from(e: InvalidLineType) -> Self {
        ScrapeError::InvalidInput {
            message: e.to_string(),
        }
    }
}
