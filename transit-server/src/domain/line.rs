//! Line identifier and line-type types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an empty or blank line identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid line identifier: {reason}")]
pub struct InvalidLineId {
    reason: &'static str,
}

/// A transit line identifier such as "35", "M12", "24N" or "99B".
///
/// Identifiers are opaque tokens: no numeric parsing is done, and
/// classification only looks at leading and trailing characters.
/// A `LineId` is always non-empty, trimmed and upper-case.
///
/// # Examples
///
/// ```
/// use transit_server::domain::LineId;
///
/// let id = LineId::parse_normalized(" m12 ").unwrap();
/// assert_eq!(id.as_str(), "M12");
///
/// assert!(LineId::parse_normalized("   ").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(String);

impl LineId {
    /// Parse an identifier, trimming whitespace and upper-casing it.
    pub fn parse_normalized(s: &str) -> Result<Self, InvalidLineId> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(InvalidLineId {
                reason: "must not be empty",
            });
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(InvalidLineId {
                reason: "must not contain whitespace",
            });
        }

        Ok(LineId(trimmed.to_uppercase()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The line type this identifier belongs to.
    pub fn line_type(&self) -> LineType {
        LineType::classify(&self.0)
    }
}

impl fmt::Debug for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineId({})", self.0)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when a line-type name is not one of the five known types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown line type: {0}")]
pub struct InvalidLineType(pub String);

/// Scheduling category of a line; decides which listing page advertises it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Urban,
    Metropolitan,
    Night,
    Express,
    Supermarket,
}

impl LineType {
    /// Every line type, in listing order.
    pub const ALL: [LineType; 5] = [
        LineType::Urban,
        LineType::Metropolitan,
        LineType::Night,
        LineType::Express,
        LineType::Supermarket,
    ];

    /// Classify an identifier. First matching rule wins:
    ///
    /// 1. starts with `M` → metropolitan
    /// 2. ends with `N` → night
    /// 3. ends with `E` → express
    /// 4. starts with `99` → supermarket
    /// 5. anything else → urban
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_server::domain::LineType;
    ///
    /// assert_eq!(LineType::classify("M3E"), LineType::Metropolitan);
    /// assert_eq!(LineType::classify("24N"), LineType::Night);
    /// assert_eq!(LineType::classify("7"), LineType::Urban);
    /// ```
    pub fn classify(id: &str) -> LineType {
        if id.starts_with('M') {
            LineType::Metropolitan
        } else if id.ends_with('N') {
            LineType::Night
        } else if id.ends_with('E') {
            LineType::Express
        } else if id.starts_with("99") {
            LineType::Supermarket
        } else {
            LineType::Urban
        }
    }

    /// Path segment of this type's listing page, relative to the timetable root.
    pub fn slug(&self) -> &'static str {
        match self {
            LineType::Urban => "linii-urbane/",
            LineType::Metropolitan => "linii-metropolitane/",
            LineType::Night => "transport-noapte/",
            LineType::Express => "linie-expres/",
            LineType::Supermarket => "linii-supermarket/",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineType::Urban => "urban",
            LineType::Metropolitan => "metropolitan",
            LineType::Night => "night",
            LineType::Express => "express",
            LineType::Supermarket => "supermarket",
        }
    }
}

impl fmt::Display for LineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineType {
    type Err = InvalidLineType;

    /// Case-insensitive parse of a line-type name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        LineType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| InvalidLineType(s.to_string()))
    }
}
