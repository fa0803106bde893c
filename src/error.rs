//! Error type shared by the loader, config, report and server layers
//!
//! The filter engine itself never fails: absent fields are match sentinels and
//! undo/redo past the end of history is a no-op. Errors only appear at the
//! edges, where text from files, flags or HTTP bodies becomes typed values.

use thiserror::Error;

use crate::facet::Facet;

/// Errors surfaced by cinefacet.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O failure while reading a dataset, config or writing a report.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV reader or writer rejected the input.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Query string could not be decoded.
    #[error("query string error: {0}")]
    UrlEncoded(#[from] serde_urlencoded::de::Error),

    /// The dataset header lacks a required column.
    #[error("dataset is missing required column '{0}'")]
    MissingColumn(String),

    /// A facet-encoded string did not parse for its facet.
    #[error("invalid {facet} value '{value}'")]
    InvalidValue { facet: Facet, value: String },

    /// A name (facet, metric, column) was not recognised.
    #[error("unknown {kind} '{name}'")]
    Unknown { kind: &'static str, name: String },

    /// A numeric predicate was applied to a facet whose values are not numbers.
    #[error("facet '{0}' has no numeric values")]
    NotNumeric(Facet),

    /// A numeric filter expression could not be understood.
    #[error("invalid numeric filter: {0}")]
    InvalidNumericFilter(String),

    /// No dataset file could be located.
    #[error("no CSV dataset found at {0}")]
    NoDataset(String),

    /// Configuration values are inconsistent.
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_message_names_facet() {
        let err = Error::InvalidValue {
            facet: Facet::Year,
            value: "20x0".to_string(),
        };
        assert_eq!(err.to_string(), "invalid year value '20x0'");
    }

    #[test]
    fn test_unknown_name_message() {
        let err = Error::Unknown {
            kind: "facet",
            name: "colour".to_string(),
        };
        assert_eq!(err.to_string(), "unknown facet 'colour'");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
