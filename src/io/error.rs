//! Errors that can occur in the io module

use thiserror::Error;

#[derive(Error, Debug)]
#[allow(clippy::upper_case_acronyms)]
/// All the errors that can occur in file io operations
pub enum IOError {
    #[error("{0}")]
    /// Error derived from [`std::io::Error`]
    StdIO(#[from] std::io::Error),

    #[error("{0}")]
    /// Error derived from [`serde_json::Error`]
    Json(#[from] serde_json::Error),

    #[error("Couldn't determine the format of {path}, expected one of {expected}")]
    /// Error for an input path with an unknown extension
    UnknownFormat {
        /// The path which couldn't be recognised
        path: String,
        /// The extensions which are understood
        expected: String,
    },

    #[error("Malformed date string {value}, expected {expected}")]
    /// Error for a DATE-OBS string that can't be parsed
    BadDate {
        /// The string that was received
        value: String,
        /// The expected format
        expected: String,
    },

    /// Error to describe some kind of inconsistent state within an input file.
    #[error("Inconsistent input (file: {file}, expected: {expected}, found: {found})")]
    Inconsistent {
        /// The filename or buffer where the error occurred
        file: String,
        /// The value that was expected
        expected: String,
        /// The unexpected value that was found
        found: String,
    },
}
