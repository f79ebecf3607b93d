//! Errors that can occur in uvconv

use thiserror::Error;

use crate::io::error::IOError;

#[derive(Error, Debug)]
/// Errors that can occur on the command line
pub enum CLIError {
    #[error("Invalid Command Line Argument {option}, expected {expected}, received {received}")]
    /// When an invalid command line argument is provided
    InvalidCommandLineArgument {
        /// The option for which the argument was provided
        option: String,
        /// The argument that was expected
        expected: String,
        /// The argument that was received instead
        received: String,
    },
}

/// An enum of all the errors possible in uvconv
#[derive(Error, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum UvConvError {
    /// A value was outside the domain of an operation (antenna ids, angles).
    #[error("{function}: {argument} is out of range, expected {expected}, received {received}")]
    Domain {
        /// The function that rejected the value
        function: String,
        /// The argument that was out of range
        argument: String,
        /// The valid domain
        expected: String,
        /// The value that was received
        received: String,
    },

    /// A phase centre name that is neither zenith nor in the source catalogue.
    #[error("Unknown source {name}. Known sources: {known}")]
    UnknownSource {
        /// The name that could not be resolved
        name: String,
        /// The names that can be resolved
        known: String,
    },

    /// The FLUX column can't be viewed as single precision (re, im) pairs.
    #[error("{function}: FLUX must be interleaved f32 (re, im) pairs, found {found}")]
    InvalidFluxType {
        /// The function that needed a complex view
        function: String,
        /// A description of the storage that was found
        found: String,
    },

    /// No cable delay table is available for the telescope.
    #[error("No cable delay calibration available for telescope {telescope}")]
    NoCalibrationData {
        /// The telescope that was looked up
        telescope: String,
    },

    /// Cable delays have already been applied to these visibilities.
    #[error("Cable delays (generated {date_generated}) were already applied")]
    CableDelaysAlreadyApplied {
        /// The calibration date of the delays already applied
        date_generated: String,
    },

    /// Attempted to unphase from a centre other than the current one.
    #[error("Visibilities are phased to {current}, not {requested}")]
    PhaseCentreMismatch {
        /// The phase centre currently recorded in the SOURCE table
        current: String,
        /// The phase centre that was requested
        requested: String,
    },

    /// A polarisation product that can't be corrected per feed.
    #[error("{function}: stokes code {code} has no per-feed polarisation pair")]
    InvalidStokes {
        /// The function that rejected the product
        function: String,
        /// The stokes code
        code: i32,
    },

    /// Averaging factors that don't divide the data evenly.
    #[error("Cannot decimate {axis} of length {length} by {factor} exactly")]
    NonIntegerDecimation {
        /// `"time"` or `"frequency"`
        axis: String,
        /// The number of integrations or channels
        length: usize,
        /// The averaging factor
        factor: usize,
    },

    /// Averaging would leave nothing behind.
    #[error("Not enough {axis} to average: {length} < {factor}")]
    InsufficientData {
        /// `"time"` or `"frequency"`
        axis: String,
        /// The number of integrations or channels
        length: usize,
        /// The averaging factor
        factor: usize,
    },

    /// A store-level invariant does not hold.
    #[error("Verification failed: {reason}")]
    Verification {
        /// What went wrong
        reason: String,
    },

    #[error("bad array shape supplied to argument {argument} of function {function}. expected {expected}, received {received}")]
    /// Error for bad array shape in provided argument
    BadArrayShape {
        /// The argument name within the funciton
        argument: String,
        /// The function name
        function: String,
        /// The expected shape
        expected: String,
        /// The shape that was received instead
        received: String,
    },

    #[error("Invalid argument {argument} to {function}: {reason}")]
    /// Error for an argument which is the right type but the wrong value
    InvalidArgument {
        /// The argument name
        argument: String,
        /// The function name
        function: String,
        /// Why the value is invalid
        reason: String,
    },

    #[error(transparent)]
    /// Error derived from [`crate::io::error::IOError`]
    IOError(#[from] IOError),

    #[error(transparent)]
    /// Error derived from [`CLIError`]
    CLIError(#[from] CLIError),

    #[cfg(feature = "cli")]
    #[error(transparent)]
    /// Error derived from [`clap::Error`]
    ClapError(#[from] clap::Error),

    #[error("Dry run")]
    /// Dry run, no processing was done
    DryRun {},
}
