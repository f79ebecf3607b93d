#![warn(missing_docs)]
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::missing_errors_doc)]

//! uvconv is a library for converting, phasing and averaging the visibilities of a radio
//! interferometer, in particular the LEDA correlators at LWA-OVRO and LWA1.
//!
//! Visibilities are held in a [`VisibilityStore`]: a UV_DATA-style table of rows (one per
//! baseline and integration) along with the frequency, antenna, source, flag and cable delay
//! tables that describe them. Stores are read from JSON or from raw correlator matrices, go
//! through a [`PreprocessContext`], and are written back out as JSON.
//!
//! # Examples
//!
//! Ingest a raw correlator matrix, phase it to Cygnus A and average pairs of integrations.
//!
//! ```rust
//! use std::collections::HashMap;
//! use uvconv::{
//!     config::{Telescope, TelescopeConfig},
//!     io::{read_matrix, MatrixHeader},
//!     PreprocessContextBuilder,
//! };
//!
//! let header = MatrixHeader {
//!     telescope: "LWA-OVRO".into(),
//!     array_name: "LEDA-512".into(),
//!     num_ants: 2,
//!     num_chans: 4,
//!     utc_start: "2013-05-01-06:00:00".into(),
//!     int_time_s: 8.0,
//!     centre_freq_hz: 50e6,
//!     chan_width_hz: 24e3,
//!     antenna_positions: vec![],
//! };
//! let config = TelescopeConfig::from(Telescope::LwaOvro);
//!
//! // two integrations of a 2x2 matrix, 4 channels, 2x2 polarisations, complex64
//! let buffer = vec![0_u8; 2 * 2 * 2 * 4 * 4 * 8];
//! let mut store = read_matrix(buffer, &header, &config).unwrap();
//! assert_eq!(store.num_rows(), 6);
//!
//! let prep_ctx = PreprocessContextBuilder::default()
//!     .apply_cable_delays(false)
//!     .phase_centre(Some("CYG".into()))
//!     .avg_time(2)
//!     .draw_progress(false)
//!     .build()
//!     .unwrap();
//!
//! let mut durations = HashMap::new();
//! let report = prep_ctx
//!     .preprocess(&mut store, &config, &mut durations)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(report.num_integrations, 1);
//! assert_eq!(store.phase.current.name, "CYG");
//! ```

pub mod averaging;
pub mod baseline;
pub mod config;
pub mod constants;
pub mod corrections;
pub mod error;
pub mod io;
pub mod pos;
pub mod preprocessing;
pub mod selection;
pub mod store;
pub mod util;
pub mod verify;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
mod test_common;

pub use averaging::{average, AveragingMode};
pub use baseline::{decode_baseline, encode_baseline, Triangle};
pub use config::{Telescope, TelescopeConfig};
pub use corrections::{
    apply_cable_delays, generate_uvw, phase_to_source, remove_cable_delays, unphase_from_source,
};
pub use error::UvConvError;
pub use preprocessing::{PreprocessContext, PreprocessContextBuilder};
pub use store::{BaselineSelection, FluxBuffer, Stokes, VisibilityStore};
pub use verify::{verify, VerificationReport};

pub use hifitime;
pub use ndarray;
pub use num_complex::Complex;

/// Time `$body`, adding the elapsed time to `$durations[$name]`.
///
/// `$durations` is a `HashMap<String, std::time::Duration>`. Evaluates to the value of `$body`.
#[macro_export]
macro_rules! with_increment_duration {
    ($durations:expr, $name:literal, $body:expr) => {{
        let _now = std::time::Instant::now();
        let _res = $body;
        *$durations
            .entry($name.into())
            .or_insert(std::time::Duration::default()) += _now.elapsed();
        _res
    }};
}
