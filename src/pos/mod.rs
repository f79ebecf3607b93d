// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Positional coordinate types.

pub mod earth;
pub mod sidereal;
pub mod source;
pub mod uvw;
pub mod xyz;

// Re-exports.
pub use earth::{ecef_to_geodetic, Ellipsoid, LatLngHeight};
pub use sidereal::sidereal_time;
pub use source::{SourceCatalogue, SourcePosition, ZENITH};
pub use uvw::{compute_baseline_vectors, compute_uvw, UVW};
pub use xyz::{XyzBaseline, XyzGeocentric, XyzGeodetic};
