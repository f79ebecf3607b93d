// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Useful constants.
//!
//! All constants *must* be double precision.

/// Speed of light in a vacuum \[m/s\]
pub const VEL_C: f64 = 299_792_458.0;

/// Largest antenna id representable in a baseline id.
pub const MAX_ANTENNA_ID: usize = 2047;
/// Largest antenna id which uses the compact (`256 * a1 + a2`) baseline encoding.
pub const MAX_COMPACT_ANTENNA_ID: usize = 255;
/// Offset added to baseline ids using the extended (`2048 * a1 + a2`) encoding.
pub const EXTENDED_BASELINE_OFFSET: usize = 65_536;

// WGS84 ellipsoid
/// WGS84 semi-major axis \[m\]
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// GRS80 semi-major axis \[m\]
pub const GRS80_A: f64 = 6_378_137.0;
/// GRS80 flattening
pub const GRS80_F: f64 = 1.0 / 298.257_222_101;
/// WGS72 semi-major axis \[m\]
pub const WGS72_A: f64 = 6_378_135.0;
/// WGS72 flattening
pub const WGS72_F: f64 = 1.0 / 298.26;

/// Julian date of the J2000 epoch.
pub const J2000_JD: f64 = 2_451_545.0;

// LWA at the Owens Valley Radio Observatory, home of LEDA-512.
/// OVRO-LWA latitude \[degrees\]
pub const OVRO_LATITUDE_DEG: f64 = 37.240_391;
/// OVRO-LWA longitude \[degrees\]
pub const OVRO_LONGITUDE_DEG: f64 = -118.2;
/// OVRO-LWA elevation \[metres\]
pub const OVRO_ELEVATION_M: f64 = 1184.0;

// LWA1, New Mexico.
/// LWA1 latitude \[degrees\]
pub const LWA1_LATITUDE_DEG: f64 = 34.070;
/// LWA1 longitude \[degrees\]
pub const LWA1_LONGITUDE_DEG: f64 = -107.628;
/// LWA1 elevation \[metres\]
pub const LWA1_ELEVATION_M: f64 = 2133.6;

/// Nominal LEDA correlator integration time \[s\]
pub const LEDA_INT_TIME_S: f64 = 8.33333;
/// LEDA correlator channel width \[Hz\]
pub const LEDA_CHAN_WIDTH_HZ: f64 = 24e3;
/// LEDA sub-band bandwidth \[Hz\]
pub const LEDA_SUB_BW_HZ: f64 = 2.616e6;
/// TELESCOP value written for OVRO
pub const LEDA_TELESCOP: &str = "LWA-OVRO";
/// ARRNAM value written for OVRO
pub const LEDA_ARRNAM: &str = "LEDA-512";
