// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Handling of Earth Coordinates (Latitude/Longitude/Height)

use serde::{Deserialize, Serialize};

use super::XyzGeocentric;
use crate::constants::{GRS80_A, GRS80_F, WGS72_A, WGS72_F, WGS84_A, WGS84_F};

/// Bowring iterations stop once the parametric latitude moves less than this \[radians\].
const BOWRING_TOLERANCE: f64 = 1e-14;
const BOWRING_MAX_ITERATIONS: usize = 16;

/// A position on the surface of an ellipsoidal Earth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLngHeight {
    /// Longitude \[radians\]
    pub longitude_rad: f64,
    /// Latitude \[radians\]
    pub latitude_rad: f64,
    /// Height above the ellipsoid \[meters\]
    pub height_metres: f64,
}

impl std::fmt::Display for LatLngHeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ lon {:.4}°, lat {:.4}°, height {:.1}m }}",
            self.longitude_rad.to_degrees(),
            self.latitude_rad.to_degrees(),
            self.height_metres
        )
    }
}

/// Reference ellipsoids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Ellipsoid {
    /// World Geodetic System 1984
    #[default]
    WGS84,
    /// Geodetic Reference System 1980
    GRS80,
    /// World Geodetic System 1972
    WGS72,
}

impl Ellipsoid {
    /// Semi-major axis and flattening.
    pub const fn params(self) -> (f64, f64) {
        match self {
            Self::WGS84 => (WGS84_A, WGS84_F),
            Self::GRS80 => (GRS80_A, GRS80_F),
            Self::WGS72 => (WGS72_A, WGS72_F),
        }
    }
}

impl LatLngHeight {
    /// Construct from degrees and metres.
    pub fn from_degrees(latitude_deg: f64, longitude_deg: f64, height_metres: f64) -> Self {
        Self {
            longitude_rad: longitude_deg.to_radians(),
            latitude_rad: latitude_deg.to_radians(),
            height_metres,
        }
    }

    /// Convert to an earth-centred, earth-fixed position on `ellipsoid`.
    pub fn to_geocentric(self, ellipsoid: Ellipsoid) -> XyzGeocentric {
        let (a, f) = ellipsoid.params();
        let e2 = f * (2.0 - f);
        let (sin_lat, cos_lat) = self.latitude_rad.sin_cos();
        let (sin_lon, cos_lon) = self.longitude_rad.sin_cos();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        XyzGeocentric {
            x: (n + self.height_metres) * cos_lat * cos_lon,
            y: (n + self.height_metres) * cos_lat * sin_lon,
            z: (n * (1.0 - e2) + self.height_metres) * sin_lat,
        }
    }

    /// [`LatLngHeight::to_geocentric`] on the WGS84 ellipsoid.
    pub fn to_geocentric_wgs84(self) -> XyzGeocentric {
        self.to_geocentric(Ellipsoid::WGS84)
    }
}

impl XyzGeocentric {
    /// Convert an earth-centred, earth-fixed position to geodetic coordinates with Bowring's
    /// method.
    pub fn to_geodetic(self, ellipsoid: Ellipsoid) -> LatLngHeight {
        let (a, f) = ellipsoid.params();
        let b = a * (1.0 - f);
        let e2 = f * (2.0 - f);
        let ep2 = e2 / (1.0 - e2);

        let Self { x, y, z } = self;
        let p = x.hypot(y);
        let longitude_rad = y.atan2(x);

        // parametric latitude
        let mut beta = z.atan2((1.0 - f) * p);
        let mut latitude_rad = beta;
        for _ in 0..BOWRING_MAX_ITERATIONS {
            let (sin_beta, cos_beta) = beta.sin_cos();
            latitude_rad = (z + ep2 * b * sin_beta.powi(3)).atan2(p - e2 * a * cos_beta.powi(3));
            let (sin_lat, cos_lat) = latitude_rad.sin_cos();
            let next_beta = ((1.0 - f) * sin_lat).atan2(cos_lat);
            let converged = (next_beta - beta).abs() < BOWRING_TOLERANCE;
            beta = next_beta;
            if converged {
                break;
            }
        }

        let (sin_lat, cos_lat) = latitude_rad.sin_cos();
        let height_metres =
            p * cos_lat + z * sin_lat - a * (1.0 - e2 * sin_lat * sin_lat).sqrt();

        LatLngHeight {
            longitude_rad,
            latitude_rad,
            height_metres,
        }
    }
}

/// Convert ECEF coordinates \[m\] to `(latitude_rad, longitude_rad, elevation_m)` on WGS84.
pub fn ecef_to_geodetic(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let llh = XyzGeocentric { x, y, z }.to_geodetic(Ellipsoid::WGS84);
    (llh.latitude_rad, llh.longitude_rad, llh.height_metres)
}
