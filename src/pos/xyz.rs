// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Cartesian coordinate frames.

use serde::{Deserialize, Serialize};

/// An earth-centred, earth-fixed position \[metres\].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct XyzGeocentric {
    /// From the earth's centre towards latitude 0, longitude 0
    pub x: f64,
    /// From the earth's centre towards latitude 0, longitude 90° east
    pub y: f64,
    /// From the earth's centre towards the north pole
    pub z: f64,
}

/// An antenna position relative to the array centre \[metres\].
///
/// `x` points at the intersection of the local meridian and the equator, `y` east and `z`
/// at the north celestial pole, so the hour angle rotates this frame directly into UVW.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct XyzGeodetic {
    /// Towards the local meridian on the equator
    pub x: f64,
    /// East
    pub y: f64,
    /// Towards the north celestial pole
    pub z: f64,
}

/// The separation between two [`XyzGeodetic`] positions \[metres\].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XyzBaseline {
    /// See [`XyzGeodetic::x`]
    pub x: f64,
    /// See [`XyzGeodetic::y`]
    pub y: f64,
    /// See [`XyzGeodetic::z`]
    pub z: f64,
}

impl std::ops::Sub<XyzGeodetic> for XyzGeodetic {
    type Output = XyzBaseline;

    fn sub(self, rhs: Self) -> XyzBaseline {
        XyzBaseline {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl From<[f64; 3]> for XyzGeodetic {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<XyzGeodetic> for [f64; 3] {
    fn from(xyz: XyzGeodetic) -> Self {
        [xyz.x, xyz.y, xyz.z]
    }
}

impl From<[f64; 3]> for XyzGeocentric {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}
