// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Handle (u,v,w) coordinates.

use std::f64::consts::TAU;

use super::{XyzBaseline, XyzGeodetic};
use crate::{baseline::generate_baseline_list, UvConvError};

/// The (u,v,w) coordinates of a baseline. Units are whatever the [`XyzBaseline`] was in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UVW {
    /// East-west, perpendicular to the phase centre
    pub u: f64,
    /// North-south, perpendicular to the phase centre
    pub v: f64,
    /// Along the direction of the phase centre
    pub w: f64,
}

impl UVW {
    /// Rotate a baseline vector towards a direction given by its hour angle and declination.
    ///
    /// No range checking is done, see [`compute_uvw`].
    pub fn from_xyz(xyz: XyzBaseline, ha_rad: f64, dec_rad: f64) -> Self {
        let (s_ha, c_ha) = ha_rad.sin_cos();
        let (s_dec, c_dec) = dec_rad.sin_cos();
        Self {
            u: s_ha * xyz.x + c_ha * xyz.y,
            v: -s_dec * c_ha * xyz.x + s_dec * s_ha * xyz.y + c_dec * xyz.z,
            w: c_dec * c_ha * xyz.x - c_dec * s_ha * xyz.y + s_dec * xyz.z,
        }
    }
}

impl std::ops::Div<f64> for UVW {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self {
            u: self.u / rhs,
            v: self.v / rhs,
            w: self.w / rhs,
        }
    }
}

#[cfg(test)]
impl approx::AbsDiffEq for UVW {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        f64::abs_diff_eq(&self.u, &other.u, epsilon)
            && f64::abs_diff_eq(&self.v, &other.v, epsilon)
            && f64::abs_diff_eq(&self.w, &other.w, epsilon)
    }
}

/// For each baseline of the canonical ordering, the vector `pos[ant2] - pos[ant1]`.
///
/// `positions[i]` is the position of the antenna with id `i + 1`.
///
/// # Errors
///
/// [`UvConvError::Domain`] if there are more antennas than a baseline id can encode.
pub fn compute_baseline_vectors(
    positions: &[XyzGeodetic],
    autocorrelations: bool,
) -> Result<Vec<XyzBaseline>, UvConvError> {
    let (pairs, _) = generate_baseline_list(positions.len(), autocorrelations)?;
    Ok(pairs
        .into_iter()
        .map(|(ant1, ant2)| positions[ant2 - 1] - positions[ant1 - 1])
        .collect())
}

fn check_angle(argument: &str, value: f64) -> Result<(), UvConvError> {
    if !value.is_finite() || value.abs() >= TAU {
        return Err(UvConvError::Domain {
            function: "compute_uvw".into(),
            argument: argument.into(),
            expected: "an angle with magnitude less than 2π radians".into(),
            received: format!("{value}"),
        });
    }
    Ok(())
}

/// Compute the UVW coordinates of many baselines towards a single direction.
///
/// # Errors
///
/// [`UvConvError::Domain`] if `|ha_rad|` or `|dec_rad|` is at least 2π.
pub fn compute_uvw(
    baselines: &[XyzBaseline],
    ha_rad: f64,
    dec_rad: f64,
) -> Result<Vec<UVW>, UvConvError> {
    check_angle("ha_rad", ha_rad)?;
    check_angle("dec_rad", dec_rad)?;
    Ok(baselines
        .iter()
        .map(|&xyz| UVW::from_xyz(xyz, ha_rad, dec_rad))
        .collect())
}
