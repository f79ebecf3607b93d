// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Local mean sidereal time.

use hifitime::Epoch;

use crate::constants::J2000_JD;

/// Local mean sidereal time \[degrees, 0..360\] at `longitude_rad` (east positive).
///
/// Greenwich mean sidereal time comes from the IAU 1982 polynomial (Meeus eq. 12.4)
/// evaluated on the UTC Julian date, which ignores the UT1-UTC offset (< 1s).
pub fn sidereal_time(epoch: Epoch, longitude_rad: f64) -> f64 {
    let jd = epoch.to_jde_utc_days();
    let days = jd - J2000_JD;
    let centuries = days / 36525.0;
    let gmst_deg = 280.460_618_37 + 360.985_647_366_29 * days + 0.000_387_933 * centuries.powi(2)
        - centuries.powi(3) / 38_710_000.0;
    (gmst_deg + longitude_rad.to_degrees()).rem_euclid(360.0)
}
