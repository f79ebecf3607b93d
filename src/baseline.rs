//! Baseline id encoding and the canonical ordering of baselines within an integration.
//!
//! Baseline ids follow the MIRIAD / FITS-IDI convention. Antenna ids are 1-based.
//! When both antennas are at most 255, `id = 256 * ant1 + ant2`. Otherwise the extended
//! encoding `id = 2048 * ant1 + ant2 + 65536` is used, which covers antennas up to 2047.

use log::trace;

use crate::{
    constants::{EXTENDED_BASELINE_OFFSET, MAX_ANTENNA_ID, MAX_COMPACT_ANTENNA_ID},
    UvConvError,
};

/// Which triangle of the correlation matrix a baseline ordering walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triangle {
    /// `ant2 >= ant1`, ordered by `ant1` then `ant2`.
    Lower,
    /// `ant1 >= ant2`, ordered by `ant1` then `ant2`.
    Upper,
}

impl std::fmt::Display for Triangle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lower => write!(f, "lower"),
            Self::Upper => write!(f, "upper"),
        }
    }
}

fn check_antenna_id(ant: usize, argument: &str) -> Result<(), UvConvError> {
    if ant == 0 || ant > MAX_ANTENNA_ID {
        return Err(UvConvError::Domain {
            function: "encode_baseline".into(),
            argument: argument.into(),
            expected: format!("an antenna id in 1..={MAX_ANTENNA_ID}"),
            received: format!("{ant}"),
        });
    }
    Ok(())
}

/// Encode a pair of 1-based antenna ids into a baseline id.
///
/// # Errors
///
/// [`UvConvError::Domain`] if either id is zero or greater than 2047.
///
/// # Examples
///
/// ```rust
/// use uvconv::baseline::encode_baseline;
///
/// assert_eq!(encode_baseline(1, 2).unwrap(), 258);
/// assert_eq!(encode_baseline(1, 256).unwrap(), 67840);
/// ```
pub fn encode_baseline(ant1: usize, ant2: usize) -> Result<usize, UvConvError> {
    check_antenna_id(ant1, "ant1")?;
    check_antenna_id(ant2, "ant2")?;
    if ant1 > MAX_COMPACT_ANTENNA_ID || ant2 > MAX_COMPACT_ANTENNA_ID {
        Ok(ant1 * 2048 + ant2 + EXTENDED_BASELINE_OFFSET)
    } else {
        Ok(ant1 * 256 + ant2)
    }
}

/// Decode a baseline id into its 1-based antenna ids.
///
/// # Errors
///
/// [`UvConvError::Domain`] if `id` is zero or doesn't decode to a valid pair of antenna
/// ids which re-encodes to the same value.
pub fn decode_baseline(id: usize) -> Result<(usize, usize), UvConvError> {
    let invalid = || UvConvError::Domain {
        function: "decode_baseline".into(),
        argument: "id".into(),
        expected: "a valid MIRIAD baseline id".into(),
        received: format!("{id}"),
    };
    if id == 0 {
        return Err(invalid());
    }
    let (ant1, ant2) = if id >= EXTENDED_BASELINE_OFFSET {
        let id = id - EXTENDED_BASELINE_OFFSET;
        (id / 2048, id % 2048)
    } else {
        (id / 256, id % 256)
    };
    match encode_baseline(ant1, ant2) {
        Ok(check) if check == id => Ok((ant1, ant2)),
        _ => Err(invalid()),
    }
}

/// The number of baselines formed by `num_ants` antennas.
pub const fn num_baselines(num_ants: usize, autocorrelations: bool) -> usize {
    if autocorrelations {
        num_ants * (num_ants + 1) / 2
    } else {
        num_ants * num_ants.saturating_sub(1) / 2
    }
}

/// Generate the canonical per-integration baseline ordering for `num_ants` antennas.
///
/// Pairs are `(ant1, ant2)` with `ant2 >= ant1` (or `ant2 > ant1` without
/// autocorrelations), ordered by `ant1` then `ant2`.
///
/// # Errors
///
/// [`UvConvError::Domain`] if `num_ants` is larger than the encodable antenna range.
pub fn generate_baseline_list(
    num_ants: usize,
    autocorrelations: bool,
) -> Result<(Vec<(usize, usize)>, Vec<usize>), UvConvError> {
    generate_ordered_baselines(num_ants, autocorrelations, Triangle::Lower)
}

/// Generate the upper-triangle ordering, pairs `(ant1, ant2)` with `ant1 >= ant2`.
///
/// # Errors
///
/// see [`generate_baseline_list`]
pub fn generate_upper_baseline_list(
    num_ants: usize,
    autocorrelations: bool,
) -> Result<(Vec<(usize, usize)>, Vec<usize>), UvConvError> {
    generate_ordered_baselines(num_ants, autocorrelations, Triangle::Upper)
}

/// Generate a baseline ordering for either [`Triangle`].
///
/// # Errors
///
/// see [`generate_baseline_list`]
pub fn generate_ordered_baselines(
    num_ants: usize,
    autocorrelations: bool,
    triangle: Triangle,
) -> Result<(Vec<(usize, usize)>, Vec<usize>), UvConvError> {
    trace!("generating {triangle} baselines for {num_ants} antennas");
    let mut pairs = Vec::with_capacity(num_baselines(num_ants, autocorrelations));
    for ant1 in 1..=num_ants {
        let others = match triangle {
            Triangle::Lower => ant1..=num_ants,
            Triangle::Upper => 1..=ant1,
        };
        for ant2 in others {
            if ant1 == ant2 && !autocorrelations {
                continue;
            }
            pairs.push((ant1, ant2));
        }
    }
    let ids = pairs
        .iter()
        .map(|&(ant1, ant2)| encode_baseline(ant1, ant2))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((pairs, ids))
}

/// All baseline ids from `ids` which include `antenna_id` in either slot, in input order.
///
/// Ids which can't be decoded never match.
pub fn baselines_touching(antenna_id: usize, ids: &[usize]) -> Vec<usize> {
    ids.iter()
        .copied()
        .filter(|&id| match decode_baseline(id) {
            Ok((ant1, ant2)) => ant1 == antenna_id || ant2 == antenna_id,
            Err(_) => false,
        })
        .collect()
}
