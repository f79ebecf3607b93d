//! Checks of store-level invariants, run before export.

use std::fmt::Display;

use log::{debug, trace};

use crate::{
    baseline::{generate_ordered_baselines, num_baselines, Triangle},
    store::{BaselineSelection, VisibilityStore},
    util::fmt_elided,
    UvConvError,
};

/// What [`verify`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// Rows in the store
    pub num_rows: usize,
    /// Rows in each integration
    pub baselines_per_integration: usize,
    /// Complete integrations
    pub num_integrations: usize,
    /// The baseline ordering, `None` if not checked
    pub triangle: Option<Triangle>,
}

impl Display for VerificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rows, {} integrations of {} baselines, ",
            self.num_rows, self.num_integrations, self.baselines_per_integration
        )?;
        match self.triangle {
            Some(triangle) => write!(f, "{triangle} triangle baseline order"),
            None => write!(f, "baseline order not checked"),
        }
    }
}

fn failure(reason: String) -> UvConvError {
    UvConvError::Verification { reason }
}

/// Check every integration walks the same triangle of the correlation matrix.
///
/// Autocorrelations are assumed present if antenna 1's autocorrelation is in the first
/// integration.
///
/// # Errors
///
/// [`UvConvError::Verification`] if
/// - the store is empty, or the rows aren't a whole number of integrations
/// - an integration matches neither ordering, or integrations disagree
pub fn verify_baseline_order(store: &VisibilityStore) -> Result<Triangle, UvConvError> {
    trace!("start verify_baseline_order");
    let block = store.baselines_per_integration();
    if block == 0 {
        return Err(failure("no rows to verify".into()));
    }
    if store.num_rows() % block != 0 {
        return Err(failure(format!(
            "{} rows is not a multiple of {block} baselines per integration",
            store.num_rows()
        )));
    }

    let num_ants = store.num_antennas();
    let autocorrelations = store.has_autocorrelations();
    let expected = num_baselines(num_ants, autocorrelations);
    if block != expected {
        return Err(failure(format!(
            "{block} baselines per integration, expected {expected} for {num_ants} antennas{}",
            if autocorrelations {
                " with autocorrelations"
            } else {
                ""
            }
        )));
    }
    let (_, lower) = generate_ordered_baselines(num_ants, autocorrelations, Triangle::Lower)?;
    let (_, upper) = generate_ordered_baselines(num_ants, autocorrelations, Triangle::Upper)?;

    let baselines = store.uv_data.baseline.to_vec();
    let mut detected: Option<Triangle> = None;
    for (int_idx, ids) in baselines.chunks(block).enumerate() {
        let triangle = if ids == lower.as_slice() {
            Triangle::Lower
        } else if ids == upper.as_slice() {
            Triangle::Upper
        } else {
            return Err(failure(format!(
                "integration {int_idx} is in neither baseline order: {}",
                fmt_elided(ids, 8)
            )));
        };
        match detected {
            None => detected = Some(triangle),
            Some(first) if first != triangle => {
                return Err(failure(format!(
                    "integration {int_idx} is in {triangle} order, but earlier integrations are {first}"
                )));
            }
            Some(_) => {}
        }
    }

    trace!("end verify_baseline_order");
    detected.ok_or_else(|| failure("no integrations to verify".into()))
}

/// Check no row refers to FREQID, SOURCE or BASELINE 0.
///
/// # Errors
///
/// [`UvConvError::Verification`] naming the first column with a zero key and the offending
/// rows.
pub fn verify_no_null_keys(store: &VisibilityStore) -> Result<(), UvConvError> {
    let uv_data = &store.uv_data;
    for (name, column) in [
        ("FREQID", &uv_data.freqid),
        ("SOURCE", &uv_data.source),
        ("BASELINE", &uv_data.baseline),
    ] {
        let rows: Vec<usize> = column
            .iter()
            .enumerate()
            .filter(|(_, key)| **key == 0)
            .map(|(row, _)| row)
            .collect();
        if !rows.is_empty() {
            return Err(failure(format!(
                "{name} is 0 in {} rows: {}",
                rows.len(),
                fmt_elided(&rows, 6)
            )));
        }
    }
    Ok(())
}

/// Check the frequency axis is non-negative and increasing.
///
/// # Errors
///
/// [`UvConvError::Verification`] if there are no channels, the lowest frequency is negative or
/// the channel width is not positive.
pub fn verify_frequency_axis(store: &VisibilityStore) -> Result<(), UvConvError> {
    let setup = &store.frequency;
    if setup.num_chans == 0 {
        return Err(failure("frequency axis has no channels".into()));
    }
    if setup.chan_width_hz.is_nan() || setup.chan_width_hz <= 0.0 {
        return Err(failure(format!(
            "channel width {} Hz is not positive",
            setup.chan_width_hz
        )));
    }
    let min_freq_hz = store
        .frequencies_hz()
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    if min_freq_hz < 0.0 {
        return Err(failure(format!(
            "lowest channel frequency {min_freq_hz} Hz is negative"
        )));
    }
    Ok(())
}

/// Run every check.
///
/// The baseline order is not checked while a baseline selection is recorded.
///
/// # Errors
///
/// [`UvConvError::Verification`] from the first check which fails, including column lengths
/// and FLUX width.
pub fn verify(store: &VisibilityStore) -> Result<VerificationReport, UvConvError> {
    trace!("start verify");
    store
        .validate()
        .map_err(|err| failure(err.to_string()))?;
    let triangle = match store.selection {
        BaselineSelection::All => Some(verify_baseline_order(store)?),
        BaselineSelection::Ids(_) => {
            debug!("baseline selection active, not checking baseline order");
            None
        }
    };
    verify_no_null_keys(store)?;
    verify_frequency_axis(store)?;
    let report = VerificationReport {
        num_rows: store.num_rows(),
        baselines_per_integration: store.baselines_per_integration(),
        num_integrations: store.num_integrations(),
        triangle,
    };
    debug!("verified: {report}");
    trace!("end verify");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{baseline::generate_upper_baseline_list, test_common::get_test_store};

    fn to_upper(store: &mut VisibilityStore, autocorrelations: bool) {
        let (_, upper) =
            generate_upper_baseline_list(store.num_antennas(), autocorrelations).unwrap();
        for (row, bl) in store.uv_data.baseline.iter_mut().enumerate() {
            *bl = upper[row % upper.len()];
        }
    }

    #[test]
    fn test_lower_order() {
        let store = get_test_store(4, 3, 1, true);
        assert_eq!(verify_baseline_order(&store).unwrap(), Triangle::Lower);
        let store = get_test_store(4, 3, 1, false);
        assert_eq!(verify_baseline_order(&store).unwrap(), Triangle::Lower);
    }

    #[test]
    fn test_upper_order() {
        let mut store = get_test_store(4, 2, 1, true);
        to_upper(&mut store, true);
        assert_eq!(verify_baseline_order(&store).unwrap(), Triangle::Upper);

        let mut store = get_test_store(4, 2, 1, false);
        to_upper(&mut store, false);
        assert_eq!(verify_baseline_order(&store).unwrap(), Triangle::Upper);
    }

    #[test]
    fn test_mixed_order() {
        let mut store = get_test_store(3, 2, 1, true);
        let (_, upper) = generate_upper_baseline_list(3, true).unwrap();
        for (idx, &bl) in upper.iter().enumerate() {
            store.uv_data.baseline[6 + idx] = bl;
        }
        assert!(matches!(
            verify_baseline_order(&store),
            Err(UvConvError::Verification { reason }) if reason.contains("integration 1")
        ));
    }

    #[test]
    fn test_scrambled_order() {
        let mut store = get_test_store(3, 2, 1, true);
        store.uv_data.baseline.swap(7, 8);
        assert!(verify_baseline_order(&store).is_err());
    }

    #[test]
    fn test_non_adjacent_swap() {
        let mut store = get_test_store(4, 2, 1, true);
        verify_baseline_order(&store).unwrap();
        store.uv_data.baseline.swap(11, 17);
        assert!(matches!(
            verify_baseline_order(&store),
            Err(UvConvError::Verification { reason }) if reason.contains("integration 1")
        ));
    }

    #[test]
    fn test_partial_integration() {
        let mut store = get_test_store(3, 2, 1, true);
        let rows: Vec<usize> = (0..10).collect();
        store.uv_data = store.uv_data.select_rows(&rows);
        assert!(matches!(
            verify_baseline_order(&store),
            Err(UvConvError::Verification { reason }) if reason.contains("not a multiple")
        ));
    }

    #[test]
    fn test_null_keys() {
        let mut store = get_test_store(3, 2, 1, true);
        verify_no_null_keys(&store).unwrap();
        store.uv_data.source[4] = 0;
        assert!(matches!(
            verify_no_null_keys(&store),
            Err(UvConvError::Verification { reason }) if reason.starts_with("SOURCE")
        ));
        store.uv_data.freqid[1] = 0;
        assert!(matches!(
            verify_no_null_keys(&store),
            Err(UvConvError::Verification { reason }) if reason.starts_with("FREQID")
        ));
    }

    #[test]
    fn test_frequency_axis() {
        let mut store = get_test_store(2, 1, 4, true);
        verify_frequency_axis(&store).unwrap();
        store.frequency.ref_pixel = 1e4;
        assert!(verify_frequency_axis(&store).is_err());
        store.frequency.ref_pixel = 0.0;
        store.frequency.chan_width_hz = -1.0;
        assert!(verify_frequency_axis(&store).is_err());
    }

    #[test]
    fn test_verify() {
        let mut store = get_test_store(3, 2, 2, true);
        let report = verify(&store).unwrap();
        assert_eq!(
            report,
            VerificationReport {
                num_rows: 12,
                baselines_per_integration: 6,
                num_integrations: 2,
                triangle: Some(Triangle::Lower),
            }
        );

        store.uv_data.baseline.swap(7, 8);
        assert!(verify(&store).is_err());
        store.selection = BaselineSelection::Ids(vec![258]);
        assert_eq!(verify(&store).unwrap().triangle, None);

        store.uv_data.inttim = ndarray::Array1::zeros(3);
        assert!(matches!(
            verify(&store),
            Err(UvConvError::Verification { .. })
        ));
    }
}
