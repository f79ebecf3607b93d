//! Temporal and spectral averaging of a visibility store.
//!
//! Integrations are averaged per baseline in groups of `time_factor` consecutive integrations;
//! channels are summed in groups of `freq_factor`.

use std::{fmt::Display, str::FromStr};

use log::{debug, trace, warn};
use ndarray::{Array1, Array2};

use crate::{
    selection::select_baselines, store::VisibilityStore, util::progress_bar, UvConvError,
};

/// How to deal with axes which aren't a multiple of the averaging factor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AveragingMode {
    /// Fail unless both axes divide exactly.
    #[default]
    Exact,
    /// Discard the trailing integrations and channels which don't fill a group.
    Nearest,
}

impl Display for AveragingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Exact => "exact",
                Self::Nearest => "nearest",
            }
        )
    }
}

impl FromStr for AveragingMode {
    type Err = UvConvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "nearest" => Ok(Self::Nearest),
            _ => Err(UvConvError::InvalidArgument {
                argument: "mode".into(),
                function: "AveragingMode::from_str".into(),
                reason: format!("unknown averaging mode {s}, expected exact or nearest"),
            }),
        }
    }
}

/// The number of output groups along an axis of `length` for a given `factor`.
fn groups(
    axis: &str,
    length: usize,
    factor: usize,
    mode: AveragingMode,
) -> Result<usize, UvConvError> {
    let remainder = length % factor;
    match mode {
        AveragingMode::Exact if remainder != 0 => Err(UvConvError::NonIntegerDecimation {
            axis: axis.into(),
            length,
            factor,
        }),
        AveragingMode::Exact => Ok(length / factor),
        AveragingMode::Nearest => {
            let kept = length / factor;
            if kept == 0 {
                return Err(UvConvError::InsufficientData {
                    axis: axis.into(),
                    length,
                    factor,
                });
            }
            if remainder != 0 {
                warn!(
                    "{axis} axis of length {length} is not a multiple of {factor}, discarding the last {remainder}"
                );
            }
            Ok(kept)
        }
    }
}

/// Average the store down by `time_factor` integrations and `freq_factor` channels.
///
/// - UU, VV, WW and FLUX are averaged over time, INTTIM is summed, and every other column
///   takes the value of the first integration in each group.
/// - FLUX is summed over groups of channels, per correlation product.
/// - The frequency setup and nominal integration time are updated so the frequency axis
///   lands on the averaged channel centres.
/// - The recorded baseline selection is applied again to the new rows.
///
/// # Errors
///
/// - [`UvConvError::InvalidArgument`] if either factor is zero
/// - [`UvConvError::NonIntegerDecimation`] in exact mode, if an axis doesn't divide
/// - [`UvConvError::InsufficientData`] in nearest mode, if an axis is shorter than its factor
/// - [`UvConvError::BadArrayShape`] if the store is inconsistent
pub fn average(
    store: &mut VisibilityStore,
    time_factor: usize,
    freq_factor: usize,
    mode: AveragingMode,
    draw_progress: bool,
) -> Result<(), UvConvError> {
    trace!("start average");

    for (argument, factor) in [("time_factor", time_factor), ("freq_factor", freq_factor)] {
        if factor == 0 {
            return Err(UvConvError::InvalidArgument {
                argument: argument.into(),
                function: "average".into(),
                reason: "averaging factors must be at least 1".into(),
            });
        }
    }
    store.validate()?;

    let num_baselines = store.baselines_per_integration();
    let num_ints = store.num_integrations();
    let num_chans = store.num_chans();
    let num_stokes = store.num_stokes();

    let out_ints = groups("time", num_ints, time_factor, mode)?;
    let out_chans = groups("frequency", num_chans, freq_factor, mode)?;
    let out_rows = out_ints * num_baselines;
    debug!(
        "averaging {num_ints} integrations x {num_chans} channels to {out_ints} x {out_chans}"
    );

    let input = &store.uv_data;
    let flux_in = input.flux.to_f64();
    let mut averaged = input.select_rows(
        &(0..out_rows)
            .map(|row| (row / num_baselines) * time_factor * num_baselines + row % num_baselines)
            .collect::<Vec<_>>(),
    );
    let mut uu = Array1::zeros(out_rows);
    let mut vv = Array1::zeros(out_rows);
    let mut ww = Array1::zeros(out_rows);
    let mut inttim = Array1::zeros(out_rows);
    let mut flux: Array2<f64> = Array2::zeros((out_rows, out_chans * num_stokes * 2));

    let averaging_progress = progress_bar(out_rows, "averaging", draw_progress);
    let time_scale = 1.0 / time_factor as f64;
    for out_row in 0..out_rows {
        let first_row = (out_row / num_baselines) * time_factor * num_baselines
            + out_row % num_baselines;
        for step in 0..time_factor {
            let row = first_row + step * num_baselines;
            uu[out_row] += input.uu[row] * time_scale;
            vv[out_row] += input.vv[row] * time_scale;
            ww[out_row] += input.ww[row] * time_scale;
            inttim[out_row] += input.inttim[row];
            for out_chan in 0..out_chans {
                for chan in out_chan * freq_factor..(out_chan + 1) * freq_factor {
                    for value in 0..num_stokes * 2 {
                        flux[(out_row, out_chan * num_stokes * 2 + value)] +=
                            flux_in[(row, chan * num_stokes * 2 + value)] * time_scale;
                    }
                }
            }
        }
        averaging_progress.inc(1);
    }
    averaging_progress.finish();

    averaged.uu = uu;
    averaged.vv = vv;
    averaged.ww = ww;
    averaged.inttim = inttim;
    averaged.flux = input.flux.like(flux);
    store.uv_data = averaged;

    let setup = &mut store.frequency;
    let factor = freq_factor as f64;
    setup.ref_pixel = (setup.ref_pixel - (factor - 1.0) / 2.0) / factor;
    setup.chan_width_hz *= factor;
    setup.num_chans = out_chans;
    setup.total_bandwidth_hz = setup.chan_width_hz * out_chans as f64;
    store.int_time_s *= time_factor as f64;

    let selection = store.selection.clone();
    select_baselines(store, selection)?;

    trace!("end average");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::{BaselineSelection, FluxBuffer},
        test_common::{get_test_store, TEST_CHAN_WIDTH_HZ, TEST_INT_TIME_S},
    };
    use approx::assert_abs_diff_eq;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Exact".parse::<AveragingMode>().unwrap(), AveragingMode::Exact);
        assert_eq!("nearest".parse::<AveragingMode>().unwrap(), AveragingMode::Nearest);
        assert!("nearset".parse::<AveragingMode>().is_err());
        assert_eq!(format!("{}", AveragingMode::Nearest), "nearest");
    }

    #[test]
    fn test_average_time() {
        let mut store = get_test_store(3, 4, 2, true);
        store.uv_data.uu = Array1::from_shape_fn(store.num_rows(), |row| row as f64);
        let original = store.clone();

        average(&mut store, 2, 1, AveragingMode::Exact, false).unwrap();
        store.validate().unwrap();

        assert_eq!(store.num_rows(), 12);
        assert_eq!(store.num_integrations(), 2);
        assert_approx_eq!(f64, store.int_time_s, 2.0 * TEST_INT_TIME_S);

        let flux_in = original.uv_data.flux.to_f64();
        let flux_out = store.uv_data.flux.to_f64();
        // second baseline of the second output integration: input rows 13 and 19
        let out_row = 6 + 1;
        assert_eq!(store.uv_data.baseline[out_row], original.uv_data.baseline[13]);
        assert_abs_diff_eq!(store.uv_data.time[out_row], original.uv_data.time[13]);
        assert_abs_diff_eq!(store.uv_data.uu[out_row], 16.0);
        assert_abs_diff_eq!(store.uv_data.inttim[out_row], 2.0 * TEST_INT_TIME_S);
        for idx in 0..flux_out.dim().1 {
            assert_abs_diff_eq!(
                flux_out[(out_row, idx)],
                (flux_in[(13, idx)] + flux_in[(19, idx)]) / 2.0,
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn test_average_frequency() {
        let mut store = get_test_store(2, 1, 4, true);
        let original = store.clone();

        average(&mut store, 1, 2, AveragingMode::Exact, false).unwrap();
        store.validate().unwrap();

        assert_eq!(store.num_rows(), original.num_rows());
        assert_eq!(store.num_chans(), 2);
        assert_approx_eq!(f64, store.frequency.chan_width_hz, 2.0 * TEST_CHAN_WIDTH_HZ);
        assert_approx_eq!(
            f64,
            store.frequency.total_bandwidth_hz,
            4.0 * TEST_CHAN_WIDTH_HZ
        );

        let before = original.uv_data.flux.to_complex(4).unwrap();
        let after = store.uv_data.flux.to_complex(4).unwrap();
        for row in 0..store.num_rows() {
            for stk in 0..4 {
                let expected = before[(row, 2, stk)] + before[(row, 3, stk)];
                assert_abs_diff_eq!(after[(row, 1, stk)], expected, epsilon = 1e-5);
            }
        }

        // averaged channel centres sit between the channels they replace
        let freqs_before = original.frequencies_hz();
        let freqs_after = store.frequencies_hz();
        assert_abs_diff_eq!(
            freqs_after[0],
            (freqs_before[0] + freqs_before[1]) / 2.0,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            freqs_after[1],
            (freqs_before[2] + freqs_before[3]) / 2.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_average_exact_rejects_remainder() {
        let mut store = get_test_store(2, 3, 4, true);
        assert!(matches!(
            average(&mut store, 2, 1, AveragingMode::Exact, false),
            Err(UvConvError::NonIntegerDecimation { axis, length: 3, factor: 2 }) if axis == "time"
        ));
        assert!(matches!(
            average(&mut store, 1, 3, AveragingMode::Exact, false),
            Err(UvConvError::NonIntegerDecimation { axis, length: 4, factor: 3 }) if axis == "frequency"
        ));
        assert_eq!(store.num_rows(), 9);
    }

    #[test]
    fn test_average_nearest_truncates() {
        let mut store = get_test_store(2, 3, 5, true);
        average(&mut store, 2, 2, AveragingMode::Nearest, false).unwrap();
        store.validate().unwrap();
        assert_eq!(store.num_integrations(), 1);
        assert_eq!(store.num_rows(), 3);
        assert_eq!(store.num_chans(), 2);
    }

    #[test]
    fn test_average_nearest_insufficient() {
        let mut store = get_test_store(2, 3, 4, true);
        assert!(matches!(
            average(&mut store, 4, 1, AveragingMode::Nearest, false),
            Err(UvConvError::InsufficientData { length: 3, factor: 4, .. })
        ));
        assert!(matches!(
            average(&mut store, 1, 5, AveragingMode::Nearest, false),
            Err(UvConvError::InsufficientData { length: 4, factor: 5, .. })
        ));
    }

    #[test]
    fn test_average_zero_factor() {
        let mut store = get_test_store(2, 2, 2, true);
        assert!(matches!(
            average(&mut store, 0, 1, AveragingMode::Exact, false),
            Err(UvConvError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_average_identity() {
        let mut store = get_test_store(3, 2, 3, false);
        let original = store.clone();
        average(&mut store, 1, 1, AveragingMode::Exact, false).unwrap();
        assert_eq!(store.uv_data.baseline, original.uv_data.baseline);
        assert_eq!(store.frequency, original.frequency);
        assert_eq!(store.uv_data.flux, original.uv_data.flux);
    }

    #[test]
    fn test_average_keeps_storage_type() {
        let mut store = get_test_store(2, 2, 2, true);
        store.uv_data.flux = FluxBuffer::F64(store.uv_data.flux.to_f64());
        average(&mut store, 2, 2, AveragingMode::Exact, false).unwrap();
        assert_eq!(store.uv_data.flux.dtype(), "f64");
    }

    #[test]
    fn test_average_reapplies_selection() {
        let mut store = get_test_store(3, 2, 2, true);
        let kept = vec![store.uv_data.baseline[1], store.uv_data.baseline[4]];
        select_baselines(&mut store, BaselineSelection::Ids(kept.clone())).unwrap();
        average(&mut store, 2, 1, AveragingMode::Exact, false).unwrap();
        assert_eq!(store.selection, BaselineSelection::Ids(kept));
        assert_eq!(crate::selection::selected_rows(&store), vec![1, 4]);
    }
}
