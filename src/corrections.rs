//! Corrections that can be performed on visibility data
//!
//! - UVW generation towards a named phase centre
//! - geometric phase rotation between phase centres
//! - cable delay corrections
use std::f64::consts::TAU;

use itertools::izip;
use log::{debug, trace, warn};
use ndarray::{Array1, Array3};
use num_complex::Complex;

use crate::{
    baseline::decode_baseline,
    config::TelescopeConfig,
    constants::VEL_C,
    pos::{compute_uvw, sidereal_time, SourcePosition, ZENITH},
    store::{CableDelayProvenance, Feed, SourceEntry, VisibilityStore},
    util::progress_bar,
    UvConvError,
};

/// Whether a rotation multiplies or divides the visibilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Apply,
    Undo,
}

/// Compute UU, VV, WW \[s\] of every row towards `source`.
///
/// Each row's epoch is its DATE + TIME, at which the local sidereal time at the site and the
/// source's hour angle are evaluated. The baseline vector of each row comes from its decoded
/// baseline id and the antenna positions of the array.
///
/// If `update_source_table` is set, the current SOURCE entry is replaced by the resolved
/// position (for zenith, the right ascension at the first row).
///
/// # Errors
///
/// - [`UvConvError::UnknownSource`] if `source` can't be resolved
/// - [`UvConvError::Domain`] if a baseline id can't be decoded
/// - [`UvConvError::InvalidArgument`] if a baseline refers to an unknown antenna
pub fn generate_uvw(
    store: &mut VisibilityStore,
    config: &TelescopeConfig,
    source: &str,
    update_source_table: bool,
) -> Result<Option<SourcePosition>, UvConvError> {
    trace!("start generate_uvw");

    let site = config.site;
    let num_rows = store.num_rows();
    let mut uu = Array1::zeros(num_rows);
    let mut vv = Array1::zeros(num_rows);
    let mut ww = Array1::zeros(num_rows);

    let mut first_position: Option<SourcePosition> = None;
    // rows of an integration share a timestamp, and so a source position
    let mut cached: Option<(f64, f64, SourcePosition)> = None;
    for row in 0..num_rows {
        let (date, time) = (store.uv_data.date[row], store.uv_data.time[row]);
        let (ha_deg, dec_deg) = match &cached {
            Some((cached_date, cached_time, pos))
                if cached_date.to_bits() == date.to_bits()
                    && cached_time.to_bits() == time.to_bits() =>
            {
                (pos.ha_deg, pos.dec_deg)
            }
            _ => {
                let lst_deg = sidereal_time(store.uv_data.row_epoch(row), site.longitude_rad);
                let pos = config
                    .catalogue
                    .hour_angle_and_dec(source, lst_deg, site.latitude_rad)?;
                let result = (pos.ha_deg, pos.dec_deg);
                if first_position.is_none() {
                    first_position = Some(pos.clone());
                }
                cached = Some((date, time, pos));
                result
            }
        };

        let (ant1, ant2) = decode_baseline(store.uv_data.baseline[row])?;
        let (pos1, pos2) = match (store.array.position_of(ant1), store.array.position_of(ant2)) {
            (Some(pos1), Some(pos2)) => (pos1, pos2),
            _ => {
                return Err(UvConvError::InvalidArgument {
                    argument: "store.uv_data.baseline".into(),
                    function: "generate_uvw".into(),
                    reason: format!(
                        "row {row} refers to antennas ({ant1}, {ant2}) but the array has {}",
                        store.num_antennas()
                    ),
                })
            }
        };
        let uvw = compute_uvw(&[pos2 - pos1], ha_deg.to_radians(), dec_deg.to_radians())?[0]
            / VEL_C;
        uu[row] = uvw.u;
        vv[row] = uvw.v;
        ww[row] = uvw.w;
    }

    store.uv_data.uu = uu;
    store.uv_data.vv = vv;
    store.uv_data.ww = ww;

    if update_source_table {
        if let Some(pos) = &first_position {
            store.phase.current = SourceEntry {
                id: store.phase.current.id,
                name: pos.name.clone(),
                ra_deg: pos.ra_deg,
                dec_deg: pos.dec_deg,
            };
        }
    }

    trace!("end generate_uvw");
    Ok(first_position)
}

fn rotate_by_delay(
    complex: &mut Array3<Complex<f32>>,
    from_delay_s: &Array1<f64>,
    to_delay_s: &Array1<f64>,
    freqs_hz: &Array1<f64>,
    direction: Direction,
    draw_progress: bool,
) {
    let correction_progress = progress_bar(complex.dim().0, "geom corrections", draw_progress);

    for (mut row_vis, &from_s, &to_s) in
        izip!(complex.outer_iter_mut(), from_delay_s, to_delay_s)
    {
        for (mut chan_vis, &freq_hz) in row_vis.outer_iter_mut().zip(freqs_hz) {
            let angle = -TAU * freq_hz * (to_s - from_s);
            let (sin_angle, cos_angle) = angle.sin_cos();
            #[allow(clippy::cast_possible_truncation)]
            let rotation = Complex::new(cos_angle as f32, sin_angle as f32);
            match direction {
                Direction::Apply => chan_vis.mapv_inplace(|vis| vis * rotation),
                Direction::Undo => chan_vis.mapv_inplace(|vis| vis / rotation),
            }
        }
        correction_progress.inc(1);
    }

    correction_progress.finish();
}

/// Rotate the visibilities from the current phase centre to `source`.
///
/// The geometric delay to the current centre is taken from WW, UVW are then regenerated
/// towards `source`, and every product of every row is multiplied by
/// `exp(-2πi f (w_new - w_current))`. The previous SOURCE entry is kept so the rotation can
/// be undone with [`unphase_from_source`].
///
/// If `generate_uvw` is false, UU, VV and WW are assumed to already describe `source`; only
/// the SOURCE table is updated, with the position of `source` at the first row.
///
/// # Errors
///
/// - [`UvConvError::UnknownSource`] if `source` can't be resolved
/// - [`UvConvError::InvalidFluxType`] if FLUX isn't `f32`
/// - see [`generate_uvw`]
pub fn phase_to_source(
    store: &mut VisibilityStore,
    config: &TelescopeConfig,
    source: &str,
    generate_uvw_columns: bool,
    draw_progress: bool,
) -> Result<(), UvConvError> {
    trace!("start phase_to_source");

    let canonical = resolve(config, source)?;
    let mut complex = store.uv_data.flux.to_complex(store.num_stokes())?;
    let current_delay_s = store.uv_data.ww.clone();
    let previous = store.phase.current.clone();

    let position = if generate_uvw_columns {
        generate_uvw(store, config, &canonical, false)?
    } else {
        None
    };
    let position = match position {
        Some(pos) => pos,
        None => position_at_start(store, config, &canonical)?,
    };
    let new_delay_s = store.uv_data.ww.clone();
    let freqs_hz = store.frequencies_hz();

    debug!("phasing from {} to {}", previous.name, canonical);
    rotate_by_delay(
        &mut complex,
        &current_delay_s,
        &new_delay_s,
        &freqs_hz,
        Direction::Apply,
        draw_progress,
    );
    store.uv_data.flux.assign_complex(&complex)?;

    store.phase.history.push(previous.clone());
    store.phase.current = SourceEntry {
        id: previous.id,
        name: position.name,
        ra_deg: position.ra_deg,
        dec_deg: position.dec_deg,
    };

    trace!("end phase_to_source");
    Ok(())
}

/// Undo [`phase_to_source`], returning to the previous phase centre (or zenith).
///
/// `source` must be the centre the visibilities are currently phased to. UVW are regenerated
/// towards the previous centre, and every product is divided by
/// `exp(-2πi f (w_current - w_previous))`.
///
/// # Errors
///
/// - [`UvConvError::PhaseCentreMismatch`] if the data isn't phased to `source`
/// - [`UvConvError::UnknownSource`] if `source` or the previous centre can't be resolved
/// - [`UvConvError::InvalidFluxType`] if FLUX isn't `f32`
/// - see [`generate_uvw`]
pub fn unphase_from_source(
    store: &mut VisibilityStore,
    config: &TelescopeConfig,
    source: &str,
    generate_uvw_columns: bool,
    draw_progress: bool,
) -> Result<(), UvConvError> {
    trace!("start unphase_from_source");

    let canonical = resolve(config, source)?;
    let current = store.phase.current.clone();
    if config.catalogue.canonical_name(&current.name).as_deref() != Some(canonical.as_str()) {
        return Err(UvConvError::PhaseCentreMismatch {
            current: current.name,
            requested: source.into(),
        });
    }
    let mut complex = store.uv_data.flux.to_complex(store.num_stokes())?;
    let current_delay_s = store.uv_data.ww.clone();

    let previous = store.phase.history.last().cloned().unwrap_or(SourceEntry {
        id: current.id,
        name: ZENITH.into(),
        ..SourceEntry::default()
    });
    let previous_name = resolve(config, &previous.name)?;
    let position = if generate_uvw_columns {
        generate_uvw(store, config, &previous_name, false)?
    } else {
        None
    };
    let previous_delay_s = store.uv_data.ww.clone();
    let freqs_hz = store.frequencies_hz();

    debug!("unphasing from {} back to {}", current.name, previous_name);
    rotate_by_delay(
        &mut complex,
        &previous_delay_s,
        &current_delay_s,
        &freqs_hz,
        Direction::Undo,
        draw_progress,
    );
    store.uv_data.flux.assign_complex(&complex)?;

    store.phase.history.pop();
    store.phase.current = match position {
        Some(pos) if pos.name == ZENITH => SourceEntry {
            id: current.id,
            name: pos.name,
            ra_deg: pos.ra_deg,
            dec_deg: pos.dec_deg,
        },
        _ => SourceEntry {
            id: current.id,
            ..previous
        },
    };

    trace!("end unphase_from_source");
    Ok(())
}

/// Where `source` is at the epoch of the first row (or `DATE-OBS` for an empty store).
fn position_at_start(
    store: &VisibilityStore,
    config: &TelescopeConfig,
    source: &str,
) -> Result<SourcePosition, UvConvError> {
    let epoch = match store.num_rows() {
        0 => store.date_obs,
        _ => store.uv_data.row_epoch(0),
    };
    let site = config.site;
    config.catalogue.hour_angle_and_dec(
        source,
        sidereal_time(epoch, site.longitude_rad),
        site.latitude_rad,
    )
}

fn resolve(config: &TelescopeConfig, source: &str) -> Result<String, UvConvError> {
    config
        .catalogue
        .canonical_name(source)
        .ok_or_else(|| UvConvError::UnknownSource {
            name: source.into(),
            known: config.catalogue.names().join(", "),
        })
}

/// The per-row, per-product cable delay difference `delay[ant1, feed1] - delay[ant2, feed2]`.
fn cable_delay_differences(
    store: &VisibilityStore,
    delays_s: &[[f64; 2]],
    function: &str,
) -> Result<Vec<Vec<f64>>, UvConvError> {
    let feeds = store
        .stokes
        .iter()
        .map(|&stokes| {
            stokes.feeds().ok_or(UvConvError::InvalidStokes {
                function: function.into(),
                code: stokes.code(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let delay_of = |ant: usize, feed: Feed| -> Result<f64, UvConvError> {
        let [a, b] = *delays_s
            .get(ant - 1)
            .ok_or_else(|| UvConvError::BadArrayShape {
                argument: "cable delays".into(),
                function: function.into(),
                expected: format!("a delay for antenna {ant}"),
                received: format!("{} antennas", delays_s.len()),
            })?;
        Ok(match feed {
            Feed::A => a,
            Feed::B => b,
        })
    };
    store
        .antenna_pairs()?
        .into_iter()
        .map(|(ant1, ant2)| {
            feeds
                .iter()
                .map(|&(feed1, feed2)| Ok(delay_of(ant1, feed1)? - delay_of(ant2, feed2)?))
                .collect()
        })
        .collect()
}

fn rotate_by_cable_delay(
    store: &mut VisibilityStore,
    delays_s: &[[f64; 2]],
    direction: Direction,
    draw_progress: bool,
    function: &str,
) -> Result<(), UvConvError> {
    let mut complex = store.uv_data.flux.to_complex(store.num_stokes())?;
    let differences = cable_delay_differences(store, delays_s, function)?;
    let freqs_hz = store.frequencies_hz();

    let correction_progress = progress_bar(complex.dim().0, "cable corrections", draw_progress);
    for (mut row_vis, row_differences) in izip!(complex.outer_iter_mut(), &differences) {
        for (mut chan_vis, &freq_hz) in row_vis.outer_iter_mut().zip(&freqs_hz) {
            for (vis, &difference_s) in chan_vis.iter_mut().zip(row_differences) {
                let angle = TAU * freq_hz * difference_s;
                let (sin_angle, cos_angle) = angle.sin_cos();
                #[allow(clippy::cast_possible_truncation)]
                let rotation = Complex::new(cos_angle as f32, sin_angle as f32);
                match direction {
                    Direction::Apply => *vis *= rotation,
                    Direction::Undo => *vis /= rotation,
                }
            }
        }
        correction_progress.inc(1);
    }
    correction_progress.finish();

    store.uv_data.flux.assign_complex(&complex)
}

/// Correct for the electrical length of each antenna's signal path.
///
/// Every product of every row is multiplied by `exp(2πi f (d[ant1, feed1] - d[ant2, feed2]))`
/// where `d = length / c` from the telescope's cable delay table. The applied delays are
/// recorded so they can't be applied twice and can be removed with [`remove_cable_delays`].
///
/// # Errors
///
/// - [`UvConvError::NoCalibrationData`] if the telescope has no cable delay table
/// - [`UvConvError::CableDelaysAlreadyApplied`] if delays have already been applied
/// - [`UvConvError::InvalidStokes`] for stokes I, Q, U or V products
/// - [`UvConvError::InvalidFluxType`] if FLUX isn't `f32`
pub fn apply_cable_delays(
    store: &mut VisibilityStore,
    config: &TelescopeConfig,
    draw_progress: bool,
) -> Result<(), UvConvError> {
    trace!("start apply_cable_delays");

    let table = config
        .cable_delays
        .as_ref()
        .ok_or_else(|| UvConvError::NoCalibrationData {
            telescope: config.name.clone(),
        })?;
    if let Some(applied) = &store.cable_delays {
        return Err(UvConvError::CableDelaysAlreadyApplied {
            date_generated: applied.date_generated.clone(),
        });
    }
    if table.lengths_m.len() < store.num_antennas() {
        warn!(
            "cable delay table has {} antennas, the array has {}",
            table.lengths_m.len(),
            store.num_antennas()
        );
    }
    let delays_s = table.delays_s();
    rotate_by_cable_delay(
        store,
        &delays_s,
        Direction::Apply,
        draw_progress,
        "apply_cable_delays",
    )?;
    store.cable_delays = Some(CableDelayProvenance {
        date_generated: table.date_generated.clone(),
        delays_s,
    });

    trace!("end apply_cable_delays");
    Ok(())
}

/// Undo [`apply_cable_delays`] using the delays recorded when they were applied.
///
/// # Errors
///
/// - [`UvConvError::NoCalibrationData`] if no delays have been applied
/// - see [`apply_cable_delays`]
pub fn remove_cable_delays(
    store: &mut VisibilityStore,
    draw_progress: bool,
) -> Result<(), UvConvError> {
    trace!("start remove_cable_delays");

    let applied = store
        .cable_delays
        .clone()
        .ok_or_else(|| UvConvError::NoCalibrationData {
            telescope: store.telescope.clone(),
        })?;
    rotate_by_cable_delay(
        store,
        &applied.delays_s,
        Direction::Undo,
        draw_progress,
        "remove_cable_delays",
    )?;
    store.cable_delays = None;

    trace!("end remove_cable_delays");
    Ok(())
}
