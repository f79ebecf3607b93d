//! Selecting and editing a subset of the rows of a visibility store.
//!
//! A baseline selection is recorded on the store rather than applied to it, so exporters can
//! choose which rows to write with [`selected_rows`] while every transform still sees whole
//! integrations. Other operations here cut the store down in place.

use std::collections::HashSet;

use log::{debug, info, trace, warn};
use ndarray::{Array1, Array3, Axis};
use num_complex::Complex;

use crate::{
    baseline::{baselines_touching, decode_baseline, encode_baseline},
    constants::MAX_COMPACT_ANTENNA_ID,
    store::{BaselineSelection, FlagEntry, VisibilityStore},
    UvConvError,
};

/// Longest flag reason which fits the FLAG table.
const MAX_REASON_LEN: usize = 24;

/// Record which baselines are exported.
///
/// The selection is kept on the store and re-applied after any reshaping transform.
///
/// # Errors
///
/// [`UvConvError::Domain`] if an id is not a valid baseline id.
pub fn select_baselines(
    store: &mut VisibilityStore,
    selection: BaselineSelection,
) -> Result<(), UvConvError> {
    if let BaselineSelection::Ids(ids) = &selection {
        for &id in ids {
            decode_baseline(id)?;
        }
        let present: HashSet<usize> = store.uv_data.baseline.iter().copied().collect();
        let missing = ids.iter().filter(|id| !present.contains(*id)).count();
        if missing > 0 {
            warn!("{missing} of {} selected baselines have no rows", ids.len());
        }
        debug!("selected {} baselines", ids.len());
    }
    store.selection = selection;
    Ok(())
}

/// Select every baseline of the first integration which includes `antenna_id`.
///
/// # Errors
///
/// [`UvConvError::InvalidArgument`] if the antenna doesn't appear in any baseline.
pub fn select_antenna(store: &mut VisibilityStore, antenna_id: usize) -> Result<(), UvConvError> {
    let first_integration: Vec<usize> = store
        .uv_data
        .baseline
        .iter()
        .take(store.baselines_per_integration())
        .copied()
        .collect();
    let ids = baselines_touching(antenna_id, &first_integration);
    if ids.is_empty() {
        return Err(UvConvError::InvalidArgument {
            argument: "antenna_id".into(),
            function: "select_antenna".into(),
            reason: format!("antenna {antenna_id} is not in any baseline"),
        });
    }
    select_baselines(store, BaselineSelection::Ids(ids))
}

/// The indices of the rows in the current baseline selection, in row order.
pub fn selected_rows(store: &VisibilityStore) -> Vec<usize> {
    match &store.selection {
        BaselineSelection::All => (0..store.num_rows()).collect(),
        BaselineSelection::Ids(ids) => {
            let ids: HashSet<usize> = ids.iter().copied().collect();
            store
                .uv_data
                .baseline
                .iter()
                .enumerate()
                .filter(|(_, bl)| ids.contains(*bl))
                .map(|(row, _)| row)
                .collect()
        }
    }
}

/// Keep only integrations `start..stop` (0-based, exclusive).
///
/// `None` means the first or last integration.
///
/// # Errors
///
/// [`UvConvError::InvalidArgument`] unless `start <= stop <= num_integrations`.
pub fn extract_integrations(
    store: &mut VisibilityStore,
    start: Option<usize>,
    stop: Option<usize>,
) -> Result<(), UvConvError> {
    let num_baselines = store.baselines_per_integration();
    let num_ints = store.num_integrations();
    let start = start.unwrap_or(0);
    let stop = stop.unwrap_or(num_ints);
    if start > stop || stop > num_ints {
        return Err(UvConvError::InvalidArgument {
            argument: "start..stop".into(),
            function: "extract_integrations".into(),
            reason: format!("{start}..{stop} is not within 0..{num_ints}"),
        });
    }
    let rows: Vec<usize> = (start * num_baselines..stop * num_baselines).collect();
    store.uv_data = store.uv_data.select_rows(&rows);
    if let Some(row) = rows.first() {
        debug!("extracted integrations {start}..{stop} from row {row}");
    }
    Ok(())
}

/// The autocorrelation of one antenna, `[stokes][integration][chan]`, and optionally the
/// TIME of each integration.
///
/// # Errors
///
/// - [`UvConvError::Domain`] if `antenna_id` is out of range
/// - see [`VisibilityStore::stokes_array`]
pub fn extract_antenna(
    store: &VisibilityStore,
    antenna_id: usize,
    timestamps: bool,
) -> Result<(Option<Array1<f64>>, Array3<Complex<f32>>), UvConvError> {
    let auto = encode_baseline(antenna_id, antenna_id)?;
    let rows: Vec<usize> = store
        .uv_data
        .baseline
        .iter()
        .enumerate()
        .filter(|(_, bl)| **bl == auto)
        .map(|(row, _)| row)
        .collect();
    if rows.is_empty() {
        warn!("no autocorrelations of antenna {antenna_id}");
    }
    let data = store.stokes_array()?.select(Axis(1), &rows);
    let times = timestamps.then(|| store.uv_data.time.select(Axis(0), &rows));
    Ok((times, data))
}

/// Remove every row with an antenna above 255, and those antennas.
///
/// Returns the number of rows removed.
///
/// # Errors
///
/// [`UvConvError::Domain`] if a baseline id can't be decoded.
pub fn remove_miriad_baselines(store: &mut VisibilityStore) -> Result<usize, UvConvError> {
    trace!("start remove_miriad_baselines");
    let rows: Vec<usize> = store
        .antenna_pairs()?
        .into_iter()
        .enumerate()
        .filter(|(_, (ant1, ant2))| {
            *ant1 <= MAX_COMPACT_ANTENNA_ID && *ant2 <= MAX_COMPACT_ANTENNA_ID
        })
        .map(|(row, _)| row)
        .collect();
    let removed = store.num_rows() - rows.len();
    store.uv_data = store.uv_data.select_rows(&rows);
    store
        .array
        .antennas
        .retain(|ant| ant.id <= MAX_COMPACT_ANTENNA_ID);
    if removed > 0 {
        info!("removed {removed} rows with antennas above {MAX_COMPACT_ANTENNA_ID}");
    }
    let selection = store.selection.clone();
    select_baselines(store, selection)?;
    trace!("end remove_miriad_baselines");
    Ok(removed)
}

/// Add a FLAG table entry marking an antenna bad over every channel and product.
///
/// `severity` is -1 (not assigned), 0 (known bad), 1 (probably bad) or 2 (maybe bad).
///
/// # Errors
///
/// [`UvConvError::InvalidArgument`] if the antenna is not in the array, or the severity is
/// outside `-1..=2`.
pub fn flag_antenna(
    store: &mut VisibilityStore,
    antenna_id: usize,
    reason: Option<&str>,
    severity: i32,
) -> Result<(), UvConvError> {
    if store.array.position_of(antenna_id).is_none() {
        return Err(UvConvError::InvalidArgument {
            argument: "antenna_id".into(),
            function: "flag_antenna".into(),
            reason: format!("no antenna {antenna_id} in the array"),
        });
    }
    if !(-1..=2).contains(&severity) {
        return Err(UvConvError::InvalidArgument {
            argument: "severity".into(),
            function: "flag_antenna".into(),
            reason: format!("severity {severity} is not in -1..=2"),
        });
    }
    let mut reason = reason.unwrap_or("Known bad antenna.").to_string();
    if reason.chars().count() > MAX_REASON_LEN {
        warn!("flag reason \"{reason}\" is longer than {MAX_REASON_LEN} characters, truncating");
        reason = reason.chars().take(MAX_REASON_LEN).collect();
    }
    info!("flagging antenna {antenna_id}: {reason}");
    store.flags.push(FlagEntry {
        antenna_id,
        reason,
        severity,
        chans: (1, store.num_chans()),
        pflags: vec![true; store.num_stokes()],
    });
    Ok(())
}
