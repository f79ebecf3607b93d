//! Reading and writing visibility stores as JSON.
//!
//! The whole store is one JSON document. FLUX is written flat, row-major, alongside its
//! element type and row width. Only the rows in the store's baseline selection are written.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use hifitime::Epoch;
use lazy_static::lazy_static;
use log::{debug, trace, warn};
use ndarray::{Array1, Array2};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::IOError;
use crate::{
    selection::selected_rows,
    store::{
        ArrayGeometry, BaselineSelection, CableDelayProvenance, FlagEntry, FluxBuffer,
        FrequencySetup, PhaseState, Stokes, UvData, VisibilityStore,
    },
    UvConvError,
};

lazy_static! {
    static ref DATE_OBS: Regex = Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})[T\-_ ](\d{2}):(\d{2}):(\d{2})(?:\.(\d+))?$"
    )
    .unwrap();
}

const DATE_OBS_FORMAT: &str = "YYYY-MM-DDTHH:MM:SS[.f]";

/// Parse a DATE-OBS string, `YYYY-MM-DD` and `HH:MM:SS[.f]` separated by `T`, `-`, `_` or a
/// space.
///
/// # Errors
///
/// [`IOError::BadDate`] if the string doesn't match, or isn't a valid date.
///
/// # Examples
///
/// ```rust
/// use uvconv::io::json::parse_date_obs;
///
/// let epoch = parse_date_obs("2013-05-01-06:00:00").unwrap();
/// assert_eq!(epoch, parse_date_obs("2013-05-01T06:00:00.000").unwrap());
/// ```
pub fn parse_date_obs(value: &str) -> Result<Epoch, IOError> {
    let bad_date = || IOError::BadDate {
        value: value.into(),
        expected: DATE_OBS_FORMAT.into(),
    };
    let captures = DATE_OBS.captures(value.trim()).ok_or_else(bad_date)?;
    let field = |idx: usize| -> Result<u32, IOError> {
        captures
            .get(idx)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(bad_date)
    };
    let year = i32::try_from(field(1)?).map_err(|_| bad_date())?;
    let [month, day, hour, minute, second] = [field(2)?, field(3)?, field(4)?, field(5)?, field(6)?]
        .map(|v| u8::try_from(v).unwrap_or(u8::MAX));
    // fraction of a second, to nanoseconds
    let nanos = match captures.get(7) {
        Some(fraction) => {
            let digits: String = fraction
                .as_str()
                .chars()
                .chain(std::iter::repeat('0'))
                .take(9)
                .collect();
            digits.parse::<u32>().map_err(|_| bad_date())?
        }
        None => 0,
    };
    Epoch::maybe_from_gregorian_utc(year, month, day, hour, minute, second, nanos)
        .map_err(|_| bad_date())
}

/// Format an epoch as a DATE-OBS string with nanosecond precision.
pub fn format_date_obs(epoch: Epoch) -> String {
    let (year, month, day, hour, minute, second, nanos) = epoch.to_gregorian_utc();
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{nanos:09}")
}

#[derive(Serialize, Deserialize)]
struct FluxFile {
    dtype: String,
    width: usize,
    values: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
#[allow(non_snake_case)]
struct UvDataFile {
    UU: Vec<f64>,
    VV: Vec<f64>,
    WW: Vec<f64>,
    DATE: Vec<f64>,
    TIME: Vec<f64>,
    BASELINE: Vec<usize>,
    #[serde(default)]
    SOURCE: Option<Vec<usize>>,
    #[serde(default)]
    FREQID: Option<Vec<usize>>,
    #[serde(default)]
    INTTIM: Option<Vec<f64>>,
    FLUX: FluxFile,
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    telescope: String,
    date_obs: String,
    int_time_s: f64,
    frequency: FrequencySetup,
    stokes: Vec<i32>,
    array: ArrayGeometry,
    #[serde(default)]
    phase: PhaseState,
    #[serde(default)]
    flags: Vec<FlagEntry>,
    #[serde(default)]
    cable_delays: Option<CableDelayProvenance>,
    uv_data: UvDataFile,
}

fn inconsistent(file: &Path, expected: String, found: String) -> IOError {
    IOError::Inconsistent {
        file: file.display().to_string(),
        expected,
        found,
    }
}

fn to_store_file(store: &VisibilityStore) -> StoreFile {
    let rows = selected_rows(store);
    let uv_data = if store.selection == BaselineSelection::All {
        store.uv_data.clone()
    } else {
        debug!("writing {} of {} rows", rows.len(), store.num_rows());
        store.uv_data.select_rows(&rows)
    };
    let (_, width) = uv_data.flux.dim();
    let flux = uv_data.flux.to_f64();
    StoreFile {
        telescope: store.telescope.clone(),
        date_obs: format_date_obs(store.date_obs),
        int_time_s: store.int_time_s,
        frequency: store.frequency.clone(),
        stokes: store.stokes_codes(),
        array: store.array.clone(),
        phase: store.phase.clone(),
        flags: store.flags.clone(),
        cable_delays: store.cable_delays.clone(),
        uv_data: UvDataFile {
            UU: uv_data.uu.to_vec(),
            VV: uv_data.vv.to_vec(),
            WW: uv_data.ww.to_vec(),
            DATE: uv_data.date.to_vec(),
            TIME: uv_data.time.to_vec(),
            BASELINE: uv_data.baseline.to_vec(),
            SOURCE: Some(uv_data.source.to_vec()),
            FREQID: Some(uv_data.freqid.to_vec()),
            INTTIM: Some(uv_data.inttim.to_vec()),
            FLUX: FluxFile {
                dtype: uv_data.flux.dtype().into(),
                width,
                values: flux.iter().copied().collect(),
            },
        },
    }
}

fn from_store_file(file: StoreFile, path: &Path) -> Result<VisibilityStore, UvConvError> {
    let columns = file.uv_data;
    let num_rows = columns.BASELINE.len();

    let source = columns.SOURCE.unwrap_or_else(|| {
        warn!("no SOURCE column in {}, defaulting to 1", path.display());
        vec![1; num_rows]
    });
    let freqid = columns.FREQID.unwrap_or_else(|| {
        warn!("no FREQID column in {}, defaulting to 1", path.display());
        vec![1; num_rows]
    });
    let inttim = columns.INTTIM.unwrap_or_else(|| {
        warn!(
            "no INTTIM column in {}, defaulting to {} s",
            path.display(),
            file.int_time_s
        );
        vec![file.int_time_s; num_rows]
    });

    let FluxFile {
        dtype,
        width,
        values,
    } = columns.FLUX;
    if width == 0 || values.len() % width != 0 {
        return Err(inconsistent(
            path,
            format!("a multiple of {width} FLUX values"),
            format!("{}", values.len()),
        )
        .into());
    }
    let shape = (values.len() / width, width);
    let flux = Array2::from_shape_vec(shape, values).map_err(|err| {
        inconsistent(path, format!("FLUX of shape {shape:?}"), err.to_string())
    })?;
    #[allow(clippy::cast_possible_truncation)]
    let flux = match dtype.as_str() {
        "f64" => FluxBuffer::F64(flux),
        "f32" => FluxBuffer::F32(flux.mapv(|v| v as f32)),
        _ => {
            return Err(UvConvError::InvalidFluxType {
                function: "read_store".into(),
                found: dtype,
            })
        }
    };

    let store = VisibilityStore {
        uv_data: UvData {
            uu: Array1::from(columns.UU),
            vv: Array1::from(columns.VV),
            ww: Array1::from(columns.WW),
            date: Array1::from(columns.DATE),
            time: Array1::from(columns.TIME),
            baseline: Array1::from(columns.BASELINE),
            source: Array1::from(source),
            freqid: Array1::from(freqid),
            inttim: Array1::from(inttim),
            flux,
        },
        frequency: file.frequency,
        stokes: file
            .stokes
            .into_iter()
            .map(Stokes::from_code)
            .collect::<Result<_, _>>()?,
        array: file.array,
        phase: file.phase,
        telescope: file.telescope,
        date_obs: parse_date_obs(&file.date_obs)?,
        int_time_s: file.int_time_s,
        flags: file.flags,
        cable_delays: file.cable_delays,
        selection: BaselineSelection::All,
    };
    store.validate()?;
    Ok(store)
}

/// Write the store, or the rows in its baseline selection, to a JSON file.
///
/// # Errors
///
/// [`IOError::StdIO`] or [`IOError::Json`] if the file can't be written.
pub fn write_store<P: AsRef<Path>>(store: &VisibilityStore, path: P) -> Result<(), UvConvError> {
    trace!("start write_store");
    let file = File::create(path.as_ref()).map_err(IOError::from)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &to_store_file(store)).map_err(IOError::from)?;
    writer.flush().map_err(IOError::from)?;
    trace!("end write_store");
    Ok(())
}

/// Read a store from a JSON file.
///
/// Missing SOURCE and FREQID columns default to 1, and a missing INTTIM column to the nominal
/// integration time.
///
/// # Errors
///
/// - [`IOError::StdIO`] or [`IOError::Json`] if the file can't be read
/// - [`IOError::Inconsistent`] if FLUX doesn't fill whole rows
/// - [`IOError::BadDate`] if `date_obs` can't be parsed
/// - [`UvConvError::InvalidFluxType`] for a FLUX dtype other than `f32` or `f64`
/// - [`UvConvError::BadArrayShape`] if the columns disagree, see [`VisibilityStore::validate`]
pub fn read_store<P: AsRef<Path>>(path: P) -> Result<VisibilityStore, UvConvError> {
    trace!("start read_store");
    let path = path.as_ref();
    let file = File::open(path).map_err(IOError::from)?;
    let parsed: StoreFile =
        serde_json::from_reader(BufReader::new(file)).map_err(IOError::from)?;
    let store = from_store_file(parsed, path)?;
    debug!(
        "read {} rows of {} channels from {}",
        store.num_rows(),
        store.num_chans(),
        path.display()
    );
    trace!("end read_store");
    Ok(store)
}

#[derive(Serialize, Deserialize)]
#[allow(non_snake_case)]
struct UvwFile {
    UU: Vec<f64>,
    VV: Vec<f64>,
    WW: Vec<f64>,
    BASELINE: Vec<usize>,
}

/// Write the UU, VV, WW and BASELINE columns to a JSON file.
///
/// # Errors
///
/// [`IOError::StdIO`] or [`IOError::Json`] if the file can't be written.
pub fn dump_uvw<P: AsRef<Path>>(store: &VisibilityStore, path: P) -> Result<(), IOError> {
    let uvw = UvwFile {
        UU: store.uv_data.uu.to_vec(),
        VV: store.uv_data.vv.to_vec(),
        WW: store.uv_data.ww.to_vec(),
        BASELINE: store.uv_data.baseline.to_vec(),
    };
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer(&mut writer, &uvw)?;
    writer.flush()?;
    Ok(())
}

/// Replace the UU, VV, WW and BASELINE columns with those from a [`dump_uvw`] file.
///
/// # Errors
///
/// - [`IOError::StdIO`] or [`IOError::Json`] if the file can't be read
/// - [`IOError::Inconsistent`] if any column doesn't have a value for every row
pub fn load_uvw<P: AsRef<Path>>(store: &mut VisibilityStore, path: P) -> Result<(), IOError> {
    let path = path.as_ref();
    let uvw: UvwFile = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    let num_rows = store.num_rows();
    for (name, len) in [
        ("UU", uvw.UU.len()),
        ("VV", uvw.VV.len()),
        ("WW", uvw.WW.len()),
        ("BASELINE", uvw.BASELINE.len()),
    ] {
        if len != num_rows {
            return Err(inconsistent(
                path,
                format!("{num_rows} {name} values"),
                format!("{len}"),
            ));
        }
    }
    store.uv_data.uu = Array1::from(uvw.UU);
    store.uv_data.vv = Array1::from(uvw.VV);
    store.uv_data.ww = Array1::from(uvw.WW);
    store.uv_data.baseline = Array1::from(uvw.BASELINE);
    Ok(())
}
