//! The canonical, in-memory representation of a visibility dataset.
//!
//! Rows follow the FITS-IDI `UV_DATA` table: one row per baseline per integration, with the
//! FLUX of each row stored as interleaved `(re, im)` pairs, channel-major then stokes.
//!
//! ```text
//! [ch0: s0.re s0.im s1.re s1.im ..][ch1: s0.re s0.im ..] ..
//! ```

use std::{fmt::Display, str::FromStr};

use hifitime::Epoch;
use log::warn;
use ndarray::{Array1, Array2, Array3, ArrayView1, Axis};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::{
    baseline::{decode_baseline, encode_baseline},
    pos::{XyzGeocentric, XyzGeodetic, ZENITH},
    UvConvError,
};

/// A correlation product, with its FITS stokes code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Stokes {
    /// Total intensity
    I,
    /// Linear polarisation, Q
    Q,
    /// Linear polarisation, U
    U,
    /// Circular polarisation
    V,
    /// Right-right circular
    RR,
    /// Left-left circular
    LL,
    /// Right-left circular cross-hand
    RL,
    /// Left-right circular cross-hand
    LR,
    /// X-X linear
    XX,
    /// Y-Y linear
    YY,
    /// X-Y linear cross-hand
    XY,
    /// Y-X linear cross-hand
    YX,
}

/// One of the two feeds of an antenna.
///
/// Feed `A` is X (or R), feed `B` is Y (or L).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feed {
    /// X or R
    A,
    /// Y or L
    B,
}

impl Stokes {
    /// The FITS stokes code.
    pub const fn code(self) -> i32 {
        match self {
            Self::I => 1,
            Self::Q => 2,
            Self::U => 3,
            Self::V => 4,
            Self::RR => -1,
            Self::LL => -2,
            Self::RL => -3,
            Self::LR => -4,
            Self::XX => -5,
            Self::YY => -6,
            Self::XY => -7,
            Self::YX => -8,
        }
    }

    /// Look up a FITS stokes code.
    ///
    /// # Errors
    ///
    /// [`UvConvError::Domain`] for codes outside `-8..=4` or zero.
    pub fn from_code(code: i32) -> Result<Self, UvConvError> {
        Ok(match code {
            1 => Self::I,
            2 => Self::Q,
            3 => Self::U,
            4 => Self::V,
            -1 => Self::RR,
            -2 => Self::LL,
            -3 => Self::RL,
            -4 => Self::LR,
            -5 => Self::XX,
            -6 => Self::YY,
            -7 => Self::XY,
            -8 => Self::YX,
            _ => {
                return Err(UvConvError::Domain {
                    function: "Stokes::from_code".into(),
                    argument: "code".into(),
                    expected: "a FITS stokes code in -8..=-1 or 1..=4".into(),
                    received: format!("{code}"),
                })
            }
        })
    }

    /// The feeds of the first and second antenna which form this product.
    pub const fn feeds(self) -> Option<(Feed, Feed)> {
        match self {
            Self::XX | Self::RR => Some((Feed::A, Feed::A)),
            Self::YY | Self::LL => Some((Feed::B, Feed::B)),
            Self::XY | Self::RL => Some((Feed::A, Feed::B)),
            Self::YX | Self::LR => Some((Feed::B, Feed::A)),
            Self::I | Self::Q | Self::U | Self::V => None,
        }
    }
}

impl Display for Stokes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Parameters of the (single band) frequency axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrequencySetup {
    /// Frequency at the reference pixel \[Hz\]
    pub ref_freq_hz: f64,
    /// Channel width \[Hz\]
    pub chan_width_hz: f64,
    /// Reference pixel, 0-based and possibly fractional
    pub ref_pixel: f64,
    /// Number of channels
    pub num_chans: usize,
    /// Number of bands (IFs)
    pub num_bands: usize,
    /// Total bandwidth \[Hz\]
    pub total_bandwidth_hz: f64,
}

impl FrequencySetup {
    /// Build a setup for `num_chans` channels where `ref_freq_hz` is the first channel.
    pub fn new(ref_freq_hz: f64, chan_width_hz: f64, num_chans: usize) -> Self {
        Self {
            ref_freq_hz,
            chan_width_hz,
            ref_pixel: 0.0,
            num_chans,
            num_bands: 1,
            total_bandwidth_hz: chan_width_hz * num_chans as f64,
        }
    }

    /// The centre frequency of each channel \[Hz\].
    ///
    /// `freq[k] = k * chan_width + (ref_freq - ref_pixel * chan_width)`
    pub fn frequencies_hz(&self) -> Array1<f64> {
        let start = self.ref_freq_hz - self.ref_pixel * self.chan_width_hz;
        Array1::from_shape_fn(self.num_chans, |k| k as f64 * self.chan_width_hz + start)
    }
}

/// An antenna of the array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Antenna {
    /// Station name
    pub name: String,
    /// 1-based station id
    pub id: usize,
    /// Position relative to the array centre \[m\]
    pub position: XyzGeodetic,
}

/// The array, its reference position and its antennas.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayGeometry {
    /// Array name (ARRNAM)
    pub name: String,
    /// Array reference position \[m, ECEF\] (ARRAYX, ARRAYY, ARRAYZ)
    pub array_xyz: XyzGeocentric,
    /// Antennas, ordered by id
    pub antennas: Vec<Antenna>,
}

impl ArrayGeometry {
    /// Antenna positions indexed by `id - 1`.
    pub fn positions(&self) -> Vec<XyzGeodetic> {
        self.antennas.iter().map(|ant| ant.position).collect()
    }

    /// Look up the position of an antenna by id.
    pub fn position_of(&self, id: usize) -> Option<XyzGeodetic> {
        self.antennas
            .get(id.checked_sub(1)?)
            .filter(|ant| ant.id == id)
            .map(|ant| ant.position)
            .or_else(|| {
                self.antennas
                    .iter()
                    .find(|ant| ant.id == id)
                    .map(|ant| ant.position)
            })
    }

    /// Check ids are unique and contiguous from 1.
    ///
    /// # Errors
    ///
    /// [`UvConvError::Verification`] describing the first bad id.
    pub fn validate(&self) -> Result<(), UvConvError> {
        for (idx, ant) in self.antennas.iter().enumerate() {
            if ant.id != idx + 1 {
                return Err(UvConvError::Verification {
                    reason: format!(
                        "antenna {} at index {idx} has id {}, expected {}",
                        ant.name,
                        ant.id,
                        idx + 1
                    ),
                });
            }
        }
        Ok(())
    }
}

/// An entry in the SOURCE table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// SOURCE_ID referenced by the SOURCE column
    pub id: usize,
    /// Source name
    pub name: String,
    /// Right ascension \[degrees\]
    pub ra_deg: f64,
    /// Declination \[degrees\]
    pub dec_deg: f64,
}

impl Default for SourceEntry {
    fn default() -> Self {
        Self {
            id: 1,
            name: ZENITH.into(),
            ra_deg: 0.0,
            dec_deg: 0.0,
        }
    }
}

/// What the visibilities are phased to, and what they were phased to before that.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    /// The current phase centre
    pub current: SourceEntry,
    /// Earlier phase centres, most recent last
    pub history: Vec<SourceEntry>,
}

/// A FLAG table entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlagEntry {
    /// Flagged antenna id
    pub antenna_id: usize,
    /// Why it was flagged
    pub reason: String,
    /// Severity code, -1 if unspecified
    pub severity: i32,
    /// Flagged channel range, 1-based inclusive (0 means all)
    pub chans: (usize, usize),
    /// Which stokes products are flagged
    pub pflags: Vec<bool>,
}

/// Cable delays which have been applied to the visibilities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CableDelayProvenance {
    /// When the calibration was generated
    pub date_generated: String,
    /// Applied delay per antenna for feeds `[A, B]` \[s\]
    pub delays_s: Vec<[f64; 2]>,
}

/// Which baselines are exported.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaselineSelection {
    /// Every row is selected
    #[default]
    All,
    /// Only rows with one of these baseline ids
    Ids(Vec<usize>),
}

/// The FLUX column.
#[derive(Clone, Debug, PartialEq)]
pub enum FluxBuffer {
    /// Single precision, the only type the corrections accept
    F32(Array2<f32>),
    /// Double precision
    F64(Array2<f64>),
}

impl FluxBuffer {
    /// `(rows, floats per row)`
    pub fn dim(&self) -> (usize, usize) {
        match self {
            Self::F32(flux) => flux.dim(),
            Self::F64(flux) => flux.dim(),
        }
    }

    /// A short name of the element type.
    pub const fn dtype(&self) -> &'static str {
        match self {
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
        }
    }

    fn complex_shape(&self, num_stokes: usize, function: &str) -> Result<(usize, usize), UvConvError> {
        let (num_rows, width) = self.dim();
        if num_stokes == 0 || width % (2 * num_stokes) != 0 {
            return Err(UvConvError::BadArrayShape {
                argument: "flux".into(),
                function: function.into(),
                expected: format!("a multiple of 2 * {num_stokes} floats per row"),
                received: format!("{width}"),
            });
        }
        Ok((num_rows, width / (2 * num_stokes)))
    }

    /// View the real pairs as complex visibilities, `[row][chan][stokes]`.
    ///
    /// # Errors
    ///
    /// - [`UvConvError::InvalidFluxType`] unless the storage is `f32`
    /// - [`UvConvError::BadArrayShape`] if the row width isn't `2 * num_stokes * n`
    pub fn to_complex(&self, num_stokes: usize) -> Result<Array3<Complex<f32>>, UvConvError> {
        let flux = match self {
            Self::F32(flux) => flux,
            Self::F64(_) => {
                return Err(UvConvError::InvalidFluxType {
                    function: "FluxBuffer::to_complex".into(),
                    found: self.dtype().into(),
                })
            }
        };
        let (num_rows, num_chans) = self.complex_shape(num_stokes, "FluxBuffer::to_complex")?;
        Ok(Array3::from_shape_fn(
            (num_rows, num_chans, num_stokes),
            |(row, chan, stk)| {
                let idx = 2 * (chan * num_stokes + stk);
                Complex::new(flux[(row, idx)], flux[(row, idx + 1)])
            },
        ))
    }

    /// Overwrite the real pairs from a `[row][chan][stokes]` complex array.
    ///
    /// # Errors
    ///
    /// as [`FluxBuffer::to_complex`], and [`UvConvError::BadArrayShape`] if `complex`
    /// has a different shape.
    pub fn assign_complex(&mut self, complex: &Array3<Complex<f32>>) -> Result<(), UvConvError> {
        let (num_rows, num_chans, num_stokes) = complex.dim();
        let expected = self.complex_shape(num_stokes, "FluxBuffer::assign_complex")?;
        if expected != (num_rows, num_chans) {
            return Err(UvConvError::BadArrayShape {
                argument: "complex".into(),
                function: "FluxBuffer::assign_complex".into(),
                expected: format!("{:?}", (expected.0, expected.1, num_stokes)),
                received: format!("{:?}", complex.dim()),
            });
        }
        match self {
            Self::F32(flux) => {
                for ((row, chan, stk), vis) in complex.indexed_iter() {
                    let idx = 2 * (chan * num_stokes + stk);
                    flux[(row, idx)] = vis.re;
                    flux[(row, idx + 1)] = vis.im;
                }
                Ok(())
            }
            Self::F64(_) => Err(UvConvError::InvalidFluxType {
                function: "FluxBuffer::assign_complex".into(),
                found: self.dtype().into(),
            }),
        }
    }

    /// Interleave a `[row][chan][stokes]` complex array into `f32` real pairs.
    pub fn from_complex(complex: &Array3<Complex<f32>>) -> Self {
        let (num_rows, num_chans, num_stokes) = complex.dim();
        let mut flux = Array2::zeros((num_rows, num_chans * num_stokes * 2));
        for ((row, chan, stk), vis) in complex.indexed_iter() {
            let idx = 2 * (chan * num_stokes + stk);
            flux[(row, idx)] = vis.re;
            flux[(row, idx + 1)] = vis.im;
        }
        Self::F32(flux)
    }

    /// Copy to double precision, whatever the storage.
    pub fn to_f64(&self) -> Array2<f64> {
        match self {
            Self::F32(flux) => flux.mapv(f64::from),
            Self::F64(flux) => flux.clone(),
        }
    }

    /// Build a buffer with the same storage type as `self` from double precision values.
    #[allow(clippy::cast_possible_truncation)]
    pub fn like(&self, values: Array2<f64>) -> Self {
        match self {
            Self::F32(_) => Self::F32(values.mapv(|v| v as f32)),
            Self::F64(_) => Self::F64(values),
        }
    }

    /// Keep only the given rows, in order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        match self {
            Self::F32(flux) => Self::F32(flux.select(Axis(0), rows)),
            Self::F64(flux) => Self::F64(flux.select(Axis(0), rows)),
        }
    }
}

/// Columns of the `UV_DATA` table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Column {
    /// u \[s\]
    UU,
    /// v \[s\]
    VV,
    /// w \[s\]
    WW,
    /// Julian date of midnight
    DATE,
    /// Fraction of a day since `DATE`
    TIME,
    /// Encoded baseline id
    BASELINE,
    /// SOURCE table id
    SOURCE,
    /// Frequency setup id
    FREQID,
    /// Integration time \[s\]
    INTTIM,
    /// Visibilities
    FLUX,
}

impl Column {
    /// Every column, in table order.
    pub const ALL: [Self; 10] = [
        Self::UU,
        Self::VV,
        Self::WW,
        Self::DATE,
        Self::TIME,
        Self::BASELINE,
        Self::SOURCE,
        Self::FREQID,
        Self::INTTIM,
        Self::FLUX,
    ];
}

impl FromStr for Column {
    type Err = UvConvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "UU" => Self::UU,
            "VV" => Self::VV,
            "WW" => Self::WW,
            "DATE" => Self::DATE,
            "TIME" => Self::TIME,
            "BASELINE" => Self::BASELINE,
            "SOURCE" => Self::SOURCE,
            "FREQID" => Self::FREQID,
            "INTTIM" => Self::INTTIM,
            "FLUX" => Self::FLUX,
            _ => {
                return Err(UvConvError::InvalidArgument {
                    argument: "column".into(),
                    function: "Column::from_str".into(),
                    reason: format!("unknown UV_DATA column {s}"),
                })
            }
        })
    }
}

/// A borrowed column.
#[derive(Debug)]
pub enum ColumnData<'a> {
    /// UU, VV, WW, DATE, TIME, INTTIM
    Float(ArrayView1<'a, f64>),
    /// BASELINE, SOURCE, FREQID
    Int(ArrayView1<'a, usize>),
    /// FLUX
    Flux(&'a FluxBuffer),
}

/// The `UV_DATA` columns.
#[derive(Clone, Debug, PartialEq)]
pub struct UvData {
    /// u \[s\]
    pub uu: Array1<f64>,
    /// v \[s\]
    pub vv: Array1<f64>,
    /// w \[s\], the geometric delay to the phase centre
    pub ww: Array1<f64>,
    /// Julian date at 0h
    pub date: Array1<f64>,
    /// Fraction of a day since `date`
    pub time: Array1<f64>,
    /// Baseline id
    pub baseline: Array1<usize>,
    /// SOURCE_ID
    pub source: Array1<usize>,
    /// FREQID
    pub freqid: Array1<usize>,
    /// Integration time \[s\]
    pub inttim: Array1<f64>,
    /// Visibilities
    pub flux: FluxBuffer,
}

impl UvData {
    /// Rows with every column zeroed and `width` floats of flux per row.
    pub fn zeros(num_rows: usize, width: usize) -> Self {
        Self {
            uu: Array1::zeros(num_rows),
            vv: Array1::zeros(num_rows),
            ww: Array1::zeros(num_rows),
            date: Array1::zeros(num_rows),
            time: Array1::zeros(num_rows),
            baseline: Array1::zeros(num_rows),
            source: Array1::zeros(num_rows),
            freqid: Array1::zeros(num_rows),
            inttim: Array1::zeros(num_rows),
            flux: FluxBuffer::F32(Array2::zeros((num_rows, width))),
        }
    }

    /// The number of rows, according to the BASELINE column.
    pub fn num_rows(&self) -> usize {
        self.baseline.len()
    }

    /// Borrow a column.
    pub fn column(&self, column: Column) -> ColumnData<'_> {
        match column {
            Column::UU => ColumnData::Float(self.uu.view()),
            Column::VV => ColumnData::Float(self.vv.view()),
            Column::WW => ColumnData::Float(self.ww.view()),
            Column::DATE => ColumnData::Float(self.date.view()),
            Column::TIME => ColumnData::Float(self.time.view()),
            Column::INTTIM => ColumnData::Float(self.inttim.view()),
            Column::BASELINE => ColumnData::Int(self.baseline.view()),
            Column::SOURCE => ColumnData::Int(self.source.view()),
            Column::FREQID => ColumnData::Int(self.freqid.view()),
            Column::FLUX => ColumnData::Flux(&self.flux),
        }
    }

    /// The length of a column.
    pub fn column_len(&self, column: Column) -> usize {
        match self.column(column) {
            ColumnData::Float(values) => values.len(),
            ColumnData::Int(values) => values.len(),
            ColumnData::Flux(flux) => flux.dim().0,
        }
    }

    /// Keep only the given rows, in order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            uu: self.uu.select(Axis(0), rows),
            vv: self.vv.select(Axis(0), rows),
            ww: self.ww.select(Axis(0), rows),
            date: self.date.select(Axis(0), rows),
            time: self.time.select(Axis(0), rows),
            baseline: self.baseline.select(Axis(0), rows),
            source: self.source.select(Axis(0), rows),
            freqid: self.freqid.select(Axis(0), rows),
            inttim: self.inttim.select(Axis(0), rows),
            flux: self.flux.select_rows(rows),
        }
    }

    /// The epoch (DATE + TIME) of a row.
    pub fn row_epoch(&self, row: usize) -> Epoch {
        Epoch::from_jde_utc(self.date[row] + self.time[row])
    }
}

/// The canonical visibility store.
#[derive(Clone, Debug, PartialEq)]
pub struct VisibilityStore {
    /// Visibility rows
    pub uv_data: UvData,
    /// Frequency axis
    pub frequency: FrequencySetup,
    /// Correlation products, in the order they appear in each channel
    pub stokes: Vec<Stokes>,
    /// Array geometry
    pub array: ArrayGeometry,
    /// Phase centre and its history
    pub phase: PhaseState,
    /// Telescope name (TELESCOP)
    pub telescope: String,
    /// Start of the observation
    pub date_obs: Epoch,
    /// Nominal integration time \[s\]
    pub int_time_s: f64,
    /// FLAG table
    pub flags: Vec<FlagEntry>,
    /// Cable delays applied to FLUX, if any
    pub cable_delays: Option<CableDelayProvenance>,
    /// Baselines selected for export
    pub selection: BaselineSelection,
}

impl VisibilityStore {
    /// The number of rows.
    pub fn num_rows(&self) -> usize {
        self.uv_data.num_rows()
    }

    /// The number of antennas.
    pub fn num_antennas(&self) -> usize {
        self.array.antennas.len()
    }

    /// The number of correlation products.
    pub fn num_stokes(&self) -> usize {
        self.stokes.len()
    }

    /// The number of channels.
    pub fn num_chans(&self) -> usize {
        self.frequency.num_chans
    }

    /// Channel centre frequencies \[Hz\].
    pub fn frequencies_hz(&self) -> Array1<f64> {
        self.frequency.frequencies_hz()
    }

    /// The FITS stokes codes.
    pub fn stokes_codes(&self) -> Vec<i32> {
        self.stokes.iter().map(|s| s.code()).collect()
    }

    /// The number of rows in each integration: the distance to the second occurrence of the
    /// first row's baseline, or every row if it never repeats.
    pub fn baselines_per_integration(&self) -> usize {
        let baselines = &self.uv_data.baseline;
        match baselines.first() {
            Some(&first) => baselines
                .iter()
                .skip(1)
                .position(|&bl| bl == first)
                .map_or(baselines.len(), |pos| pos + 1),
            None => 0,
        }
    }

    /// The number of complete integrations.
    pub fn num_integrations(&self) -> usize {
        match self.baselines_per_integration() {
            0 => 0,
            num_baselines => self.num_rows() / num_baselines,
        }
    }

    /// Whether the first integration contains antenna 1's autocorrelation.
    pub fn has_autocorrelations(&self) -> bool {
        let auto = encode_baseline(1, 1).unwrap_or_default();
        self.uv_data
            .baseline
            .iter()
            .take(self.baselines_per_integration())
            .any(|&bl| bl == auto)
    }

    /// The antenna pair of each row.
    ///
    /// # Errors
    ///
    /// [`UvConvError::Domain`] if a baseline id can't be decoded.
    pub fn antenna_pairs(&self) -> Result<Vec<(usize, usize)>, UvConvError> {
        self.uv_data
            .baseline
            .iter()
            .map(|&bl| decode_baseline(bl))
            .collect()
    }

    /// Complex visibilities, `[stokes][row][chan]`.
    ///
    /// # Errors
    ///
    /// see [`FluxBuffer::to_complex`]
    pub fn stokes_array(&self) -> Result<Array3<Complex<f32>>, UvConvError> {
        let complex = self.uv_data.flux.to_complex(self.num_stokes())?;
        Ok(complex
            .permuted_axes([2, 0, 1])
            .as_standard_layout()
            .into_owned())
    }

    /// Check all columns have the same length and FLUX has the right width.
    ///
    /// # Errors
    ///
    /// [`UvConvError::BadArrayShape`] naming the first inconsistent column.
    pub fn validate(&self) -> Result<(), UvConvError> {
        let num_rows = self.num_rows();
        for column in Column::ALL {
            let len = self.uv_data.column_len(column);
            if len != num_rows {
                return Err(UvConvError::BadArrayShape {
                    argument: format!("{column:?}"),
                    function: "VisibilityStore::validate".into(),
                    expected: format!("{num_rows} rows"),
                    received: format!("{len} rows"),
                });
            }
        }
        if !matches!(self.num_stokes(), 1 | 2 | 4) {
            return Err(UvConvError::BadArrayShape {
                argument: "stokes".into(),
                function: "VisibilityStore::validate".into(),
                expected: "1, 2 or 4 products".into(),
                received: format!("{}", self.num_stokes()),
            });
        }
        let width = self.uv_data.flux.dim().1;
        let expected = self.num_chans() * self.num_stokes() * 2;
        if width != expected {
            return Err(UvConvError::BadArrayShape {
                argument: "FLUX".into(),
                function: "VisibilityStore::validate".into(),
                expected: format!("{expected} floats per row"),
                received: format!("{width}"),
            });
        }
        Ok(())
    }

    /// Set INTTIM of every row, and the nominal integration time.
    pub fn set_integration_time(&mut self, int_time_s: f64) {
        if int_time_s <= 0.0 {
            warn!("setting a non-positive integration time {int_time_s}");
        }
        self.int_time_s = int_time_s;
        self.uv_data.inttim.fill(int_time_s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_common::get_test_store;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_stokes_codes() {
        for code in (-8..=-1).chain(1..=4) {
            assert_eq!(Stokes::from_code(code).unwrap().code(), code);
        }
        assert!(Stokes::from_code(0).is_err());
        assert!(Stokes::from_code(5).is_err());
        assert_eq!(Stokes::XY.feeds(), Some((Feed::A, Feed::B)));
        assert_eq!(Stokes::LR.feeds(), Some((Feed::B, Feed::A)));
        assert_eq!(Stokes::I.feeds(), None);
        assert_eq!(format!("{}", Stokes::YX), "YX");
    }

    #[test]
    fn test_frequencies() {
        let mut setup = FrequencySetup::new(50e6, 24e3, 4);
        assert_eq!(
            setup.frequencies_hz(),
            array![50e6, 50.024e6, 50.048e6, 50.072e6]
        );
        setup.ref_pixel = 1.0;
        assert_abs_diff_eq!(setup.frequencies_hz()[1], 50e6, epsilon = 1e-6);
        assert_abs_diff_eq!(setup.frequencies_hz()[0], 50e6 - 24e3, epsilon = 1e-6);
    }

    #[test]
    fn test_column_from_str() {
        assert_eq!("uu".parse::<Column>().unwrap(), Column::UU);
        assert_eq!("FLUX".parse::<Column>().unwrap(), Column::FLUX);
        assert!("WEIGHT".parse::<Column>().is_err());
    }

    #[test]
    fn test_complex_view_layout() {
        // one row, 2 chans, 2 stokes
        let flux = FluxBuffer::F32(array![[1., 2., 3., 4., 5., 6., 7., 8.]]);
        let complex = flux.to_complex(2).unwrap();
        assert_eq!(complex.dim(), (1, 2, 2));
        assert_eq!(complex[(0, 0, 1)], Complex::new(3., 4.));
        assert_eq!(complex[(0, 1, 0)], Complex::new(5., 6.));
        assert_eq!(FluxBuffer::from_complex(&complex), flux);
    }

    #[test]
    fn test_complex_view_errors() {
        let flux = FluxBuffer::F64(array![[1., 2.]]);
        assert!(matches!(
            flux.to_complex(1),
            Err(UvConvError::InvalidFluxType { .. })
        ));
        let flux = FluxBuffer::F32(array![[1., 2., 3.]]);
        assert!(matches!(
            flux.to_complex(1),
            Err(UvConvError::BadArrayShape { .. })
        ));
        let mut flux = FluxBuffer::F32(array![[1., 2., 3., 4.]]);
        let wrong = Array3::zeros((2, 2, 1));
        assert!(matches!(
            flux.assign_complex(&wrong),
            Err(UvConvError::BadArrayShape { .. })
        ));
    }

    #[test]
    fn test_assign_complex() {
        let mut flux = FluxBuffer::F32(Array2::zeros((2, 4)));
        let mut complex = Array3::zeros((2, 1, 2));
        complex[(1, 0, 1)] = Complex::new(-1.5, 2.5);
        flux.assign_complex(&complex).unwrap();
        assert_eq!(flux, FluxBuffer::F32(array![[0., 0., 0., 0.], [0., 0., -1.5, 2.5]]));
    }

    #[test]
    fn test_store_shape() {
        let store = get_test_store(3, 2, 4, true);
        store.validate().unwrap();
        assert_eq!(store.baselines_per_integration(), 6);
        assert_eq!(store.num_integrations(), 2);
        assert_eq!(store.num_rows(), 12);
        assert!(store.has_autocorrelations());
        assert_eq!(store.stokes_codes(), vec![-5, -6, -7, -8]);

        let stokes = store.stokes_array().unwrap();
        assert_eq!(stokes.dim(), (4, 12, 4));
        let complex = store.uv_data.flux.to_complex(4).unwrap();
        assert_eq!(stokes[(3, 7, 1)], complex[(7, 1, 3)]);

        let store = get_test_store(3, 2, 4, false);
        assert_eq!(store.baselines_per_integration(), 3);
        assert!(!store.has_autocorrelations());
    }

    #[test]
    fn test_validate_mismatched_columns() {
        let mut store = get_test_store(3, 2, 4, true);
        store.uv_data.inttim = Array1::zeros(3);
        assert!(matches!(
            store.validate(),
            Err(UvConvError::BadArrayShape { argument, .. }) if argument == "INTTIM"
        ));

        let mut store = get_test_store(3, 2, 4, true);
        store.frequency.num_chans = 3;
        assert!(matches!(
            store.validate(),
            Err(UvConvError::BadArrayShape { argument, .. }) if argument == "FLUX"
        ));
    }

    #[test]
    fn test_single_integration() {
        let mut store = get_test_store(3, 1, 1, true);
        assert_eq!(store.baselines_per_integration(), 6);
        store.set_integration_time(2.0);
        assert!(store.uv_data.inttim.iter().all(|&t| t == 2.0));
    }

    #[test]
    fn test_array_geometry() {
        let store = get_test_store(4, 1, 1, true);
        store.array.validate().unwrap();
        assert_eq!(
            store.array.position_of(2),
            Some(store.array.antennas[1].position)
        );
        assert_eq!(store.array.position_of(0), None);
        assert_eq!(store.array.position_of(9), None);
    }
}
