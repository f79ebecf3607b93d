//! Ingesting raw correlator visibility matrices.
//!
//! A matrix buffer is little-endian `complex64`, shaped
//! `(integration, ant1, ant2, channel, pol_a, pol_b)`. Only the `ant2 >= ant1` triangle is
//! read, into XX, YY, XY, YX products.

use byteorder::{ByteOrder, LittleEndian};
use hifitime::Unit;
use log::{info, trace, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{error::IOError, json::parse_date_obs};
use crate::{
    baseline::generate_baseline_list,
    config::TelescopeConfig,
    constants::{LEDA_ARRNAM, LEDA_CHAN_WIDTH_HZ, LEDA_INT_TIME_S},
    corrections::generate_uvw,
    pos::{XyzGeodetic, ZENITH},
    store::{
        Antenna, ArrayGeometry, BaselineSelection, FluxBuffer, FrequencySetup, PhaseState,
        Stokes, UvData, VisibilityStore,
    },
    UvConvError,
};

/// Bytes in one `complex64` value.
const COMPLEX64_BYTES: usize = 8;

fn default_int_time_s() -> f64 {
    LEDA_INT_TIME_S
}

fn default_chan_width_hz() -> f64 {
    LEDA_CHAN_WIDTH_HZ
}

fn default_array_name() -> String {
    LEDA_ARRNAM.into()
}

/// What a matrix buffer contains, and when and where it was observed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatrixHeader {
    /// Telescope name (TELESCOP)
    pub telescope: String,
    /// Array name (ARRNAM)
    #[serde(default = "default_array_name")]
    pub array_name: String,
    /// Number of antennas, the size of each matrix
    pub num_ants: usize,
    /// Number of channels
    pub num_chans: usize,
    /// Start of the first integration, see [`parse_date_obs`]
    pub utc_start: String,
    /// Integration time \[s\]
    #[serde(default = "default_int_time_s")]
    pub int_time_s: f64,
    /// Centre frequency of the band \[Hz\]
    pub centre_freq_hz: f64,
    /// Channel width \[Hz\]
    #[serde(default = "default_chan_width_hz")]
    pub chan_width_hz: f64,
    /// Antenna positions relative to the array centre \[m\], ordered by id
    #[serde(default)]
    pub antenna_positions: Vec<XyzGeodetic>,
}

/// Decode a matrix buffer into a store, with UVW generated towards zenith.
///
/// Each row's DATE is the Julian date at 0h of the integration and TIME the fraction of a day
/// since. SOURCE and FREQID are 1, INTTIM the header's integration time. The reference pixel is
/// the centre channel.
///
/// # Errors
///
/// - [`IOError::Inconsistent`] if the buffer isn't a whole number of integrations, or the
///   header has the wrong number of antenna positions
/// - [`IOError::BadDate`] if `utc_start` can't be parsed
/// - see [`generate_uvw`]
pub fn read_matrix(
    buffer: Vec<u8>,
    header: &MatrixHeader,
    config: &TelescopeConfig,
) -> Result<VisibilityStore, UvConvError> {
    trace!("start read_matrix");
    let (num_ants, num_chans) = (header.num_ants, header.num_chans);
    let num_stokes = 4;

    let int_values = num_ants * num_ants * num_chans * num_stokes;
    let int_bytes = int_values * COMPLEX64_BYTES;
    if int_bytes == 0 || buffer.len() % int_bytes != 0 {
        return Err(IOError::Inconsistent {
            file: "matrix buffer".into(),
            expected: format!(
                "a multiple of {int_bytes} bytes for {num_ants} antennas and {num_chans} channels"
            ),
            found: format!("{} bytes", buffer.len()),
        }
        .into());
    }
    let num_ints = buffer.len() / int_bytes;

    let positions = if header.antenna_positions.is_empty() {
        warn!("no antenna positions in the matrix header, UVW will be zero");
        vec![XyzGeodetic::default(); num_ants]
    } else if header.antenna_positions.len() == num_ants {
        header.antenna_positions.clone()
    } else {
        return Err(IOError::Inconsistent {
            file: "matrix header".into(),
            expected: format!("{num_ants} antenna positions"),
            found: format!("{}", header.antenna_positions.len()),
        }
        .into());
    };

    let mut values = vec![0.0_f32; buffer.len() / 4];
    LittleEndian::read_f32_into(&buffer, &mut values);
    drop(buffer);

    let (pairs, ids) = generate_baseline_list(num_ants, true)?;
    let num_baselines = ids.len();
    let num_rows = num_ints * num_baselines;
    info!(
        "read {num_ints} integrations of {num_ants} antennas x {num_chans} channels ({num_rows} rows)"
    );

    // (pol_a, pol_b) of XX, YY, XY, YX
    const PRODUCTS: [(usize, usize); 4] = [(0, 0), (1, 1), (0, 1), (1, 0)];
    let width = num_chans * num_stokes * 2;
    let mut flux = Array2::<f32>::zeros((num_rows, width));
    for int_idx in 0..num_ints {
        for (bl_idx, &(ant1, ant2)) in pairs.iter().enumerate() {
            let row = int_idx * num_baselines + bl_idx;
            let matrix_offset =
                ((int_idx * num_ants + (ant1 - 1)) * num_ants + (ant2 - 1)) * num_chans;
            for chan in 0..num_chans {
                for (stk, &(pol_a, pol_b)) in PRODUCTS.iter().enumerate() {
                    let value = 2 * (((matrix_offset + chan) * 2 + pol_a) * 2 + pol_b);
                    let idx = 2 * (chan * num_stokes + stk);
                    flux[(row, idx)] = values[value];
                    flux[(row, idx + 1)] = values[value + 1];
                }
            }
        }
    }

    let date_obs = parse_date_obs(&header.utc_start)?;
    let start_jd = date_obs.to_jde_utc_days();
    let mut uv_data = UvData::zeros(num_rows, width);
    uv_data.flux = FluxBuffer::F32(flux);
    for int_idx in 0..num_ints {
        let epoch = date_obs + (int_idx as f64 * header.int_time_s) * Unit::Second;
        let jd = epoch.to_jde_utc_days();
        let date_0h = (jd - 0.5).floor() + 0.5;
        for bl_idx in 0..num_baselines {
            let row = int_idx * num_baselines + bl_idx;
            uv_data.baseline[row] = ids[bl_idx];
            uv_data.date[row] = date_0h;
            uv_data.time[row] = jd - date_0h;
        }
    }
    uv_data.source.fill(1);
    uv_data.freqid.fill(1);
    uv_data.inttim.fill(header.int_time_s);
    trace!("first integration at JD {start_jd}");

    let frequency = FrequencySetup {
        ref_pixel: (num_chans / 2) as f64,
        ..FrequencySetup::new(header.centre_freq_hz, header.chan_width_hz, num_chans)
    };

    let mut store = VisibilityStore {
        uv_data,
        frequency,
        stokes: vec![Stokes::XX, Stokes::YY, Stokes::XY, Stokes::YX],
        array: ArrayGeometry {
            name: header.array_name.clone(),
            array_xyz: config.site.to_geocentric_wgs84(),
            antennas: positions
                .into_iter()
                .enumerate()
                .map(|(idx, position)| Antenna {
                    name: format!("Stand{:03}", idx + 1),
                    id: idx + 1,
                    position,
                })
                .collect(),
        },
        phase: PhaseState::default(),
        telescope: header.telescope.clone(),
        date_obs,
        int_time_s: header.int_time_s,
        flags: vec![],
        cable_delays: None,
        selection: BaselineSelection::All,
    };
    generate_uvw(&mut store, config, ZENITH, true)?;

    trace!("end read_matrix");
    Ok(store)
}

/// Encode a store's FLUX as a matrix buffer, the inverse of [`read_matrix`].
///
/// Cells of the matrix without a row (the `ant2 < ant1` triangle) are the complex conjugate of
/// their transpose.
///
/// # Errors
///
/// - [`UvConvError::InvalidFluxType`] if FLUX isn't `f32`
/// - [`UvConvError::InvalidArgument`] unless the products are XX, YY, XY, YX
/// - [`UvConvError::Domain`] if a baseline id can't be decoded
pub fn write_matrix(store: &VisibilityStore) -> Result<Vec<u8>, UvConvError> {
    if store.stokes != [Stokes::XX, Stokes::YY, Stokes::XY, Stokes::YX] {
        return Err(UvConvError::InvalidArgument {
            argument: "store.stokes".into(),
            function: "write_matrix".into(),
            reason: format!("products must be XX, YY, XY, YX, found {:?}", store.stokes),
        });
    }
    let complex = store.uv_data.flux.to_complex(4)?;
    let num_ants = store.num_antennas();
    let num_chans = store.num_chans();
    let num_baselines = store.baselines_per_integration();
    let num_ints = store.num_integrations();

    let mut values = vec![0.0_f32; num_ints * num_ants * num_ants * num_chans * 4 * 2];
    for (row, (ant1, ant2)) in store.antenna_pairs()?.into_iter().enumerate() {
        if num_baselines == 0 || row >= num_ints * num_baselines {
            break;
        }
        let int_idx = row / num_baselines;
        for chan in 0..num_chans {
            for (stk, (pol_a, pol_b)) in [(0, 0), (1, 1), (0, 1), (1, 0)].into_iter().enumerate() {
                let vis = complex[(row, chan, stk)];
                let cell = |a1: usize, a2: usize, pa: usize, pb: usize| {
                    2 * (((((int_idx * num_ants + a1 - 1) * num_ants + a2 - 1) * num_chans + chan)
                        * 2
                        + pa)
                        * 2
                        + pb)
                };
                let idx = cell(ant1, ant2, pol_a, pol_b);
                values[idx] = vis.re;
                values[idx + 1] = vis.im;
                if ant1 != ant2 {
                    let idx = cell(ant2, ant1, pol_b, pol_a);
                    values[idx] = vis.re;
                    values[idx + 1] = -vis.im;
                }
            }
        }
    }

    let mut buffer = vec![0_u8; values.len() * 4];
    LittleEndian::write_f32_into(&values, &mut buffer);
    Ok(buffer)
}
