//! Synthetic visibility stores shared by unit tests.
#![allow(dead_code)]

use hifitime::Epoch;
use ndarray::Array2;

use crate::{
    baseline::generate_baseline_list,
    config::{CableDelayTable, Telescope, TelescopeConfig},
    constants::{LEDA_ARRNAM, LEDA_TELESCOP},
    corrections::generate_uvw,
    pos::XyzGeodetic,
    store::{
        Antenna, ArrayGeometry, BaselineSelection, FluxBuffer, FrequencySetup, PhaseState,
        SourceEntry, Stokes, UvData, VisibilityStore,
    },
};

/// 2013-05-01 06:00:00 UTC
pub fn get_test_epoch() -> Epoch {
    Epoch::from_gregorian_utc_hms(2013, 5, 1, 6, 0, 0)
}

pub const TEST_INT_TIME_S: f64 = 8.0;
pub const TEST_REF_FREQ_HZ: f64 = 50e6;
pub const TEST_CHAN_WIDTH_HZ: f64 = 24e3;

/// A deterministic, never zero, visibility value.
pub fn test_flux_value(row: usize, chan: usize, stk: usize, imag: bool) -> f32 {
    let base = 1.0 + (row % 17) as f32 + 0.25 * chan as f32 + 0.5 * stk as f32;
    if imag {
        -0.5 * base
    } else {
        base
    }
}

/// Antenna positions in a loose spiral around the array centre \[m\].
pub fn get_test_positions(num_ants: usize) -> Vec<XyzGeodetic> {
    (0..num_ants)
        .map(|idx| {
            let r = 5.0 + 3.0 * idx as f64;
            let theta = 0.9 * idx as f64;
            XyzGeodetic {
                x: r * theta.cos(),
                y: r * theta.sin(),
                z: 0.5 * idx as f64,
            }
        })
        .collect()
}

/// A store with `num_ints` integrations of every baseline between `num_ants` antennas, each
/// with `num_chans` channels of XX, YY, XY, YX. UVW are zero.
pub fn get_test_store(
    num_ants: usize,
    num_ints: usize,
    num_chans: usize,
    autocorrelations: bool,
) -> VisibilityStore {
    let (_, ids) = generate_baseline_list(num_ants, autocorrelations).unwrap();
    let num_baselines = ids.len();
    let num_rows = num_baselines * num_ints;
    let num_stokes = 4;

    let start_jd = get_test_epoch().to_jde_utc_days();
    let date_0h = (start_jd - 0.5).floor() + 0.5;

    let mut uv_data = UvData::zeros(num_rows, num_chans * num_stokes * 2);
    for int_idx in 0..num_ints {
        for (bl_idx, &id) in ids.iter().enumerate() {
            let row = int_idx * num_baselines + bl_idx;
            uv_data.baseline[row] = id;
            uv_data.date[row] = date_0h;
            uv_data.time[row] =
                (start_jd - date_0h) + int_idx as f64 * TEST_INT_TIME_S / 86400.0;
            uv_data.source[row] = 1;
            uv_data.freqid[row] = 1;
            uv_data.inttim[row] = TEST_INT_TIME_S;
        }
    }
    uv_data.flux = FluxBuffer::F32(Array2::from_shape_fn(
        (num_rows, num_chans * num_stokes * 2),
        |(row, idx)| {
            let chan = idx / (2 * num_stokes);
            let stk = (idx / 2) % num_stokes;
            test_flux_value(row, chan, stk, idx % 2 == 1)
        },
    ));

    let site = Telescope::LwaOvro.site();
    VisibilityStore {
        uv_data,
        frequency: FrequencySetup::new(TEST_REF_FREQ_HZ, TEST_CHAN_WIDTH_HZ, num_chans),
        stokes: vec![Stokes::XX, Stokes::YY, Stokes::XY, Stokes::YX],
        array: ArrayGeometry {
            name: LEDA_ARRNAM.into(),
            array_xyz: site.to_geocentric_wgs84(),
            antennas: get_test_positions(num_ants)
                .into_iter()
                .enumerate()
                .map(|(idx, position)| Antenna {
                    name: format!("LEDA{:03}", idx + 1),
                    id: idx + 1,
                    position,
                })
                .collect(),
        },
        phase: PhaseState {
            current: SourceEntry::default(),
            history: vec![],
        },
        telescope: LEDA_TELESCOP.into(),
        date_obs: get_test_epoch(),
        int_time_s: TEST_INT_TIME_S,
        flags: vec![],
        cable_delays: None,
        selection: BaselineSelection::All,
    }
}

/// A store with autocorrelations, phased to zenith at OVRO.
pub fn get_phased_test_store(
    num_ants: usize,
    num_ints: usize,
    num_chans: usize,
) -> VisibilityStore {
    let mut store = get_test_store(num_ants, num_ints, num_chans, true);
    generate_uvw(&mut store, &Telescope::LwaOvro.into(), "ZEN", true).unwrap();
    store
}

/// The OVRO configuration, with a cable delay table for `num_ants` antennas.
pub fn get_test_config(num_ants: usize) -> TelescopeConfig {
    TelescopeConfig {
        cable_delays: Some(CableDelayTable {
            date_generated: "2013-06-01".into(),
            lengths_m: (0..num_ants)
                .map(|ant| [100.0 + 7.0 * ant as f64, 101.5 + 3.0 * ant as f64])
                .collect(),
        }),
        ..TelescopeConfig::from(Telescope::LwaOvro)
    }
}
