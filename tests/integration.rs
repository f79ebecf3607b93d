use std::{fs::File, io::BufReader, path::Path};

use approx::assert_abs_diff_eq;
use byteorder::{ByteOrder, LittleEndian};
use tempfile::tempdir;
use uvconv::{
    cli::main_with_args,
    config::{Telescope, TelescopeConfig},
    io::{read_matrix, read_store, write_store, MatrixHeader},
    pos::XyzGeodetic,
    BaselineSelection,
};

const NUM_ANTS: usize = 3;
const NUM_CHANS: usize = 4;
const NUM_INTS: usize = 2;

fn get_matrix_header() -> MatrixHeader {
    MatrixHeader {
        telescope: "LWA-OVRO".into(),
        array_name: "LEDA-512".into(),
        num_ants: NUM_ANTS,
        num_chans: NUM_CHANS,
        utc_start: "2013-05-01T06:00:00".into(),
        int_time_s: 8.0,
        centre_freq_hz: 50e6,
        chan_width_hz: 24e3,
        antenna_positions: vec![
            XyzGeodetic {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            XyzGeodetic {
                x: 12.0,
                y: -4.0,
                z: 0.5,
            },
            XyzGeodetic {
                x: -7.0,
                y: 21.0,
                z: 1.0,
            },
        ],
    }
}

/// A little-endian complex64 matrix with a different value in every cell.
fn get_matrix_buffer() -> Vec<u8> {
    let num_values = NUM_INTS * NUM_ANTS * NUM_ANTS * NUM_CHANS * 4 * 2;
    let values: Vec<f32> = (0..num_values)
        .map(|idx| 1.0 + (idx % 97) as f32 * 0.125)
        .collect();
    let mut buffer = vec![0_u8; num_values * 4];
    LittleEndian::write_f32_into(&values, &mut buffer);
    buffer
}

/// Write a matrix and its header, returning their paths.
fn write_matrix_input(dir: &Path) -> (String, String) {
    let vis_path = dir.join("vis.dat");
    let header_path = dir.join("vis.header.json");
    std::fs::write(&vis_path, get_matrix_buffer()).unwrap();
    serde_json::to_writer(File::create(&header_path).unwrap(), &get_matrix_header()).unwrap();
    (
        vis_path.to_str().unwrap().to_string(),
        header_path.to_str().unwrap().to_string(),
    )
}

#[test]
fn test_matrix_phased_averaged_to_json() {
    let tmp_dir = tempdir().unwrap();
    let (vis_path, header_path) = write_matrix_input(tmp_dir.path());
    let json_out = tmp_dir.path().join("out.json");

    #[rustfmt::skip]
    let args = [
        "uvconv",
        &vis_path,
        "--matrix-header", &header_path,
        "-p", "CYG",
        "--avg-freq-factor", "2",
        "--no-draw-progress",
        "-o", json_out.to_str().unwrap(),
    ];
    assert_eq!(main_with_args(args), 0);

    let store = read_store(&json_out).unwrap();
    assert_eq!(store.num_rows(), 6 * NUM_INTS);
    assert_eq!(store.num_chans(), NUM_CHANS / 2);
    assert_abs_diff_eq!(store.frequency.chan_width_hz, 48e3);
    assert_eq!(store.phase.current.name, "CYG");
    assert_eq!(store.phase.history.len(), 1);
    assert_eq!(store.phase.history[0].name, "ZEN");
    assert!(store.cable_delays.is_none());
    // autocorrelations have no baseline vector, cross-correlations do
    assert_abs_diff_eq!(store.uv_data.ww[0], 0.0);
    assert!(store.uv_data.uu[1].abs() > 0.0);
}

#[test]
fn test_json_passthrough() {
    let tmp_dir = tempdir().unwrap();
    let config = TelescopeConfig::from(Telescope::LwaOvro);
    let original = read_matrix(get_matrix_buffer(), &get_matrix_header(), &config).unwrap();
    let json_in = tmp_dir.path().join("in.json");
    write_store(&original, &json_in).unwrap();
    let json_out = tmp_dir.path().join("out.json");

    #[rustfmt::skip]
    let args = [
        "uvconv",
        json_in.to_str().unwrap(),
        "--no-cable-delay",
        "--no-draw-progress",
        "-o", json_out.to_str().unwrap(),
    ];
    assert_eq!(main_with_args(args), 0);

    let store = read_store(&json_out).unwrap();
    assert_eq!(store.uv_data.baseline, original.uv_data.baseline);
    assert_eq!(store.stokes, original.stokes);
    assert_eq!(store.array.antennas.len(), NUM_ANTS);
    assert_eq!(store.phase.current.name, original.phase.current.name);
    assert_abs_diff_eq!(
        store.phase.current.ra_deg,
        original.phase.current.ra_deg,
        epsilon = 1e-9
    );
    for (&read, &expected) in store
        .uv_data
        .flux
        .to_f64()
        .iter()
        .zip(original.uv_data.flux.to_f64().iter())
    {
        assert_abs_diff_eq!(read, expected, epsilon = 1e-6);
    }
    for (&read, &expected) in store.uv_data.ww.iter().zip(original.uv_data.ww.iter()) {
        assert_abs_diff_eq!(read, expected, epsilon = 1e-15);
    }
}

#[test]
fn test_antenna_selection_and_uvw_out() {
    let tmp_dir = tempdir().unwrap();
    let (vis_path, header_path) = write_matrix_input(tmp_dir.path());
    let json_out = tmp_dir.path().join("out.json");
    let uvw_out = tmp_dir.path().join("uvw.json");

    #[rustfmt::skip]
    let args = [
        "uvconv",
        &vis_path,
        "--matrix-header", &header_path,
        "--sel-antenna", "2",
        "--sel-ints", "1", "2",
        "--no-draw-progress",
        "-o", json_out.to_str().unwrap(),
        "--uvw-out", uvw_out.to_str().unwrap(),
    ];
    assert_eq!(main_with_args(args), 0);

    // only the selected rows are exported, and the export has no selection
    let store = read_store(&json_out).unwrap();
    assert_eq!(store.uv_data.baseline.to_vec(), vec![258, 514, 515]);
    assert_eq!(store.selection, BaselineSelection::All);

    let uvw: serde_json::Value =
        serde_json::from_reader(BufReader::new(File::open(&uvw_out).unwrap())).unwrap();
    assert_eq!(uvw["BASELINE"].as_array().unwrap().len(), 6);
    assert_eq!(uvw["WW"].as_array().unwrap().len(), 6);
}

#[test]
fn test_bad_inputs_fail() {
    let tmp_dir = tempdir().unwrap();
    let (vis_path, header_path) = write_matrix_input(tmp_dir.path());

    // a matrix without its header
    assert_ne!(main_with_args(["uvconv", &vis_path, "--no-draw-progress"]), 0);

    // a truncated matrix
    let truncated = tmp_dir.path().join("truncated.bin");
    let mut buffer = get_matrix_buffer();
    buffer.truncate(buffer.len() - 8);
    std::fs::write(&truncated, buffer).unwrap();
    assert_ne!(
        main_with_args([
            "uvconv",
            truncated.to_str().unwrap(),
            "--matrix-header",
            &header_path
        ]),
        0
    );

    // an unknown phase centre
    assert_ne!(
        main_with_args([
            "uvconv",
            &vis_path,
            "--matrix-header",
            &header_path,
            "--no-draw-progress",
            "-p",
            "NOWHERE"
        ]),
        0
    );

    // a dry run succeeds without writing
    let json_out = tmp_dir.path().join("dry.json");
    assert_eq!(
        main_with_args([
            "uvconv",
            &vis_path,
            "--matrix-header",
            &header_path,
            "--dry-run",
            "-o",
            json_out.to_str().unwrap()
        ]),
        0
    );
    assert!(!json_out.exists());
}
