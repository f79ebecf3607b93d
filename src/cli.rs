//! Command Line Interface helpers for uvconv

use std::{
    collections::HashMap,
    convert::Into,
    ffi::OsString,
    fmt::{Debug, Display},
    time::Duration,
};

use clap::{arg, command, ErrorKind::ArgumentNotFound, PossibleValue, ValueHint::FilePath};
use log::{debug, info, trace, warn};
use prettytable::{format as prettyformat, row, table};

use crate::{
    averaging::AveragingMode,
    config::{Telescope, TelescopeConfig},
    error::{CLIError::InvalidCommandLineArgument, UvConvError, UvConvError::DryRun},
    io::IOContext,
    pos::sidereal_time,
    selection::select_antenna,
    store::{BaselineSelection, VisibilityStore},
    util::fmt_elided,
    with_increment_duration, PreprocessContext,
};

/// Args for converting a visibility file.
pub struct UvConvContext {
    /// The visibilities, as read
    pub store: VisibilityStore,
    /// The telescope the visibilities came from
    pub config: TelescopeConfig,
    /// Preprocessing parameters
    pub prep_ctx: PreprocessContext,
    /// Input / output paths
    pub io_ctx: IOContext,
}

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

/// Write many lines of how this executable was compiled.
///
/// # Errors
///
/// propagates writeln! fails
pub fn fmt_build_info(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let dirty = match GIT_DIRTY {
        Some(true) => " (dirty)",
        _ => "",
    };
    match GIT_COMMIT_HASH {
        Some(hash) => writeln!(f, "Compiled on git commit hash: {hash}{dirty}")?,
        None => writeln!(f, "Compiled on git commit hash: <no git info>")?,
    }
    if let Some(hr) = GIT_HEAD_REF {
        writeln!(f, "            git head ref: {hr}")?;
    }
    writeln!(f, "            {BUILT_TIME_UTC}")?;
    writeln!(f, "         with compiler {RUSTC_VERSION}")?;
    writeln!(f)?;
    Ok(())
}

impl Display for UvConvContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} version {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
        )?;

        fmt_build_info(f)?;

        let store = &self.store;
        writeln!(f, "Input:                {}", self.io_ctx.vis_in.display())?;
        writeln!(f, "Telescope:            {}", store.telescope)?;
        writeln!(f, "Array:                {}", store.array.name)?;
        writeln!(f, "Site:                 {}", self.config.site)?;
        let (y, mo, d, h, mi, s, _) = store.date_obs.to_gregorian_utc();
        writeln!(
            f,
            "Observation start:    {y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02} UTC, jd={:.6}",
            store.date_obs.to_jde_utc_days()
        )?;
        let current = &store.phase.current;
        if current.name.is_empty() {
            writeln!(f, "Phase centre:         <none>")?;
        } else {
            writeln!(
                f,
                "Phase centre:         {} (ra={:.4}°, dec={:.4}°)",
                current.name, current.ra_deg, current.dec_deg
            )?;
        }
        if let Some(cable_delays) = &store.cable_delays {
            writeln!(
                f,
                "Cable delays applied: generated {}",
                cable_delays.date_generated
            )?;
        }

        let num_ints = store.num_integrations();
        let avg_int_time_s = store.int_time_s * self.prep_ctx.avg_time as f64;
        writeln!(
            f,
            "Input duration:       {:.3}s = {:3} * {:.3}s",
            num_ints as f64 * store.int_time_s,
            num_ints,
            store.int_time_s
        )?;
        writeln!(
            f,
            "Output resolution:    {:.3}s{}",
            avg_int_time_s,
            if self.prep_ctx.avg_time == 1 {
                "".into()
            } else {
                format!(" ({}x)", self.prep_ctx.avg_time)
            }
        )?;
        let chan_width_khz = store.frequency.chan_width_hz / 1e3;
        writeln!(
            f,
            "Input bandwidth:      {:.3}MHz = {:6} * {:.3}kHz",
            store.num_chans() as f64 * chan_width_khz / 1e3,
            store.num_chans(),
            chan_width_khz
        )?;
        writeln!(
            f,
            "Output resolution:    {:.3}kHz{}",
            chan_width_khz * self.prep_ctx.avg_freq as f64,
            if self.prep_ctx.avg_freq == 1 {
                "".into()
            } else {
                format!(" ({}x)", self.prep_ctx.avg_freq)
            }
        )?;
        writeln!(
            f,
            "Stokes:               {}",
            fmt_elided(&store.stokes_codes(), 8)
        )?;

        let mut int_table = table!(["", "UTC", "jd", "lst [°]", "s"]);
        int_table.set_format(*prettyformat::consts::FORMAT_CLEAN);
        let (sel_start, sel_stop) = self
            .prep_ctx
            .integrations
            .map_or((0, num_ints), |(start, stop)| {
                (start.unwrap_or(0), stop.unwrap_or(num_ints))
            });
        let block = store.baselines_per_integration();
        for int_idx in 0..num_ints {
            let epoch = store.uv_data.row_epoch(int_idx * block);
            let (_, _, _, h, mi, s, ns) = epoch.to_gregorian_utc();
            int_table.add_row(row![r =>
                format!("int{int_idx}:"),
                format!("{h:02}:{mi:02}:{s:02}.{:03}", ns / 1_000_000),
                format!("{:.6}", epoch.to_jde_utc_days()),
                format!("{:8.4}", sidereal_time(epoch, self.config.site.longitude_rad)),
                if (sel_start..sel_stop).contains(&int_idx) { "s" } else { "" }
            ]);
        }
        writeln!(
            f,
            "Integration details (all={num_ints}, select={}):\n{}",
            sel_stop.saturating_sub(sel_start),
            int_table
        )?;

        let mut ant_table = table!(["", "name", "x [m]", "y [m]", "z [m]", "f"]);
        ant_table.set_format(*prettyformat::consts::FORMAT_CLEAN);
        let flagged: Vec<usize> = store
            .flags
            .iter()
            .map(|flag| flag.antenna_id)
            .chain(self.prep_ctx.flag_antennas.iter().copied())
            .collect();
        for antenna in &store.array.antennas {
            ant_table.add_row(row![r =>
                format!("ant{}:", antenna.id),
                antenna.name,
                format!("{:.3}", antenna.position.x),
                format!("{:.3}", antenna.position.y),
                format!("{:.3}", antenna.position.z),
                if flagged.contains(&antenna.id) { "f" } else { "" }
            ]);
        }
        writeln!(
            f,
            "Antenna details (all={}, flag={}):\n{}",
            store.num_antennas(),
            flagged.len(),
            ant_table
        )?;

        writeln!(f, "Preprocessing Context: \n{}", &self.prep_ctx)?;

        Ok(())
    }
}

impl UvConvContext {
    fn get_matches<I, T>(args: I) -> Result<clap::ArgMatches, UvConvError>
    where
        I: IntoIterator<Item = T> + Debug,
        T: Into<OsString> + Clone,
    {
        let app = command!()
            .arg_required_else_help(true)
            .next_line_help(false)
            .about("Convert, phase and average LEDA radio interferometer visibilities.")
            .args(&[
                // input options
                arg!(vis_in: <PATH> "Visibility file to read, .json store or .bin/.dat matrix")
                    .value_hint(FilePath)
                    .help_heading("INPUT")
                    .required(true),
                arg!(--"matrix-header" <PATH> "JSON header describing a matrix input")
                    .value_hint(FilePath)
                    .help_heading("INPUT")
                    .required(false),
                arg!(-c --config <PATH> "JSON telescope configuration (site, cable delays, sources)")
                    .value_hint(FilePath)
                    .help_heading("INPUT")
                    .required(false),
                arg!(-t --telescope <NAME> "Use the built-in site for this telescope")
                    .help_heading("INPUT")
                    .required(false)
                    .conflicts_with("config"),
                arg!(--"int-time" <SECONDS> "Override the integration time of every row")
                    .help_heading("INPUT")
                    .required(false),

                // processing options
                arg!(--"dry-run" "Just print the summary and exit"),
                arg!(--"no-draw-progress" "do not show progress bars"),
                arg!(--"no-verify" "Do not verify the store before writing"),

                // selection options
                arg!(--"sel-ints" "Integration index range (start inclusive, stop exclusive) to select")
                    .help_heading("SELECTION")
                    .value_names(&["START", "STOP"])
                    .required(false),
                arg!(--"sel-baselines" <IDS>... "Baseline ids to export")
                    .help_heading("SELECTION")
                    .multiple_values(true)
                    .required(false),
                arg!(--"sel-antenna" <ANT> "Export only baselines with this antenna")
                    .help_heading("SELECTION")
                    .required(false)
                    .conflicts_with("sel-baselines"),
                arg!(--"remove-miriad" "Drop baselines with antennas above 255")
                    .help_heading("SELECTION"),

                // flagging options
                arg!(--"flag-antennas" <ANTS>... "Add antenna ids to the FLAG table")
                    .help_heading("FLAGGING")
                    .multiple_values(true)
                    .required(false),

                // corrections
                arg!(--"no-cable-delay" "Do not perform cable length corrections")
                    .help_heading("CORRECTION"),
                arg!(--"unphase-from" <SOURCE> "Undo phasing to this centre first")
                    .help_heading("CORRECTION")
                    .required(false),
                arg!(-p --"phase-centre" <SOURCE> "Phase to this centre, a source name or ZEN")
                    .help_heading("CORRECTION")
                    .required(false),
                arg!(--"no-uvw" "Do not regenerate UVW when phasing")
                    .help_heading("CORRECTION"),

                // averaging
                arg!(--"avg-time-res" <SECONDS> "Time resolution of averaged data")
                    .help_heading("AVERAGING")
                    .required(false),
                arg!(--"avg-time-factor" <FACTOR> "Average <FACTOR> integrations per averaged integration")
                    .help_heading("AVERAGING")
                    .required(false)
                    .conflicts_with("avg-time-res"),
                arg!(--"avg-freq-res" <KHZ> "Frequency resolution of averaged data")
                    .help_heading("AVERAGING")
                    .required(false),
                arg!(--"avg-freq-factor" <FACTOR> "Average <FACTOR> channels per averaged channel")
                    .help_heading("AVERAGING")
                    .required(false)
                    .conflicts_with("avg-freq-res"),
                arg!(--"avg-mode" <MODE> "What to do when an axis isn't a multiple of the factor")
                    .help_heading("AVERAGING")
                    .required(false)
                    .possible_values([
                        PossibleValue::new("exact").help("Fail"),
                        PossibleValue::new("nearest").help("Drop the remainder"),
                    ])
                    .default_value("exact"),

                // output options
                arg!(-o --"json-out" <PATH> "Path for JSON store output")
                    .help_heading("OUTPUT")
                    .required(false),
                arg!(--"uvw-out" <PATH> "Path for JSON UVW output")
                    .help_heading("OUTPUT")
                    .required(false),
            ]);
        let matches = app.try_get_matches_from(args)?;
        Ok(matches)
    }

    fn parse_io_matches(matches: &clap::ArgMatches) -> Result<IOContext, UvConvError> {
        Ok(IOContext {
            vis_in: match matches.value_of("vis_in") {
                Some(path) => path.into(),
                None => unreachable!("<PATH> is required, enforced by clap"),
            },
            matrix_header_in: matches.value_of("matrix-header").map(Into::into),
            config_in: matches.value_of("config").map(Into::into),
            telescope: matches
                .value_of("telescope")
                .map(str::parse::<Telescope>)
                .transpose()?,
            json_out: matches.value_of("json-out").map(Into::into),
            uvw_out: matches.value_of("uvw-out").map(Into::into),
        })
    }

    fn parse_factor(
        matches: &clap::ArgMatches,
        factor_name: &str,
        res_name: &str,
        res_unit: &str,
        native_res: f64,
    ) -> Result<usize, UvConvError> {
        match (
            matches.value_of_t::<usize>(factor_name),
            matches.value_of_t::<f64>(res_name),
        ) {
            // filter any errors other than ArgumentNotFound
            (Err(err), _) if err.kind() != ArgumentNotFound => Err(err.into()),
            (_, Err(err)) if err.kind() != ArgumentNotFound => Err(err.into()),
            (Ok(_), Ok(_)) => {
                unreachable!("--{res_name} conflicts with --{factor_name}, enforced by clap")
            }
            (Ok(factor), _) => {
                if factor == 0 {
                    return Err(UvConvError::CLIError(InvalidCommandLineArgument {
                        option: format!("--{factor_name} <FACTOR>"),
                        expected: "a positive, non-zero integer".into(),
                        received: format!("{factor}"),
                    }));
                }
                Ok(factor)
            }
            (_, Ok(res)) => {
                let ratio = res / native_res;
                if ratio.is_infinite() || ratio.fract() > 1e-6 || ratio < 1.0 {
                    return Err(UvConvError::CLIError(InvalidCommandLineArgument {
                        option: format!("--{res_name} <RES>"),
                        expected: format!("a multiple of {native_res} [{res_unit}]"),
                        received: format!("{res}"),
                    }));
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let factor = ratio.round() as usize;
                Ok(factor)
            }
            _ => Ok(1),
        }
    }

    fn parse_avg_matches(
        matches: &clap::ArgMatches,
        store: &VisibilityStore,
    ) -> Result<(usize, usize, AveragingMode), UvConvError> {
        let avg_time = Self::parse_factor(
            matches,
            "avg-time-factor",
            "avg-time-res",
            "s",
            store.int_time_s,
        )?;
        let avg_freq = Self::parse_factor(
            matches,
            "avg-freq-factor",
            "avg-freq-res",
            "kHz",
            store.frequency.chan_width_hz / 1e3,
        )?;
        let avg_mode = match matches.value_of("avg-mode") {
            Some(mode) => mode.parse()?,
            None => AveragingMode::default(),
        };
        Ok((avg_time, avg_freq, avg_mode))
    }

    fn parse_sel_matches(
        matches: &clap::ArgMatches,
        store: &mut VisibilityStore,
    ) -> Result<(Option<(Option<usize>, Option<usize>)>, BaselineSelection), UvConvError> {
        let integrations = match matches
            .values_of_t::<usize>("sel-ints")
            .map(|v| (v[0], v[1]))
        {
            Ok((start, stop)) => {
                let num_ints = store.num_integrations();
                if start >= stop || stop > num_ints {
                    return Err(UvConvError::CLIError(InvalidCommandLineArgument {
                        option: "--sel-ints <START> <STOP>".into(),
                        expected: format!("start < stop <= num_integrations={num_ints}"),
                        received: format!("start={start} stop={stop}"),
                    }));
                }
                Some((Some(start), Some(stop)))
            }
            Err(err) => match err.kind() {
                ArgumentNotFound { .. } => None,
                _ => return Err(err.into()),
            },
        };

        let selection = match (
            matches.values_of_t::<usize>("sel-baselines"),
            matches.value_of_t::<usize>("sel-antenna"),
        ) {
            (Err(err), _) if err.kind() != ArgumentNotFound => return Err(err.into()),
            (_, Err(err)) if err.kind() != ArgumentNotFound => return Err(err.into()),
            (Ok(_), Ok(_)) => {
                unreachable!("--sel-antenna conflicts with --sel-baselines, enforced by clap")
            }
            (Ok(ids), _) => BaselineSelection::Ids(ids),
            (_, Ok(antenna_id)) => {
                select_antenna(store, antenna_id)?;
                store.selection.clone()
            }
            _ => BaselineSelection::All,
        };
        Ok((integrations, selection))
    }

    fn parse_prep_matches(
        matches: &clap::ArgMatches,
        store: &mut VisibilityStore,
        config: &TelescopeConfig,
    ) -> Result<PreprocessContext, UvConvError> {
        let (integrations, selection) = Self::parse_sel_matches(matches, store)?;
        let (avg_time, avg_freq, avg_mode) = Self::parse_avg_matches(matches, store)?;
        let flag_antennas = match matches.values_of_t::<usize>("flag-antennas") {
            Ok(ants) => ants,
            Err(err) if err.kind() == ArgumentNotFound => vec![],
            Err(err) => return Err(err.into()),
        };
        let apply_cable_delays = {
            let no_cable_delays = matches.is_present("no-cable-delay");
            let cable_delays_applied = store.cable_delays.is_some();
            let calibration_available = config.cable_delays.is_some();
            debug!(
                "cable corrections: applied={cable_delays_applied}, available={calibration_available}, desired={}",
                !no_cable_delays
            );
            if !no_cable_delays && !cable_delays_applied && !calibration_available {
                warn!(
                    "No cable delay calibration for {}, cable delays will not be applied",
                    config.name
                );
            }
            !no_cable_delays && !cable_delays_applied && calibration_available
        };
        Ok(PreprocessContext {
            integrations,
            remove_miriad_baselines: matches.is_present("remove-miriad"),
            flag_antennas,
            apply_cable_delays,
            unphase_from: matches.value_of("unphase-from").map(Into::into),
            phase_centre: matches.value_of("phase-centre").map(Into::into),
            generate_uvw: !matches.is_present("no-uvw"),
            avg_time,
            avg_freq,
            avg_mode,
            selection,
            verify: !matches.is_present("no-verify"),
            draw_progress: !matches.is_present("no-draw-progress"),
        })
    }

    /// Parse an iterator of arguments, `args` into a `UvConvContext`.
    ///
    /// The visibility input is read here, so that arguments can be checked against it.
    ///
    /// # Errors
    ///
    /// Can raise:
    /// - `clap::Error` if clap cannot parse `args`
    /// - [`UvConvError::IOError`] if the input can't be read
    /// - [`UvConvError::CLIError`] if the arguments are invalid.
    /// - [`UvConvError::DryRun`] if `--dry-run` was given
    pub fn from_args<I, T>(args: I) -> Result<Self, UvConvError>
    where
        I: IntoIterator<Item = T> + Debug,
        T: Into<OsString> + Clone,
    {
        debug!("args:\n{:?}", &args);

        let matches = Self::get_matches(args)?;
        trace!("arg matches:\n{:?}", &matches);

        let io_ctx = Self::parse_io_matches(&matches)?;
        let (mut store, config) = io_ctx.read_input()?;
        match matches.value_of_t::<f64>("int-time") {
            Ok(int_time_s) => {
                info!("Overriding integration time with {int_time_s}s");
                store.set_integration_time(int_time_s);
            }
            Err(err) if err.kind() != ArgumentNotFound => return Err(err.into()),
            Err(_) => {}
        }
        let prep_ctx = Self::parse_prep_matches(&matches, &mut store, &config)?;

        let result = Self {
            store,
            config,
            prep_ctx,
            io_ctx,
        };

        info!("{}", &result);

        if matches.is_present("dry-run") {
            return Err(DryRun {});
        }

        Ok(result)
    }

    /// Preprocess and write the visibilities.
    ///
    /// # Errors
    ///
    /// can raise:
    /// - preprocessing errors, see [`PreprocessContext::preprocess`]
    /// - [`UvConvError::IOError`] if an output can't be written
    pub fn run(self) -> Result<HashMap<String, Duration>, UvConvError> {
        let Self {
            mut store,
            config,
            prep_ctx,
            io_ctx,
        } = self;

        // used to time large operations
        let mut durations = HashMap::<String, Duration>::new();

        if let Some(report) = prep_ctx.preprocess(&mut store, &config, &mut durations)? {
            info!("Verification: {report}");
        }
        if io_ctx.json_out.is_none() && io_ctx.uvw_out.is_none() {
            warn!("No outputs requested, nothing will be written");
        }
        with_increment_duration!(durations, "write", { io_ctx.write_outputs(&store)? });

        Ok(durations)
    }
}

/// Parse `args`, run, and report. Returns the process exit code.
pub fn main_with_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T> + Debug,
    T: Into<OsString> + Clone,
{
    let uvconv_ctx = match UvConvContext::from_args(args) {
        Ok(uvconv_ctx) => uvconv_ctx,
        Err(DryRun {}) => {
            info!("Dry run. No files will be written.");
            return 0;
        }
        Err(UvConvError::ClapError(inner)) => {
            // Swallow broken pipe errors
            trace!("clap error: {:?}", inner.kind());
            let _ = inner.print();
            match inner.kind() {
                clap::ErrorKind::DisplayHelp | clap::ErrorKind::DisplayVersion => return 0,
                _ => return 1,
            }
        }
        Err(e) => {
            eprintln!("error parsing args: {e}");
            return 1;
        }
    };

    match uvconv_ctx.run() {
        Ok(durations) => {
            info!(
                "total duration: {:?}",
                durations
                    .into_iter()
                    .fold(Duration::ZERO, |duration_sum, (name, duration)| {
                        info!("{} duration: {:?}", name, duration);
                        duration_sum + duration
                    })
            );
            0
        }
        Err(e) => {
            eprintln!("preprocessing error: {e}");
            1
        }
    }
}

#[cfg(test)]
mod argparse_tests {
    use super::*;
    use crate::{
        io::write_store,
        test_common::{get_test_config, get_test_store},
    };
    use tempfile::{tempdir, TempDir};

    fn write_test_input(num_ints: usize) -> (TempDir, String) {
        let tmp_dir = tempdir().unwrap();
        let vis_in = tmp_dir.path().join("vis.json");
        write_store(&get_test_store(4, num_ints, 4, true), &vis_in).unwrap();
        let vis_in = vis_in.to_str().unwrap().to_string();
        (tmp_dir, vis_in)
    }

    #[test]
    fn test_parse_missing_input() {
        match UvConvContext::from_args(["uvconv", "--no-verify"]) {
            Err(UvConvError::ClapError(inner)) => assert!(matches!(
                inner.kind(),
                clap::error::ErrorKind::MissingRequiredArgument { .. }
            )),
            Err(e) => panic!("expected missing required argument error, not {e}"),
            Ok(_) => panic!("expected error, but got Ok(_)"),
        }
    }

    #[test]
    fn test_parse_invalid_input() {
        assert!(matches!(
            UvConvContext::from_args(["uvconv", "nonexistent.json"]),
            Err(UvConvError::IOError(_))
        ));
        assert!(matches!(
            UvConvContext::from_args(["uvconv", "vis.uvfits"]),
            Err(UvConvError::IOError(_))
        ));
    }

    #[test]
    fn test_parse_defaults() {
        let (_tmp_dir, vis_in) = write_test_input(2);
        let ctx = UvConvContext::from_args(["uvconv", &vis_in]).unwrap();
        assert_eq!(ctx.config.name, "LWA-OVRO");
        // the built-in site has no cable delay table
        assert!(!ctx.prep_ctx.apply_cable_delays);
        assert_eq!(ctx.prep_ctx.avg_time, 1);
        assert_eq!(ctx.prep_ctx.avg_freq, 1);
        assert_eq!(ctx.prep_ctx.integrations, None);
        assert_eq!(ctx.prep_ctx.selection, BaselineSelection::All);
        assert!(ctx.prep_ctx.verify);
        assert!(ctx.io_ctx.json_out.is_none());

        let display = format!("{ctx}");
        assert!(display.contains("Telescope:            LWA-OVRO"));
        assert!(display.contains("Will not apply cable delays."));
    }

    #[test]
    fn test_parse_cable_delays_from_config() {
        let (tmp_dir, vis_in) = write_test_input(2);
        let config_path = tmp_dir.path().join("config.json");
        get_test_config(4).to_json_file(&config_path).unwrap();

        let ctx = UvConvContext::from_args([
            "uvconv",
            &vis_in,
            "-c",
            config_path.to_str().unwrap(),
        ])
        .unwrap();
        assert!(ctx.prep_ctx.apply_cable_delays);

        let ctx = UvConvContext::from_args([
            "uvconv",
            &vis_in,
            "-c",
            config_path.to_str().unwrap(),
            "--no-cable-delay",
        ])
        .unwrap();
        assert!(!ctx.prep_ctx.apply_cable_delays);
    }

    #[test]
    fn test_parse_invalid_int_selection() {
        let (_tmp_dir, vis_in) = write_test_input(2);
        for (start, stop) in [("1", "1"), ("0", "3")] {
            assert!(matches!(
                UvConvContext::from_args(["uvconv", &vis_in, "--sel-ints", start, stop]),
                Err(UvConvError::CLIError(InvalidCommandLineArgument { .. }))
            ));
        }
    }

    #[test]
    fn test_parse_valid_int_selection() {
        let (_tmp_dir, vis_in) = write_test_input(3);
        let ctx = UvConvContext::from_args(["uvconv", &vis_in, "--sel-ints", "1", "3"]).unwrap();
        assert_eq!(ctx.prep_ctx.integrations, Some((Some(1), Some(3))));
    }

    #[test]
    fn test_parse_baseline_selection() {
        let (_tmp_dir, vis_in) = write_test_input(1);
        let ctx =
            UvConvContext::from_args(["uvconv", &vis_in, "--sel-baselines", "258", "259"])
                .unwrap();
        assert_eq!(ctx.prep_ctx.selection, BaselineSelection::Ids(vec![258, 259]));

        let ctx = UvConvContext::from_args(["uvconv", &vis_in, "--sel-antenna", "4"]).unwrap();
        assert_eq!(
            ctx.prep_ctx.selection,
            BaselineSelection::Ids(vec![260, 516, 772, 1028])
        );

        assert!(matches!(
            UvConvContext::from_args(["uvconv", &vis_in, "--sel-antenna", "9"]),
            Err(UvConvError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_parse_invalid_avg_time() {
        let (_tmp_dir, vis_in) = write_test_input(2);
        for args in [
            ["--avg-time-factor", "0"],
            ["--avg-time-res", "0.5"],
            ["--avg-time-res", "12"],
        ] {
            assert!(matches!(
                UvConvContext::from_args(["uvconv", &vis_in, args[0], args[1]]),
                Err(UvConvError::CLIError(InvalidCommandLineArgument { .. }))
            ));
        }
        assert!(matches!(
            UvConvContext::from_args([
                "uvconv",
                &vis_in,
                "--avg-time-factor",
                "2",
                "--avg-time-res",
                "16"
            ]),
            Err(UvConvError::ClapError(_))
        ));
    }

    #[test]
    fn test_parse_valid_avg() {
        let (_tmp_dir, vis_in) = write_test_input(2);
        let ctx = UvConvContext::from_args([
            "uvconv",
            &vis_in,
            "--avg-time-res",
            "16",
            "--avg-freq-factor",
            "2",
            "--avg-mode",
            "nearest",
        ])
        .unwrap();
        assert_eq!(ctx.prep_ctx.avg_time, 2);
        assert_eq!(ctx.prep_ctx.avg_freq, 2);
        assert_eq!(ctx.prep_ctx.avg_mode, AveragingMode::Nearest);

        let ctx =
            UvConvContext::from_args(["uvconv", &vis_in, "--avg-freq-res", "96"]).unwrap();
        assert_eq!(ctx.prep_ctx.avg_freq, 4);
    }

    #[test]
    fn test_parse_corrections() {
        let (_tmp_dir, vis_in) = write_test_input(1);
        let ctx = UvConvContext::from_args([
            "uvconv",
            &vis_in,
            "-p",
            "CYG",
            "--no-uvw",
            "--flag-antennas",
            "2",
            "3",
            "--remove-miriad",
            "--no-draw-progress",
        ])
        .unwrap();
        assert_eq!(ctx.prep_ctx.phase_centre, Some("CYG".into()));
        assert!(!ctx.prep_ctx.generate_uvw);
        assert_eq!(ctx.prep_ctx.flag_antennas, vec![2, 3]);
        assert!(ctx.prep_ctx.remove_miriad_baselines);
        assert!(!ctx.prep_ctx.draw_progress);
    }

    #[test]
    fn test_parse_int_time_override() {
        let (_tmp_dir, vis_in) = write_test_input(1);
        let ctx = UvConvContext::from_args(["uvconv", &vis_in, "--int-time", "4.5"]).unwrap();
        assert!((ctx.store.int_time_s - 4.5).abs() < f64::EPSILON);
        assert!(ctx
            .store
            .uv_data
            .inttim
            .iter()
            .all(|&t| (t - 4.5).abs() < f64::EPSILON));
    }

    #[test]
    fn test_dry_run() {
        let (_tmp_dir, vis_in) = write_test_input(1);
        assert!(matches!(
            UvConvContext::from_args(["uvconv", &vis_in, "--dry-run"]),
            Err(DryRun {})
        ));
    }

    #[test]
    fn test_main_with_args() {
        assert_eq!(main_with_args(["uvconv", "--version"]), 0);
        assert_eq!(main_with_args(["uvconv", "--help"]), 0);
        let (tmp_dir, vis_in) = write_test_input(2);
        assert_eq!(main_with_args(["uvconv", &vis_in, "--dry-run"]), 0);
        assert_ne!(
            main_with_args(["uvconv", &vis_in, "--avg-time-factor", "0"]),
            0
        );
        assert_ne!(
            main_with_args(["uvconv", &vis_in, "--avg-time-factor", "3"]),
            0
        );
        let json_out = tmp_dir.path().join("out.json");
        assert_eq!(
            main_with_args([
                "uvconv",
                &vis_in,
                "--no-draw-progress",
                "-o",
                json_out.to_str().unwrap()
            ]),
            0
        );
        assert!(json_out.exists());
    }
}
