//! Preprocessing a visibility store before export
use std::{collections::HashMap, fmt::Display, time::Duration};

use derive_builder::Builder;
use log::{info, trace};

use crate::{
    averaging::{average, AveragingMode},
    config::TelescopeConfig,
    corrections::{apply_cable_delays, phase_to_source, unphase_from_source},
    selection::{extract_integrations, flag_antenna, remove_miriad_baselines, select_baselines},
    store::{BaselineSelection, VisibilityStore},
    verify::{verify, VerificationReport},
    with_increment_duration, UvConvError,
};

/// Options for preprocessing a visibility store
#[derive(Builder, Debug, Default, Clone)]
pub struct PreprocessContext {
    /// First and last (exclusive) integration to keep
    #[builder(default)]
    pub integrations: Option<(Option<usize>, Option<usize>)>,
    /// Whether to drop baselines with antennas above 255
    #[builder(default = "false")]
    pub remove_miriad_baselines: bool,
    /// Antennas to add to the FLAG table
    #[builder(default)]
    pub flag_antennas: Vec<usize>,

    /// Whether cable delay corrections are enabled
    #[builder(default = "true")]
    pub apply_cable_delays: bool,
    /// Undo the phasing to this centre first
    #[builder(default)]
    pub unphase_from: Option<String>,
    /// Phase to this centre
    #[builder(default)]
    pub phase_centre: Option<String>,
    /// Whether to regenerate UVW when phasing
    #[builder(default = "true")]
    pub generate_uvw: bool,

    /// Integrations to average together
    #[builder(default = "1")]
    pub avg_time: usize,
    /// Channels to average together
    #[builder(default = "1")]
    pub avg_freq: usize,
    /// How to average axes which aren't a multiple of the factor
    #[builder(default)]
    pub avg_mode: AveragingMode,

    /// Baselines to export
    #[builder(default)]
    pub selection: BaselineSelection,

    /// Whether to verify the store at the end
    #[builder(default = "true")]
    pub verify: bool,
    /// Whether to draw progress bars
    #[builder(default = "true")]
    pub draw_progress: bool,
}

impl PreprocessContext {
    fn averages(&self) -> bool {
        self.avg_time > 1 || self.avg_freq > 1
    }
}

impl Display for PreprocessContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some((start, stop)) = self.integrations {
            writeln!(
                f,
                "Will keep integrations {}..{}",
                start.map_or_else(String::new, |start| start.to_string()),
                stop.map_or_else(String::new, |stop| stop.to_string()),
            )?;
        }
        writeln!(
            f,
            "{} remove baselines with antennas above 255.",
            if self.remove_miriad_baselines {
                "Will"
            } else {
                "Will not"
            }
        )?;
        if !self.flag_antennas.is_empty() {
            writeln!(f, "Will flag antennas {:?}", self.flag_antennas)?;
        }
        writeln!(
            f,
            "{} apply cable delays.",
            if self.apply_cable_delays {
                "Will"
            } else {
                "Will not"
            }
        )?;
        if let Some(centre) = &self.unphase_from {
            writeln!(f, "Will unphase from {centre}")?;
        }
        match &self.phase_centre {
            Some(centre) => writeln!(
                f,
                "Will phase to {centre}, {} UVW.",
                if self.generate_uvw {
                    "regenerating"
                } else {
                    "keeping"
                }
            )?,
            None => writeln!(f, "Will not phase.")?,
        }
        if self.averages() {
            writeln!(
                f,
                "Will average {} integrations and {} channels ({} mode).",
                self.avg_time, self.avg_freq, self.avg_mode
            )?;
        } else {
            writeln!(f, "Will not average.")?;
        }
        match &self.selection {
            BaselineSelection::All => writeln!(f, "Will export all baselines.")?,
            BaselineSelection::Ids(ids) => writeln!(f, "Will export {} baselines.", ids.len())?,
        }
        writeln!(
            f,
            "{} verify.",
            if self.verify { "Will" } else { "Will not" }
        )?;
        Ok(())
    }
}

impl PreprocessContext {
    /// A one line description of the tasks preprocessing will do.
    pub fn as_comment(&self) -> String {
        [
            self.integrations.map(|_| "integration extraction".to_string()),
            if self.remove_miriad_baselines {
                Some("miriad baseline removal".to_string())
            } else {
                None
            },
            if self.flag_antennas.is_empty() {
                None
            } else {
                Some("antenna flags".to_string())
            },
            if self.apply_cable_delays {
                Some("cable delay corrections".to_string())
            } else {
                None
            },
            self.unphase_from
                .as_ref()
                .map(|centre| format!("unphasing from {centre}")),
            self.phase_centre
                .as_ref()
                .map(|centre| format!("phasing to {centre}")),
            if self.averages() {
                Some(format!(
                    "averaging {}x{} ({})",
                    self.avg_time, self.avg_freq, self.avg_mode
                ))
            } else {
                None
            },
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<String>>()
        .join(", ")
    }

    /// Preprocess a visibility store in place.
    ///
    /// Steps run in order: integration extraction, miriad baseline removal, antenna flags,
    /// cable delays, unphasing, phasing, averaging, baseline selection, verification. The
    /// time spent on each is added to `durations`.
    ///
    /// Returns the verification report, if verification is enabled.
    ///
    /// # Errors
    /// will wrap errors from `extract_integrations`, `remove_miriad_baselines`,
    /// `flag_antenna`, `apply_cable_delays`, `unphase_from_source`, `phase_to_source`,
    /// `average`, `select_baselines`, `verify`
    pub fn preprocess(
        &self,
        store: &mut VisibilityStore,
        config: &TelescopeConfig,
        durations: &mut HashMap<String, Duration>,
    ) -> Result<Option<VerificationReport>, UvConvError> {
        if let Some((start, stop)) = self.integrations {
            trace!("extracting integrations");
            with_increment_duration!(durations, "select", {
                extract_integrations(store, start, stop)?;
            });
        }
        if self.remove_miriad_baselines {
            trace!("removing miriad baselines");
            with_increment_duration!(durations, "select", {
                remove_miriad_baselines(store)?;
            });
        }
        for &antenna_id in &self.flag_antennas {
            flag_antenna(store, antenna_id, None, 0)?;
        }

        if self.apply_cable_delays {
            trace!("applying cable delays");
            with_increment_duration!(durations, "correct_cable", {
                apply_cable_delays(store, config, self.draw_progress)?;
            });
        }
        if let Some(centre) = &self.unphase_from {
            trace!("unphasing");
            with_increment_duration!(durations, "correct_geom", {
                unphase_from_source(store, config, centre, self.generate_uvw, self.draw_progress)?;
            });
        }
        if let Some(centre) = &self.phase_centre {
            trace!("phasing");
            with_increment_duration!(durations, "correct_geom", {
                phase_to_source(store, config, centre, self.generate_uvw, self.draw_progress)?;
            });
        }

        if self.averages() {
            trace!("averaging");
            with_increment_duration!(durations, "average", {
                average(
                    store,
                    self.avg_time.max(1),
                    self.avg_freq.max(1),
                    self.avg_mode,
                    self.draw_progress,
                )?;
            });
        }

        select_baselines(store, self.selection.clone())?;

        if self.verify {
            trace!("verifying");
            let report = with_increment_duration!(durations, "verify", { verify(store)? });
            info!("Verified {report}");
            return Ok(Some(report));
        }
        Ok(None)
    }
}
