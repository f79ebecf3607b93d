//! Per-telescope configuration: site position, cable delays and extra phase centres.
//!
//! A [`TelescopeConfig`] is resolved once, either from a known [`Telescope`], from a JSON
//! file, or from the array reference position of a [`VisibilityStore`], and then passed to
//! everything which needs it.
//!
//! ```json
//! {
//!   "name": "LWA-OVRO",
//!   "latitude_deg": 37.240391,
//!   "longitude_deg": -118.2,
//!   "elevation_m": 1184.0,
//!   "cable_delays": {
//!     "date_generated": "2013-06-01",
//!     "lengths_m": [[10.0, 10.5], [12.0, 12.25]]
//!   },
//!   "sources": { "3C196": { "ra_deg": 123.4, "dec_deg": 48.2 } }
//! }
//! ```

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path, str::FromStr};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        LWA1_ELEVATION_M, LWA1_LATITUDE_DEG, LWA1_LONGITUDE_DEG, OVRO_ELEVATION_M,
        OVRO_LATITUDE_DEG, OVRO_LONGITUDE_DEG, VEL_C,
    },
    io::error::IOError,
    pos::{
        source::CatalogueEntry, Ellipsoid, LatLngHeight, SourceCatalogue, XyzGeocentric,
    },
    store::Feed,
    UvConvError, VisibilityStore,
};

/// Telescopes with built-in site information.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Telescope {
    /// The Long Wavelength Array at the Owens Valley Radio Observatory (LEDA-512)
    LwaOvro,
    /// LWA1 in New Mexico (LEDA-64)
    Lwa1,
}

impl FromStr for Telescope {
    type Err = UvConvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        match key.as_str() {
            "OVRO" | "LEDA" | "LWAOVRO" | "LWA-OVRO" | "LEDAOVRO" | "LEDA512" | "LEDA-OVRO"
            | "LEDA-512" => Ok(Self::LwaOvro),
            "LWA1" | "LWA-1" | "LWA-NM" | "LWANM" | "LEDA64" | "LEDA64-NM" | "LEDA-64" => {
                Ok(Self::Lwa1)
            }
            _ => Err(UvConvError::InvalidArgument {
                argument: "telescope".into(),
                function: "Telescope::from_str".into(),
                reason: format!("unknown telescope {s}"),
            }),
        }
    }
}

impl std::fmt::Display for Telescope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LwaOvro => write!(f, "LWA-OVRO"),
            Self::Lwa1 => write!(f, "LWA1"),
        }
    }
}

impl Telescope {
    /// The geodetic position of the site.
    pub fn site(self) -> LatLngHeight {
        match self {
            Self::LwaOvro => {
                LatLngHeight::from_degrees(OVRO_LATITUDE_DEG, OVRO_LONGITUDE_DEG, OVRO_ELEVATION_M)
            }
            Self::Lwa1 => {
                LatLngHeight::from_degrees(LWA1_LATITUDE_DEG, LWA1_LONGITUDE_DEG, LWA1_ELEVATION_M)
            }
        }
    }
}

/// Electrical lengths of each antenna's signal path, per feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CableDelayTable {
    /// When the table was measured
    pub date_generated: String,
    /// `[A, B]` electrical length \[m\] of antenna `id`, at index `id - 1`
    pub lengths_m: Vec<[f64; 2]>,
}

impl CableDelayTable {
    /// Delays \[s\], `length / c`.
    pub fn delays_s(&self) -> Vec<[f64; 2]> {
        self.lengths_m
            .iter()
            .map(|&[a, b]| [a / VEL_C, b / VEL_C])
            .collect()
    }

    /// The delay \[s\] of one feed of an antenna.
    pub fn delay_s(&self, antenna_id: usize, feed: Feed) -> Option<f64> {
        let [a, b] = *self.lengths_m.get(antenna_id.checked_sub(1)?)?;
        let length_m = match feed {
            Feed::A => a,
            Feed::B => b,
        };
        Some(length_m / VEL_C)
    }
}

/// Everything that is known about a telescope.
#[derive(Clone, Debug, PartialEq)]
pub struct TelescopeConfig {
    /// Telescope name
    pub name: String,
    /// Position of the site
    pub site: LatLngHeight,
    /// Cable delay calibration, if there is any
    pub cable_delays: Option<CableDelayTable>,
    /// Named phase centres
    pub catalogue: SourceCatalogue,
}

#[derive(Serialize, Deserialize)]
struct TelescopeConfigFile {
    name: String,
    latitude_deg: f64,
    longitude_deg: f64,
    elevation_m: f64,
    #[serde(default)]
    cable_delays: Option<CableDelayTable>,
    #[serde(default)]
    sources: BTreeMap<String, CatalogueEntry>,
}

impl From<Telescope> for TelescopeConfig {
    fn from(telescope: Telescope) -> Self {
        Self {
            name: telescope.to_string(),
            site: telescope.site(),
            cable_delays: None,
            catalogue: SourceCatalogue::default(),
        }
    }
}

impl TelescopeConfig {
    /// Read a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// [`UvConvError::IOError`] if the file can't be opened or parsed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, UvConvError> {
        let file = File::open(path.as_ref()).map_err(IOError::from)?;
        let parsed: TelescopeConfigFile =
            serde_json::from_reader(BufReader::new(file)).map_err(IOError::from)?;
        let mut catalogue = SourceCatalogue::default();
        for (name, entry) in &parsed.sources {
            catalogue.insert(name, entry.ra_deg, entry.dec_deg);
        }
        debug!(
            "read telescope config for {} from {}",
            parsed.name,
            path.as_ref().display()
        );
        Ok(Self {
            name: parsed.name,
            site: LatLngHeight::from_degrees(
                parsed.latitude_deg,
                parsed.longitude_deg,
                parsed.elevation_m,
            ),
            cable_delays: parsed.cable_delays,
            catalogue,
        })
    }

    /// Write this configuration as JSON.
    ///
    /// Built-in sources are left out, unless their position was replaced.
    ///
    /// # Errors
    ///
    /// [`UvConvError::IOError`] if the file can't be written.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), UvConvError> {
        let file = TelescopeConfigFile {
            name: self.name.clone(),
            latitude_deg: self.site.latitude_rad.to_degrees(),
            longitude_deg: self.site.longitude_rad.to_degrees(),
            elevation_m: self.site.height_metres,
            cable_delays: self.cable_delays.clone(),
            sources: self
                .catalogue
                .custom_sources()
                .map(|(name, entry)| (name.to_string(), entry))
                .collect(),
        };
        let writer = File::create(path).map_err(IOError::from)?;
        serde_json::to_writer_pretty(writer, &file).map_err(IOError::from)?;
        Ok(())
    }

    /// Determine the configuration for the telescope a store was observed with.
    ///
    /// Known telescopes use their built-in site, anything else derives the site from the
    /// array reference position.
    ///
    /// # Errors
    ///
    /// [`UvConvError::InvalidArgument`] if the telescope is unknown and there is no array
    /// reference position.
    pub fn for_store(store: &VisibilityStore) -> Result<Self, UvConvError> {
        if let Ok(telescope) = store.telescope.parse::<Telescope>() {
            info!("Using built-in site for {telescope}");
            return Ok(telescope.into());
        }
        let XyzGeocentric { x, y, z } = store.array.array_xyz;
        if x == 0.0 && y == 0.0 && z == 0.0 {
            return Err(UvConvError::InvalidArgument {
                argument: "store.array.array_xyz".into(),
                function: "TelescopeConfig::for_store".into(),
                reason: format!(
                    "telescope {} is unknown and the array has no reference position",
                    store.telescope
                ),
            });
        }
        let site = store.array.array_xyz.to_geodetic(Ellipsoid::WGS84);
        info!("Using site {site} from the array reference position");
        Ok(Self {
            name: store.telescope.clone(),
            site,
            cable_delays: None,
            catalogue: SourceCatalogue::default(),
        })
    }
}
