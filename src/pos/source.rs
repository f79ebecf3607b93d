// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Resolving phase centre names to sky positions.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::UvConvError;

/// The name of the local zenith phase centre.
pub const ZENITH: &str = "ZEN";

lazy_static! {
    /// Bright sources which can be used as phase centres, `(name, ra_deg, dec_deg, aliases)`.
    static ref DEFAULT_SOURCES: Vec<(&'static str, f64, f64, &'static [&'static str])> = vec![
        ("CYG", 299.867_91, 40.733_888, &["CYGA", "CYGNUSA"][..]),
        ("CAS", 350.845_83, 58.810_833, &["CASA", "CASSIOPEIAA"][..]),
        ("TAU", 83.633_33, 22.014_44, &["TAUA", "CRAB"][..]),
        ("VIR", 187.705_833, 12.391_11, &["VIRA", "VIRGOA", "M87"][..]),
    ];
}

/// A fixed (J2000) sky position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    /// Right ascension \[degrees\]
    pub ra_deg: f64,
    /// Declination \[degrees\]
    pub dec_deg: f64,
}

/// Where a source is at a particular sidereal time.
#[derive(Clone, Debug, PartialEq)]
pub struct SourcePosition {
    /// Canonical source name, e.g. `CYG` or `ZEN`.
    pub name: String,
    /// Right ascension \[degrees\]
    pub ra_deg: f64,
    /// Declination \[degrees\]
    pub dec_deg: f64,
    /// Hour angle \[degrees, -180..=180\]
    pub ha_deg: f64,
}

/// A set of named phase centres.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceCatalogue {
    sources: BTreeMap<String, CatalogueEntry>,
    aliases: BTreeMap<String, String>,
}

impl Default for SourceCatalogue {
    fn default() -> Self {
        let mut catalogue = Self {
            sources: BTreeMap::new(),
            aliases: BTreeMap::new(),
        };
        for &(name, ra_deg, dec_deg, aliases) in DEFAULT_SOURCES.iter() {
            catalogue.insert(name, ra_deg, dec_deg);
            for alias in aliases {
                catalogue.aliases.insert((*alias).into(), name.into());
            }
        }
        catalogue
    }
}

fn normalise(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .to_uppercase()
}

impl SourceCatalogue {
    /// Add or replace a source.
    pub fn insert(&mut self, name: &str, ra_deg: f64, dec_deg: f64) {
        self.sources
            .insert(normalise(name), CatalogueEntry { ra_deg, dec_deg });
    }

    /// The canonical name for `name`, if it is zenith or a known source.
    pub fn canonical_name(&self, name: &str) -> Option<String> {
        let key = normalise(name);
        if key == ZENITH || key == "ZENITH" {
            return Some(ZENITH.into());
        }
        if self.sources.contains_key(&key) {
            return Some(key);
        }
        self.aliases.get(&key).cloned()
    }

    /// Sources which aren't built in, or whose built-in position has been replaced.
    pub fn custom_sources(&self) -> impl Iterator<Item = (&str, CatalogueEntry)> + '_ {
        self.sources.iter().filter_map(|(name, &entry)| {
            let built_in = DEFAULT_SOURCES
                .iter()
                .any(|&(default, ra_deg, dec_deg, _)| {
                    default == name.as_str() && entry == CatalogueEntry { ra_deg, dec_deg }
                });
            (!built_in).then_some((name.as_str(), entry))
        })
    }

    /// Names of everything that can be resolved, zenith first.
    pub fn names(&self) -> Vec<String> {
        std::iter::once(ZENITH.to_string())
            .chain(self.sources.keys().cloned())
            .collect()
    }

    /// Find the right ascension, declination and hour angle of a source.
    ///
    /// The zenith has an hour angle of zero, a declination equal to the site latitude, and a
    /// right ascension equal to the local sidereal time.
    ///
    /// # Errors
    ///
    /// [`UvConvError::UnknownSource`] if `name` isn't zenith, a source or an alias.
    pub fn hour_angle_and_dec(
        &self,
        name: &str,
        lst_deg: f64,
        latitude_rad: f64,
    ) -> Result<SourcePosition, UvConvError> {
        let canonical = self
            .canonical_name(name)
            .ok_or_else(|| UvConvError::UnknownSource {
                name: name.into(),
                known: self.names().join(", "),
            })?;
        if canonical == ZENITH {
            return Ok(SourcePosition {
                name: canonical,
                ra_deg: lst_deg,
                dec_deg: latitude_rad.to_degrees(),
                ha_deg: 0.0,
            });
        }
        let CatalogueEntry { ra_deg, dec_deg } =
            *self
                .sources
                .get(&canonical)
                .ok_or_else(|| UvConvError::UnknownSource {
                    name: name.into(),
                    known: self.names().join(", "),
                })?;
        let mut ha_deg = (lst_deg - ra_deg).rem_euclid(360.0);
        if ha_deg > 180.0 {
            ha_deg -= 360.0;
        }
        Ok(SourcePosition {
            name: canonical,
            ra_deg,
            dec_deg,
            ha_deg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_zenith() {
        let catalogue = SourceCatalogue::default();
        let pos = catalogue
            .hour_angle_and_dec("zen", 123.4, 37.240391_f64.to_radians())
            .unwrap();
        assert_eq!(pos.name, "ZEN");
        assert_abs_diff_eq!(pos.ha_deg, 0.0);
        assert_abs_diff_eq!(pos.ra_deg, 123.4);
        assert_abs_diff_eq!(pos.dec_deg, 37.240391, epsilon = 1e-12);
    }

    #[test]
    fn test_catalogue_source() {
        let catalogue = SourceCatalogue::default();
        let pos = catalogue.hour_angle_and_dec("CYG", 310.0, 0.6).unwrap();
        assert_abs_diff_eq!(pos.ha_deg, 310.0 - 299.86791, epsilon = 1e-9);
        assert_abs_diff_eq!(pos.dec_deg, 40.733888);

        // wraps into -180..=180
        let pos = catalogue.hour_angle_and_dec("cas", 10.0, 0.6).unwrap();
        assert_abs_diff_eq!(pos.ha_deg, 10.0 + 360.0 - 350.84583, epsilon = 1e-9);
        let pos = catalogue.hour_angle_and_dec("TAU", 350.0, 0.6).unwrap();
        assert_abs_diff_eq!(pos.ha_deg, 350.0 - 83.63333 - 360.0, epsilon = 1e-9);
    }

    #[test]
    fn test_aliases() {
        let catalogue = SourceCatalogue::default();
        assert_eq!(catalogue.canonical_name("CygA").as_deref(), Some("CYG"));
        assert_eq!(catalogue.canonical_name("vir_a").as_deref(), Some("VIR"));
        assert_eq!(catalogue.canonical_name("Zenith").as_deref(), Some("ZEN"));
        assert_eq!(catalogue.canonical_name("SgrA"), None);
    }

    #[test]
    fn test_unknown_source() {
        let catalogue = SourceCatalogue::default();
        assert!(matches!(
            catalogue.hour_angle_and_dec("SUN", 0.0, 0.0),
            Err(UvConvError::UnknownSource { .. })
        ));
    }

    #[test]
    fn test_insert_custom() {
        let mut catalogue = SourceCatalogue::default();
        catalogue.insert("3C196", 123.4, 48.2);
        let pos = catalogue.hour_angle_and_dec("3c196", 123.4, 0.0).unwrap();
        assert_abs_diff_eq!(pos.ha_deg, 0.0);
        assert!(catalogue.names().contains(&"3C196".to_string()));
    }

    #[test]
    fn test_custom_sources() {
        let mut catalogue = SourceCatalogue::default();
        assert_eq!(catalogue.custom_sources().count(), 0);

        catalogue.insert("3C196", 123.4, 48.2);
        catalogue.insert("VIR", 187.7, 12.4);
        let custom: Vec<_> = catalogue.custom_sources().map(|(name, _)| name).collect();
        assert_eq!(custom, vec!["3C196", "VIR"]);
    }
}
