//! Input and Output data file format modules

pub mod error;
pub mod json;
pub mod matrix;

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use log::{debug, info, trace};

pub use json::{dump_uvw, load_uvw, read_store, write_store};
pub use matrix::{read_matrix, write_matrix, MatrixHeader};

use self::error::IOError;
use crate::{
    config::{Telescope, TelescopeConfig},
    UvConvError, VisibilityStore,
};

/// The kinds of visibility file which can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisInputType {
    /// A whole store in JSON, see [`json::write_store`]
    Json,
    /// A raw correlator matrix buffer, described by a [`MatrixHeader`]
    Matrix,
}

impl VisInputType {
    /// Determine the input type from a file extension.
    ///
    /// # Errors
    ///
    /// [`IOError::UnknownFormat`] if the extension is not `.json`, `.bin` or `.dat`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, IOError> {
        let path = path.as_ref();
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("bin" | "dat") => Ok(Self::Matrix),
            _ => Err(IOError::UnknownFormat {
                path: path.display().to_string(),
                expected: ".json, .bin, .dat".into(),
            }),
        }
    }
}

/// Groups together parameters related to I/O
#[derive(Debug, Default, Clone)]
pub struct IOContext {
    // in
    /// The path to the visibility input file
    pub vis_in: PathBuf,
    /// The path to the JSON [`MatrixHeader`] for a matrix input
    pub matrix_header_in: Option<PathBuf>,
    /// Optional path to a JSON telescope configuration
    pub config_in: Option<PathBuf>,
    /// Telescope to use when there is no configuration file
    pub telescope: Option<Telescope>,

    // out
    /// Optional path for the JSON store output
    pub json_out: Option<PathBuf>,
    /// Optional path for the JSON UVW output
    pub uvw_out: Option<PathBuf>,
}

impl IOContext {
    /// The type of the visibility input.
    ///
    /// # Errors
    ///
    /// see [`VisInputType::from_path`]
    pub fn input_type(&self) -> Result<VisInputType, IOError> {
        VisInputType::from_path(&self.vis_in)
    }

    fn read_matrix_header(&self) -> Result<MatrixHeader, UvConvError> {
        let path = self
            .matrix_header_in
            .as_ref()
            .ok_or_else(|| UvConvError::InvalidArgument {
                argument: "matrix_header_in".into(),
                function: "IOContext::read_matrix_header".into(),
                reason: format!(
                    "{} is a matrix buffer, which needs a header",
                    self.vis_in.display()
                ),
            })?;
        let file = File::open(path).map_err(IOError::from)?;
        let header = serde_json::from_reader(BufReader::new(file)).map_err(IOError::from)?;
        Ok(header)
    }

    /// Resolve the telescope configuration before a store is read.
    ///
    /// A configuration file wins over a telescope name. Without either, `None`.
    ///
    /// # Errors
    ///
    /// see [`TelescopeConfig::from_json_file`]
    pub fn get_config(&self) -> Result<Option<TelescopeConfig>, UvConvError> {
        match (&self.config_in, self.telescope) {
            (Some(path), _) => {
                info!("Reading telescope configuration from {}", path.display());
                Ok(Some(TelescopeConfig::from_json_file(path)?))
            }
            (None, Some(telescope)) => Ok(Some(telescope.into())),
            (None, None) => Ok(None),
        }
    }

    /// Read the visibility input and resolve the telescope configuration for it.
    ///
    /// Without a configuration file or telescope name, a JSON store uses
    /// [`TelescopeConfig::for_store`] and a matrix uses the telescope in its header.
    ///
    /// # Errors
    ///
    /// - [`IOError::UnknownFormat`] if the input type can't be determined
    /// - [`UvConvError::InvalidArgument`] for a matrix without a header
    /// - see [`read_store`], [`read_matrix`], [`TelescopeConfig::for_store`]
    pub fn read_input(&self) -> Result<(VisibilityStore, TelescopeConfig), UvConvError> {
        trace!("start read_input");
        let input_type = self.input_type()?;
        debug!("reading {} as {input_type:?}", self.vis_in.display());
        let result = match input_type {
            VisInputType::Json => {
                let store = read_store(&self.vis_in)?;
                let config = match self.get_config()? {
                    Some(config) => config,
                    None => TelescopeConfig::for_store(&store)?,
                };
                (store, config)
            }
            VisInputType::Matrix => {
                let header = self.read_matrix_header()?;
                let config = match self.get_config()? {
                    Some(config) => config,
                    None => header.telescope.parse::<Telescope>()?.into(),
                };
                let buffer = std::fs::read(&self.vis_in).map_err(IOError::from)?;
                (read_matrix(buffer, &header, &config)?, config)
            }
        };
        trace!("end read_input");
        Ok(result)
    }

    /// Write the requested outputs for a store.
    ///
    /// # Errors
    ///
    /// see [`write_store`], [`dump_uvw`]
    pub fn write_outputs(&self, store: &VisibilityStore) -> Result<(), UvConvError> {
        if let Some(path) = &self.json_out {
            info!("Writing store to {}", path.display());
            write_store(store, path)?;
        }
        if let Some(path) = &self.uvw_out {
            info!("Writing UVW to {}", path.display());
            dump_uvw(store, path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_common::get_test_store;
    use tempfile::tempdir;

    #[test]
    fn test_input_type_from_path() {
        assert_eq!(
            VisInputType::from_path("obs/store.json").unwrap(),
            VisInputType::Json
        );
        assert_eq!(
            VisInputType::from_path("obs/2013-06-01.DAT").unwrap(),
            VisInputType::Matrix
        );
        assert_eq!(
            VisInputType::from_path("vis.bin").unwrap(),
            VisInputType::Matrix
        );
        assert!(matches!(
            VisInputType::from_path("vis.uvfits"),
            Err(IOError::UnknownFormat { .. })
        ));
        assert!(VisInputType::from_path("vis").is_err());
    }

    #[test]
    fn test_get_config() {
        let io_ctx = IOContext::default();
        assert_eq!(io_ctx.get_config().unwrap(), None);
        let io_ctx = IOContext {
            telescope: Some(Telescope::Lwa1),
            ..IOContext::default()
        };
        assert_eq!(io_ctx.get_config().unwrap().unwrap().name, "LWA1");
    }

    #[test]
    fn test_read_json_round_trip() {
        let tmp_dir = tempdir().unwrap();
        let vis_in = tmp_dir.path().join("in.json");
        let store = get_test_store(3, 2, 2, true);
        write_store(&store, &vis_in).unwrap();

        let io_ctx = IOContext {
            vis_in,
            json_out: Some(tmp_dir.path().join("out.json")),
            uvw_out: Some(tmp_dir.path().join("uvw.json")),
            ..IOContext::default()
        };
        let (read, config) = io_ctx.read_input().unwrap();
        assert_eq!(read.num_rows(), store.num_rows());
        assert_eq!(config.name, "LWA-OVRO");

        io_ctx.write_outputs(&read).unwrap();
        assert!(tmp_dir.path().join("out.json").exists());
        assert!(tmp_dir.path().join("uvw.json").exists());
    }

    #[test]
    fn test_matrix_needs_header() {
        let io_ctx = IOContext {
            vis_in: "vis.dat".into(),
            ..IOContext::default()
        };
        assert!(matches!(
            io_ctx.read_input(),
            Err(UvConvError::InvalidArgument { .. })
        ));
    }
}
