//! Optional YAML config file for `build`.
//!
//! Every key is optional. Values given on the command line (or through the
//! environment) win over the file, and the file wins over built-in
//! defaults. Relative paths are taken relative to the file's directory.
//!
//! ```yaml
//! inputs: [data/train/0, data/train/1]
//! out: out
//! val_count: 8
//! seed: 1337
//! priority: head
//! scheme: three-class
//! size: 768
//! resize_filter: bicubic
//! archive_name: dataset.zip
//! extensions: [png, jpg]
//! aliases:
//!   infant: body
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::MaskpackError;
use crate::labels::MaskScheme;
use crate::pack::ResizeFilter;
use crate::raster::OverlapPriority;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub inputs: Option<Vec<PathBuf>>,
    pub out: Option<PathBuf>,
    pub val_count: Option<usize>,
    pub seed: Option<u64>,
    pub priority: Option<OverlapPriority>,
    pub scheme: Option<MaskScheme>,
    pub size: Option<u32>,
    pub resize_filter: Option<ResizeFilter>,
    pub archive_name: Option<String>,
    pub extensions: Option<Vec<String>>,
    /// Extra label spellings: alias -> canonical class name.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl FileConfig {
    /// Parse YAML text. Paths are left as written.
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file is an empty config, not a parse error.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Read a config file and anchor its relative paths to its directory.
    pub fn read(path: &Path) -> Result<Self, MaskpackError> {
        let text = fs::read_to_string(path).map_err(MaskpackError::Io)?;
        let mut config =
            Self::from_yaml_str(&text).map_err(|source| MaskpackError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(base) = path.parent() {
            config.anchor_paths(base);
        }
        Ok(config)
    }

    fn anchor_paths(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(inputs) = &mut self.inputs {
            inputs.iter_mut().for_each(anchor);
        }
        if let Some(out) = &mut self.out {
            anchor(out);
        }
    }
}
