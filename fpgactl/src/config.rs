// This file is part of fpgactl, a library and tool to inspect and reprogram FPGA management engines and ports.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// fpgactl is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// fpgactl is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

use crate::error::FpgactlError;
use crate::system_io::fs_read;
use log::trace;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The kernel's device-number index of sysfs. Typically `/sys/dev/`, holding `char/<major>:<minor>`
/// and `block/<major>:<minor>` symlinks into the device tree.
pub static SYS_DEV_DIR: &str = "/sys/dev";

/// Directory of udev-maintained `<major>:<minor>` symlinks to character device nodes.
/// Typically `/dev/char/`.
pub static DEV_CHAR_DIR: &str = "/dev/char";

/// Where the command line tool looks for path overrides when `--config` is not given.
pub static DEFAULT_CONFIG_FILE: &str = "/etc/fpgactl/config.toml";

/// Host paths used to translate between device nodes and sysfs.
///
/// All lookups outside of a device's own sysfs directory go through one of these, so the
/// whole core can be pointed at a fabricated tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaths {
    pub sys_dev_dir: PathBuf,
    pub dev_char_dir: PathBuf,
}

impl Default for SystemPaths {
    fn default() -> Self {
        SystemPaths {
            sys_dev_dir: PathBuf::from(SYS_DEV_DIR),
            dev_char_dir: PathBuf::from(DEV_CHAR_DIR),
        }
    }
}

/// This is the top level struct which holds all sections
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    system_paths: Option<SystemPathsToml>,
}

/// The `[system_paths]` section. Every key is optional.
#[derive(Debug, Default, Deserialize)]
struct SystemPathsToml {
    sys_dev_dir: Option<String>,
    dev_char_dir: Option<String>,
}

impl SystemPathsToml {
    fn merge(self, fallback: SystemPaths) -> SystemPaths {
        SystemPaths {
            sys_dev_dir: self.sys_dev_dir.map(PathBuf::from).unwrap_or_else(|| {
                trace!("No sys_dev_dir provided. Using {:?}.", fallback.sys_dev_dir);
                fallback.sys_dev_dir
            }),
            dev_char_dir: self.dev_char_dir.map(PathBuf::from).unwrap_or_else(|| {
                trace!("No dev_char_dir provided. Using {:?}.", fallback.dev_char_dir);
                fallback.dev_char_dir
            }),
        }
    }
}

impl SystemPaths {
    /// Parse a TOML document and lay its `[system_paths]` section over the defaults.
    ///
    /// # Returns: `Result<SystemPaths, FpgactlError>`
    /// * `Ok(SystemPaths)` - defaults with any provided keys replaced
    /// * `Err(FpgactlError::Config)` - the document is not valid TOML for this schema
    pub fn from_toml_str(toml_string: &str, origin: &Path) -> Result<SystemPaths, FpgactlError> {
        let config: TomlConfig = toml::from_str(toml_string).map_err(|e| FpgactlError::Config {
            file: origin.to_owned(),
            e,
        })?;
        Ok(config
            .system_paths
            .unwrap_or_default()
            .merge(SystemPaths::default()))
    }

    /// Load path overrides from `file_path`. A file that does not exist yields the defaults.
    pub fn from_file(file_path: &Path) -> Result<SystemPaths, FpgactlError> {
        if !file_path.is_file() {
            trace!("Config file not found at {file_path:?}. Using defaults.");
            return Ok(SystemPaths::default());
        }
        SystemPaths::from_toml_str(&fs_read(file_path)?, file_path)
    }
}
