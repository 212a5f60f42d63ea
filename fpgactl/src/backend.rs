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

//! Access to the host: how device nodes map onto sysfs, and how they are opened.
//!
//! Entities only reach the kernel through a [`DeviceBackend`], which lets a port open the FME
//! it discovers through the same host view it was opened with.

use crate::config::SystemPaths;
use crate::error::FpgactlError;
use crate::ioctl::{DevNode, DeviceHandle};
use crate::sysfs::find_sysfs_device;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub trait DeviceBackend: Send + Sync {
    /// Paths used for device-number lookups.
    fn system_paths(&self) -> &SystemPaths;

    /// Resolve the sysfs directory of the device node `dev_path`.
    fn sysfs_device(&self, dev_path: &Path) -> Result<PathBuf, FpgactlError>;

    /// Open `dev_path` for driver requests.
    fn open(&self, dev_path: &Path) -> Result<Box<dyn DeviceHandle>, FpgactlError>;
}

/// The running Linux host.
#[derive(Debug, Clone, Default)]
pub struct LinuxBackend {
    paths: SystemPaths,
}

impl LinuxBackend {
    pub fn new(paths: SystemPaths) -> Self {
        LinuxBackend { paths }
    }

    /// Shorthand for sharing a backend between entities.
    pub fn shared(paths: SystemPaths) -> Arc<dyn DeviceBackend> {
        Arc::new(LinuxBackend::new(paths))
    }
}

impl DeviceBackend for LinuxBackend {
    fn system_paths(&self) -> &SystemPaths {
        &self.paths
    }

    fn sysfs_device(&self, dev_path: &Path) -> Result<PathBuf, FpgactlError> {
        find_sysfs_device(&self.paths, dev_path)
    }

    fn open(&self, dev_path: &Path) -> Result<Box<dyn DeviceHandle>, FpgactlError> {
        Ok(Box::new(DevNode::open(dev_path)?))
    }
}
