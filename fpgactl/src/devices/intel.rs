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

//! Pieces shared by the Intel FPGA FME and Port implementations.
//!
//! Both device kinds are identified the same way: the node is mapped onto its sysfs directory,
//! the directory's base name must carry the kind's prefix, and the PCI function owning it is
//! looked up on demand. [`DeviceIdentity`] holds that state, plus the open handle.

use crate::backend::DeviceBackend;
use crate::error::FpgactlError;
use crate::ioctl::DeviceHandle;
use crate::pci::PciDevice;
use log::trace;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

pub static INTEL_FPGA_FME_PREFIX: &str = "intel-fpga-fme.";
pub static INTEL_FPGA_PORT_PREFIX: &str = "intel-fpga-port.";

/// Where the FME of a card lives below its PCI physical function.
pub static INTEL_FPGA_FME_GLOB: &str = "fpga/intel-fpga-dev.*/intel-fpga-fme.*";

pub(crate) struct DeviceIdentity {
    dev_path: PathBuf,
    sysfs_path: PathBuf,
    name: String,
    pci_device: OnceLock<PciDevice>,
    backend: Arc<dyn DeviceBackend>,
    handle: Option<Box<dyn DeviceHandle>>,
}

impl DeviceIdentity {
    /// Resolve `dev_path` and check that it names a device of the kind `expected_prefix`.
    /// The node is not opened yet.
    pub(crate) fn resolve(
        backend: Arc<dyn DeviceBackend>,
        dev_path: &Path,
        expected_prefix: &'static str,
    ) -> Result<DeviceIdentity, FpgactlError> {
        let sysfs_path = backend.sysfs_device(dev_path)?;
        let name = sysfs_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !name.starts_with(expected_prefix) {
            return Err(FpgactlError::DeviceClass {
                device: dev_path.to_owned(),
                name,
                expected: expected_prefix,
            });
        }
        trace!("{dev_path:?} is {name} at {sysfs_path:?}");
        Ok(DeviceIdentity {
            dev_path: dev_path.to_owned(),
            sysfs_path,
            name,
            pci_device: OnceLock::new(),
            backend,
            handle: None,
        })
    }

    pub(crate) fn open_handle(&mut self) -> Result<(), FpgactlError> {
        self.handle = Some(self.backend.open(&self.dev_path)?);
        Ok(())
    }

    pub(crate) fn dev_path(&self) -> &Path {
        &self.dev_path
    }

    pub(crate) fn sysfs_path(&self) -> &Path {
        &self.sysfs_path
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn backend(&self) -> &Arc<dyn DeviceBackend> {
        &self.backend
    }

    pub(crate) fn pci_device(&self) -> Result<&PciDevice, FpgactlError> {
        if let Some(pci) = self.pci_device.get() {
            return Ok(pci);
        }
        let pci = PciDevice::from_sysfs(&self.sysfs_path)?;
        Ok(self.pci_device.get_or_init(|| pci))
    }

    pub(crate) fn handle(&self) -> Result<&dyn DeviceHandle, FpgactlError> {
        self.handle
            .as_deref()
            .ok_or_else(|| FpgactlError::Closed(self.dev_path.clone()))
    }

    pub(crate) fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn close(&mut self) {
        if self.handle.take().is_some() {
            trace!("Closed {:?}", self.dev_path);
        }
    }
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("dev_path", &self.dev_path)
            .field("sysfs_path", &self.sysfs_path)
            .field("name", &self.name)
            .field("pci_device", &self.pci_device.get())
            .field("open", &self.is_open())
            .finish()
    }
}

/// Parse a numeric attribute kept as text.
pub(crate) fn parse_u32(attribute: &'static str, value: &str) -> Result<u32, FpgactlError> {
    value
        .parse::<u32>()
        .map_err(|e| FpgactlError::AttributeParse {
            attribute,
            value: value.to_string(),
            reason: e.to_string(),
        })
}
