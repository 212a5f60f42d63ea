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

//! Intel FPGA Port.
//!
//! A port reads `afu_id`, `dev` and `id` from its own sysfs directory when opened. Its FME is
//! found through PCI topology rather than ownership: on an SR-IOV virtual function the FME only
//! exists under the physical function.
//!
//! # Locating the FME
//!
//! 1. take the PCI function of the port, or its physical function if it is a VF
//! 2. find `fpga/intel-fpga-dev.*/intel-fpga-fme.*` below that function
//! 3. read the FME's `dev` (`major:minor`)
//! 4. evaluate `/dev/char/<major:minor>` to the real node
//! 5. open the FME there
//!
//! A failure at any step is reported as [`FpgactlError::Topology`] carrying the cause.
//!
//! The resolved FME is kept for the rest of the port's life and is closed with it.

use crate::backend::DeviceBackend;
use crate::devices::device::{FpgaDevice, Fme, Port};
use crate::devices::intel::{
    DeviceIdentity, INTEL_FPGA_FME_GLOB, INTEL_FPGA_PORT_PREFIX, parse_u32,
};
use crate::devices::intel_components::intel_fme::IntelFpgaFme;
use crate::error::FpgactlError;
use crate::ioctl::{self, PortInfo, PortRegionInfo};
use crate::pci::PciDevice;
use crate::reconfigure::{Bitstream, PrReport, program_port};
use crate::sysfs::{PORT_ATTRIBUTES, read_attribute_set, resolve_single_match};
use crate::system_io::fs_canonicalize;
use log::{debug, trace};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Raw attribute values, kept as the driver printed them. `afu_id` is read with the set but
/// not kept, since programming the port changes it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PortProperties {
    dev: String,
    id: String,
}

#[derive(Debug)]
pub struct IntelFpgaPort {
    identity: DeviceIdentity,
    properties: OnceLock<PortProperties>,
    fme: OnceLock<IntelFpgaFme>,
}

impl IntelFpgaPort {
    /// Open the port node at `dev_path`.
    ///
    /// # Returns: `Result<IntelFpgaPort, FpgactlError>`
    /// * `Ok(IntelFpgaPort)` - opened, attributes populated
    /// * `Err(FpgactlError::DeviceClass)` - `dev_path` is not a port node
    /// * `Err(FpgactlError::IORead)` - an attribute could not be read
    pub fn open(
        backend: Arc<dyn DeviceBackend>,
        dev_path: &Path,
    ) -> Result<IntelFpgaPort, FpgactlError> {
        let identity = DeviceIdentity::resolve(backend, dev_path, INTEL_FPGA_PORT_PREFIX)?;
        let mut port = IntelFpgaPort {
            identity,
            properties: OnceLock::new(),
            fme: OnceLock::new(),
        };
        port.properties()?;
        port.identity.open_handle()?;
        debug!("Opened {} at {dev_path:?}", port.name());
        Ok(port)
    }

    fn properties(&self) -> Result<&PortProperties, FpgactlError> {
        if let Some(properties) = self.properties.get() {
            return Ok(properties);
        }
        let [_afu_id, dev, id] = read_attribute_set(self.sysfs_path(), PORT_ATTRIBUTES)?;
        Ok(self.properties.get_or_init(|| PortProperties { dev, id }))
    }

    /// `major:minor` of this port's node as published in sysfs.
    pub fn dev(&self) -> Result<&str, FpgactlError> {
        Ok(&self.properties()?.dev)
    }

    pub fn is_open(&self) -> bool {
        self.identity.is_open()
    }

    /// Whether the owning FME has been resolved (and is therefore held open by this port).
    pub fn has_fme(&self) -> bool {
        self.fme.get().is_some()
    }

    fn fme_node(&self) -> Result<PathBuf, FpgactlError> {
        let pci = self.pci_device()?;
        let host = pci.host_function();
        trace!(
            "Looking for the FME of {} under PCI device {}",
            self.name(),
            host.address()
        );
        let fme_dir = resolve_single_match(host.sysfs_path(), INTEL_FPGA_FME_GLOB)?;
        let [dev] = read_attribute_set(&fme_dir, ["dev"])?;
        let char_link = self
            .identity
            .backend()
            .system_paths()
            .dev_char_dir
            .join(&dev);
        fs_canonicalize(&char_link)
    }

    /// The FME managing this port, resolved once and reused.
    pub fn intel_fme(&self) -> Result<&IntelFpgaFme, FpgactlError> {
        if let Some(fme) = self.fme.get() {
            return Ok(fme);
        }
        self.identity.handle()?;
        let fme = self
            .fme_node()
            .and_then(|node| IntelFpgaFme::open(self.identity.backend().clone(), &node))
            .map_err(|e| {
                FpgactlError::Topology(format!("cannot locate the FME of {}: {e}", self.name()))
            })?;
        debug!("{} is managed by {}", self.name(), fme.name());
        Ok(self.fme.get_or_init(|| fme))
    }
}

impl FpgaDevice for IntelFpgaPort {
    fn dev_path(&self) -> &Path {
        self.identity.dev_path()
    }

    fn sysfs_path(&self) -> &Path {
        self.identity.sysfs_path()
    }

    fn name(&self) -> &str {
        self.identity.name()
    }

    fn pci_device(&self) -> Result<&PciDevice, FpgactlError> {
        self.identity.pci_device()
    }

    fn api_version(&self) -> Result<i32, FpgactlError> {
        ioctl::api_version(self.identity.handle()?, self.dev_path())
    }

    fn check_extension(&self) -> Result<i32, FpgactlError> {
        ioctl::check_extension(self.identity.handle()?, self.dev_path())
    }

    /// Closing a port closes the FME it resolved, if any, then its own handle.
    fn close(&mut self) {
        if let Some(fme) = self.fme.get_mut() {
            fme.close();
        }
        self.identity.close();
    }
}

impl Port for IntelFpgaPort {
    fn port_id(&self) -> Result<u32, FpgactlError> {
        parse_u32("id", &self.properties()?.id)
    }

    fn accelerator_type_uuid(&self) -> Result<String, FpgactlError> {
        let [afu_id] = read_attribute_set(self.sysfs_path(), ["afu_id"])?;
        Ok(afu_id)
    }

    fn fme(&self) -> Result<&dyn Fme, FpgactlError> {
        Ok(self.intel_fme()?)
    }

    /// Answered by the cached FME, which stays open until the port is closed.
    fn interface_uuid(&self) -> Result<&str, FpgactlError> {
        self.intel_fme()?.interface_uuid()
    }

    fn port_reset(&self) -> Result<(), FpgactlError> {
        ioctl::port_reset(self.identity.handle()?, self.dev_path())
    }

    fn port_info(&self) -> Result<PortInfo, FpgactlError> {
        ioctl::port_info(self.identity.handle()?, self.dev_path())
    }

    fn port_region_info(&self, index: u32) -> Result<PortRegionInfo, FpgactlError> {
        ioctl::port_region_info(self.identity.handle()?, self.dev_path(), index)
    }

    fn pr(&self, bitstream: &dyn Bitstream, dry_run: bool) -> Result<PrReport, FpgactlError> {
        program_port(self, bitstream, dry_run)
    }
}
