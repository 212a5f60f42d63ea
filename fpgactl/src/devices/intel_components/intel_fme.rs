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

//! Intel FPGA Management Engine.
//!
//! Identity comes from the FME's own sysfs directory. Capability attributes are read as one
//! set from the FME subtree of the owning PCI function when the FME is opened:
//! - `bitstream_id`, `bitstream_metadata` - the static region currently loaded
//! - `dev` - `major:minor` of the FME node
//! - `ports_num` - number of ports the FME manages
//! - `pr/interface_id` - PR interface UUID that bitstreams are checked against
//! - `socket_id` - optional, physical socket of the card
//!
//! Port programming requests (`port_pr`, `port_release`, `port_assign`) go through the FME's
//! own handle.

use crate::backend::DeviceBackend;
use crate::devices::device::{FpgaDevice, Fme};
use crate::devices::intel::{
    DeviceIdentity, INTEL_FPGA_FME_GLOB, INTEL_FPGA_FME_PREFIX, parse_u32,
};
use crate::error::FpgactlError;
use crate::ioctl;
use crate::pci::PciDevice;
use crate::sysfs::{
    FME_ATTRIBUTES, FME_SOCKET_ID, read_attribute_set, read_optional_attribute,
    resolve_single_match,
};
use log::{debug, info};
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Raw attribute values, kept as the driver printed them.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FmeProperties {
    bitstream_id: String,
    bitstream_metadata: String,
    dev: String,
    ports_num: String,
    interface_id: String,
    socket_id: Option<String>,
}

#[derive(Debug)]
pub struct IntelFpgaFme {
    identity: DeviceIdentity,
    properties: OnceLock<FmeProperties>,
}

impl IntelFpgaFme {
    /// Open the FME node at `dev_path`.
    ///
    /// # Returns: `Result<IntelFpgaFme, FpgactlError>`
    /// * `Ok(IntelFpgaFme)` - opened, attributes populated
    /// * `Err(FpgactlError::DeviceClass)` - `dev_path` is not an FME node
    /// * `Err(FpgactlError::SysfsResolution)` / `Err(FpgactlError::IORead)` - the attribute set
    ///   could not be read in full
    pub fn open(
        backend: Arc<dyn DeviceBackend>,
        dev_path: &Path,
    ) -> Result<IntelFpgaFme, FpgactlError> {
        let identity = DeviceIdentity::resolve(backend, dev_path, INTEL_FPGA_FME_PREFIX)?;
        let mut fme = IntelFpgaFme {
            identity,
            properties: OnceLock::new(),
        };
        fme.properties()?;
        fme.identity.open_handle()?;
        debug!("Opened {} at {dev_path:?}", fme.name());
        Ok(fme)
    }

    fn read_properties(&self) -> Result<FmeProperties, FpgactlError> {
        let pci = self.identity.pci_device()?;
        let dir = resolve_single_match(pci.sysfs_path(), INTEL_FPGA_FME_GLOB)?;
        let [bitstream_id, bitstream_metadata, dev, ports_num, interface_id] =
            read_attribute_set(&dir, FME_ATTRIBUTES)?;
        let socket_id = read_optional_attribute(&dir, FME_SOCKET_ID)?;
        Ok(FmeProperties {
            bitstream_id,
            bitstream_metadata,
            dev,
            ports_num,
            interface_id,
            socket_id,
        })
    }

    fn properties(&self) -> Result<&FmeProperties, FpgactlError> {
        if let Some(properties) = self.properties.get() {
            return Ok(properties);
        }
        let properties = self.read_properties()?;
        Ok(self.properties.get_or_init(|| properties))
    }

    /// `major:minor` of this FME's node as published in sysfs.
    pub fn dev(&self) -> Result<&str, FpgactlError> {
        Ok(&self.properties()?.dev)
    }

    pub fn is_open(&self) -> bool {
        self.identity.is_open()
    }
}

impl FpgaDevice for IntelFpgaFme {
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

    /// Closing an FME only releases its own handle; it owns nothing else.
    fn close(&mut self) {
        self.identity.close();
    }
}

impl Fme for IntelFpgaFme {
    fn interface_uuid(&self) -> Result<&str, FpgactlError> {
        Ok(&self.properties()?.interface_id)
    }

    fn bitstream_id(&self) -> Result<&str, FpgactlError> {
        Ok(&self.properties()?.bitstream_id)
    }

    fn bitstream_metadata(&self) -> Result<&str, FpgactlError> {
        Ok(&self.properties()?.bitstream_metadata)
    }

    fn socket_id(&self) -> Result<u32, FpgactlError> {
        match self.properties()?.socket_id.as_deref() {
            None | Some("") => Err(FpgactlError::NotAvailable("socket_id")),
            Some(value) => parse_u32("socket_id", value),
        }
    }

    fn ports_num(&self) -> Result<u32, FpgactlError> {
        parse_u32("ports_num", &self.properties()?.ports_num)
    }

    fn port_pr(&self, port_id: u32, bitstream: &[u8]) -> Result<(), FpgactlError> {
        ioctl::fme_port_pr(self.identity.handle()?, self.dev_path(), port_id, bitstream)?;
        info!(
            "Programmed port {port_id} through {} ({} bytes)",
            self.name(),
            bitstream.len()
        );
        Ok(())
    }

    fn port_release(&self, port_id: u32) -> Result<(), FpgactlError> {
        ioctl::fme_port_release(self.identity.handle()?, self.dev_path(), port_id)?;
        info!("Released port {port_id} from {}", self.name());
        Ok(())
    }

    fn port_assign(&self, port_id: u32) -> Result<(), FpgactlError> {
        ioctl::fme_port_assign(self.identity.handle()?, self.dev_path(), port_id)?;
        info!("Assigned port {port_id} to {}", self.name());
        Ok(())
    }
}
