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

//! Capability traits for FPGA devices.
//!
//! The traits split the surface of a device into three parts:
//! - [`FpgaDevice`] - identity and driver queries every device node supports
//! - [`Fme`] - the management engine, which programs and (de)assigns ports
//! - [`Port`] - an accelerator slot, which can be reset, queried and reprogrammed
//!
//! # Examples
//!
//! ```rust,no_run
//! # use fpgactl::backend::LinuxBackend;
//! # use fpgactl::config::SystemPaths;
//! # use fpgactl::devices::device::{FpgaDevice, Port};
//! # use fpgactl::devices::intel_components::intel_port::IntelFpgaPort;
//! # use std::path::Path;
//! # fn example() -> Result<(), fpgactl::error::FpgactlError> {
//! let backend = LinuxBackend::shared(SystemPaths::default());
//! let mut port = IntelFpgaPort::open(backend, Path::new("/dev/intel-fpga-port.0"))?;
//! println!("{} runs {}", port.name(), port.accelerator_type_uuid()?);
//! port.close();
//! # Ok(())
//! # }
//! ```

use crate::error::FpgactlError;
use crate::ioctl::{PortInfo, PortRegionInfo};
use crate::pci::PciDevice;
use crate::reconfigure::{Bitstream, PrReport};
use std::path::Path;

/// Identity and driver queries shared by FMEs and Ports.
pub trait FpgaDevice {
    /// Path of the device node, e.g. `/dev/intel-fpga-fme.0`.
    fn dev_path(&self) -> &Path;

    /// Sysfs directory of the device, resolved once when the device is opened.
    fn sysfs_path(&self) -> &Path;

    /// Device name, the base name of [`FpgaDevice::sysfs_path`], e.g. `intel-fpga-port.0`.
    fn name(&self) -> &str;

    /// The PCI function the device sits on. Resolved on first use and cached.
    ///
    /// # Returns: `Result<&PciDevice, FpgactlError>`
    /// * `Ok(&PciDevice)` - the owning function, with its physical function for a VF
    /// * `Err(FpgactlError::Topology)` - the device is not below a PCI function
    fn pci_device(&self) -> Result<&PciDevice, FpgactlError>;

    /// Report the version of the driver API.
    ///
    /// # Returns: `Result<i32, FpgactlError>`
    /// * `Ok(i32)` - driver API version
    /// * `Err(FpgactlError::Driver)` - the request failed
    /// * `Err(FpgactlError::Closed)` - the device was closed
    fn api_version(&self) -> Result<i32, FpgactlError>;

    /// Check whether an extension is supported.
    ///
    /// # Returns: `Result<i32, FpgactlError>`
    /// * `Ok(0)` - not supported
    /// * `Ok(i32)` - supported
    fn check_extension(&self) -> Result<i32, FpgactlError>;

    /// Release the device handle. Calling it again has no further effect.
    fn close(&mut self);
}

/// An FPGA Management Engine.
pub trait Fme: FpgaDevice {
    /// The PR interface UUID (`pr/interface_id`) bitstreams must be built against.
    fn interface_uuid(&self) -> Result<&str, FpgactlError>;

    fn bitstream_id(&self) -> Result<&str, FpgactlError>;

    fn bitstream_metadata(&self) -> Result<&str, FpgactlError>;

    /// Physical socket of the card.
    ///
    /// # Returns: `Result<u32, FpgactlError>`
    /// * `Ok(u32)` - socket number, 0 included
    /// * `Err(FpgactlError::NotAvailable)` - the driver does not publish a socket
    /// * `Err(FpgactlError::AttributeParse)` - the published value is not a number
    fn socket_id(&self) -> Result<u32, FpgactlError>;

    /// Number of ports managed by this FME.
    fn ports_num(&self) -> Result<u32, FpgactlError>;

    /// Program `bitstream` onto port `port_id`.
    ///
    /// # Returns: `Result<(), FpgactlError>`
    /// * `Ok(())` - programming completed
    /// * `Err(FpgactlError::EmptyPayload)` - `bitstream` is empty; nothing was sent
    /// * `Err(FpgactlError::Programming)` - the hardware detected an error while programming
    /// * `Err(FpgactlError::PrParameter)` - the driver rejected the request
    /// * `Err(FpgactlError::Driver)` - any other driver failure
    fn port_pr(&self, port_id: u32, bitstream: &[u8]) -> Result<(), FpgactlError>;

    /// Release port `port_id` from its host interface.
    fn port_release(&self, port_id: u32) -> Result<(), FpgactlError>;

    /// Assign port `port_id` back to its host interface.
    fn port_assign(&self, port_id: u32) -> Result<(), FpgactlError>;
}

/// An accelerator port.
pub trait Port: FpgaDevice {
    /// Index of this port within its card.
    fn port_id(&self) -> Result<u32, FpgactlError>;

    /// UUID of the accelerator currently loaded, read fresh from sysfs on every call.
    fn accelerator_type_uuid(&self) -> Result<String, FpgactlError>;

    /// The FME that manages this port. Resolved once, then reused until the port is closed.
    ///
    /// # Returns: `Result<&dyn Fme, FpgactlError>`
    /// * `Ok(&dyn Fme)` - the FME, possibly on the physical function of this port's VF
    /// * `Err(FpgactlError::Topology)` - the FME could not be located
    fn fme(&self) -> Result<&dyn Fme, FpgactlError>;

    /// PR interface UUID of the owning FME.
    fn interface_uuid(&self) -> Result<&str, FpgactlError>;

    fn port_reset(&self) -> Result<(), FpgactlError>;

    fn port_info(&self) -> Result<PortInfo, FpgactlError>;

    fn port_region_info(&self, index: u32) -> Result<PortRegionInfo, FpgactlError>;

    /// Reprogram this port with `bitstream`. With `dry_run` only the checks run.
    fn pr(&self, bitstream: &dyn Bitstream, dry_run: bool) -> Result<PrReport, FpgactlError>;
}
