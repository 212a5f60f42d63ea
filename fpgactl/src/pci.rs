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

//! PCI topology navigation.
//!
//! An FPGA device's sysfs directory lives below the PCI function that exposes it. For an SR-IOV
//! virtual function the FME is only present under the physical function, which the kernel links
//! from the virtual function's `physfn` entry.

use crate::error::FpgactlError;
use crate::system_io::fs_canonicalize;
use log::trace;
use std::path::{Path, PathBuf};

/// A PCI function as seen through sysfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PciDevice {
    sysfs_path: PathBuf,
    address: String,
    physfn: Option<Box<PciDevice>>,
}

/// `dddd:bb:dd.f` in hex, as the PCI core names its sysfs directories.
pub(crate) fn is_pci_address(name: &str) -> bool {
    let hex = |s: &str, len: usize| s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit());
    let mut parts = name.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(domain), Some(bus), Some(slot_fn), None) => match slot_fn.split_once('.') {
            Some((slot, func)) => hex(domain, 4) && hex(bus, 2) && hex(slot, 2) && hex(func, 1),
            None => false,
        },
        _ => false,
    }
}

fn pci_ancestor(path: &Path) -> Option<(PathBuf, String)> {
    path.ancestors().find_map(|p| {
        let name = p.file_name()?.to_str()?;
        is_pci_address(name).then(|| (p.to_path_buf(), name.to_string()))
    })
}

impl PciDevice {
    /// Resolve the PCI function owning the sysfs device at `sysfs_path`, and its physical
    /// function if it is a virtual function.
    ///
    /// # Returns: `Result<PciDevice, FpgactlError>`
    /// * `Ok(PciDevice)` - owning function, `physical_function()` set for a VF
    /// * `Err(FpgactlError::Topology)` - no PCI ancestor, or a `physfn` chain longer than one hop
    /// * `Err(FpgactlError::IOReadLink)` - a link could not be evaluated
    pub fn from_sysfs(sysfs_path: &Path) -> Result<PciDevice, FpgactlError> {
        let real = fs_canonicalize(sysfs_path)?;
        let (pci_path, address) = pci_ancestor(&real).ok_or_else(|| {
            FpgactlError::Topology(format!("{real:?} is not below a PCI device"))
        })?;
        trace!("{sysfs_path:?} belongs to PCI device {address}");

        let link = pci_path.join("physfn");
        let physfn = if link.exists() {
            let pf_path = fs_canonicalize(&link)?;
            let pf_address = pf_path
                .file_name()
                .and_then(|n| n.to_str())
                .filter(|n| is_pci_address(n))
                .ok_or_else(|| {
                    FpgactlError::Topology(format!(
                        "physfn of {address} points to {pf_path:?}, which is not a PCI device"
                    ))
                })?
                .to_string();
            if pf_path.join("physfn").exists() {
                return Err(FpgactlError::Topology(format!(
                    "physical function {pf_address} of {address} is itself a virtual function"
                )));
            }
            trace!("{address} is a virtual function of {pf_address}");
            Some(Box::new(PciDevice {
                sysfs_path: pf_path,
                address: pf_address,
                physfn: None,
            }))
        } else {
            None
        };

        Ok(PciDevice {
            sysfs_path: pci_path,
            address,
            physfn,
        })
    }

    pub fn sysfs_path(&self) -> &Path {
        &self.sysfs_path
    }

    /// PCI address, e.g. `0000:5e:00.0`.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The physical function, `None` when this is one.
    pub fn physical_function(&self) -> Option<&PciDevice> {
        self.physfn.as_deref()
    }

    /// The function that hosts the FME subtree: the physical function for a VF, otherwise self.
    pub fn host_function(&self) -> &PciDevice {
        self.physical_function().unwrap_or(self)
    }

    pub fn is_virtual_function(&self) -> bool {
        self.physfn.is_some()
    }
}
