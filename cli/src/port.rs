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

use crate::blocking::run_blocking;
use fpgactl::backend::DeviceBackend;
use fpgactl::devices::device::{FpgaDevice, Port};
use fpgactl::devices::intel_components::intel_port::IntelFpgaPort;
use fpgactl::error::FpgactlError;
use fpgactl::ioctl::{FPGA_REGION_MMAP, FPGA_REGION_READ, FPGA_REGION_WRITE, PortRegionInfo};
use log::warn;
use std::path::PathBuf;
use std::sync::Arc;

fn region_flags(region: &PortRegionInfo) -> String {
    [
        (FPGA_REGION_READ, 'r'),
        (FPGA_REGION_WRITE, 'w'),
        (FPGA_REGION_MMAP, 'm'),
    ]
    .iter()
    .map(|(bit, c)| if region.flags & bit != 0 { *c } else { '-' })
    .collect()
}

/// A port whose FME is out of reach (e.g. a VF passed into a guest) is still worth describing.
fn fme_text(port: &IntelFpgaPort) -> String {
    match port.fme() {
        Ok(fme) => fme.dev_path().display().to_string(),
        Err(e) => {
            warn!("{e}");
            "n/a".to_string()
        }
    }
}

fn port_message(port: &IntelFpgaPort) -> Result<String, FpgactlError> {
    let pci = port.pci_device()?;
    let info = port.port_info()?;
    let mut ret_string = format!(
        "---- PORT ----\n\
        | name | {} |\n\
        | node | {} |\n\
        | dev | {} |\n\
        | id | {} |\n\
        | pci | {}{} |\n\
        | api version | {} |\n\
        | accelerator | {} |\n\
        | umsgs | {} |\n\
        | fme | {} |\n",
        port.name(),
        port.dev_path().display(),
        port.dev()?,
        port.port_id()?,
        pci.address(),
        if pci.is_virtual_function() { " (vf)" } else { "" },
        port.api_version()?,
        port.accelerator_type_uuid()?,
        info.umsgs,
        fme_text(port),
    );
    ret_string += "\n---- REGIONS ----\n\
                   | index | flags | offset | size |";
    for index in 0..info.regions {
        let region = port.port_region_info(index)?;
        ret_string += format!(
            "\n| {} | {} | 0x{:x} | 0x{:x} |",
            region.index,
            region_flags(&region),
            region.offset,
            region.size
        )
        .as_str();
    }
    Ok(ret_string)
}

/// Argument parser for the port command
pub async fn port_handler(
    backend: Arc<dyn DeviceBackend>,
    device: PathBuf,
) -> Result<String, FpgactlError> {
    run_blocking(move || {
        let mut port = IntelFpgaPort::open(backend, &device)?;
        let message = port_message(&port);
        port.close();
        message
    })
    .await
}

/// Argument parser for the reset command
pub async fn reset_handler(
    backend: Arc<dyn DeviceBackend>,
    device: PathBuf,
) -> Result<String, FpgactlError> {
    run_blocking(move || {
        let mut port = IntelFpgaPort::open(backend, &device)?;
        let res = port.port_reset();
        port.close();
        res.map(|_| format!("{} reset", port.name()))
    })
    .await
}
