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
use fpgactl::devices::device::{FpgaDevice, Fme};
use fpgactl::devices::intel_components::intel_fme::IntelFpgaFme;
use fpgactl::error::FpgactlError;
use std::path::PathBuf;
use std::sync::Arc;

/// `socket_id` is printed as `n/a` on drivers that do not publish it.
fn socket_text(fme: &IntelFpgaFme) -> Result<String, FpgactlError> {
    match fme.socket_id() {
        Ok(socket) => Ok(socket.to_string()),
        Err(FpgactlError::NotAvailable(_)) => Ok("n/a".to_string()),
        Err(e) => Err(e),
    }
}

/// Identity and capabilities of one FME as an ascii table.
fn fme_message(fme: &IntelFpgaFme) -> Result<String, FpgactlError> {
    let pci = fme.pci_device()?;
    Ok(format!(
        "---- FME ----\n\
        | name | {} |\n\
        | node | {} |\n\
        | dev | {} |\n\
        | pci | {} |\n\
        | api version | {} |\n\
        | bitstream id | {} |\n\
        | bitstream metadata | {} |\n\
        | interface uuid | {} |\n\
        | ports | {} |\n\
        | socket | {} |",
        fme.name(),
        fme.dev_path().display(),
        fme.dev()?,
        pci.address(),
        fme.api_version()?,
        fme.bitstream_id()?,
        fme.bitstream_metadata()?,
        fme.interface_uuid()?,
        fme.ports_num()?,
        socket_text(fme)?,
    ))
}

/// Argument parser for the fme command
pub async fn fme_handler(
    backend: Arc<dyn DeviceBackend>,
    device: PathBuf,
) -> Result<String, FpgactlError> {
    run_blocking(move || {
        let mut fme = IntelFpgaFme::open(backend, &device)?;
        let message = fme_message(&fme);
        fme.close();
        message
    })
    .await
}
