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
use fpgactl::reconfigure::{PrReport, RawBitstream};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub struct PrRequest {
    pub port: PathBuf,
    pub file: PathBuf,
    pub interface_uuid: String,
    pub afu_uuid: Option<String>,
    pub dry_run: bool,
}

fn report_message(report: &PrReport) -> String {
    match (&report.accelerator_type_uuid, report.dry_run) {
        (_, true) => format!(
            "port {} can be programmed through {}",
            report.port_id,
            report.fme.display()
        ),
        (Some(afu), false) => format!(
            "port {} programmed through {}, accelerator {afu}",
            report.port_id,
            report.fme.display()
        ),
        (None, false) => format!(
            "port {} programmed through {}",
            report.port_id,
            report.fme.display()
        ),
    }
}

fn program(backend: Arc<dyn DeviceBackend>, request: PrRequest) -> Result<String, FpgactlError> {
    let mut bitstream = RawBitstream::from_file(request.interface_uuid, &request.file)?;
    if let Some(afu) = request.afu_uuid {
        bitstream = bitstream.with_accelerator_type_uuid(afu);
    }
    let mut port = IntelFpgaPort::open(backend, &request.port)?;
    info!(
        "{} {:?} on {}",
        if request.dry_run { "Checking" } else { "Programming" },
        request.file,
        port.name()
    );
    let report = port.pr(&bitstream, request.dry_run);
    port.close();
    Ok(report_message(&report?))
}

/// Argument parser for the pr command.
///
/// With `timeout_secs` the command stops waiting after that long. The worker is left to finish
/// on its own, since interrupting the driver mid-sequence could leave the port released.
pub async fn pr_handler(
    backend: Arc<dyn DeviceBackend>,
    request: PrRequest,
    timeout_secs: Option<u64>,
) -> Result<String, FpgactlError> {
    let port = request.port.clone();
    let work = run_blocking(move || program(backend, request));
    match timeout_secs {
        None => work.await,
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), work)
            .await
            .map_err(|_| {
                FpgactlError::Internal(format!(
                    "gave up waiting for {port:?} after {secs}s, programming may still complete"
                ))
            })?,
    }
}
