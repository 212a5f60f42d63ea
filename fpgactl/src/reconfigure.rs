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

//! Partial reconfiguration of a port.
//!
//! Reprogramming runs in three driver steps on the port's FME, strictly in this order:
//! 1. release the port from its host interface
//! 2. program the bitstream
//! 3. assign the port back
//!
//! Between 1 and 3 the port is detached, so callers must not issue other requests against the
//! same port meanwhile. A failed release stops the sequence with nothing changed. A failed
//! program step is still followed by an assign so the port is not left detached; the programming
//! error is what gets reported, with the assign failure attached if that fails too.
//!
//! Before any of this, and as the whole of a dry run, the request is validated: the bitstream is
//! not empty, the FME can be found and speaks the expected driver API, and the bitstream was built
//! for the FME's PR interface.

use crate::devices::device::{FpgaDevice, Fme, Port};
use crate::error::{FpgactlError, ReconfigurationStep};
use crate::ioctl::FPGA_API_VERSION;
use crate::system_io::fs_read;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// A bitstream as produced by a container parser. This layer never looks inside the data.
pub trait Bitstream {
    /// PR interface UUID the bitstream was built against.
    fn interface_uuid(&self) -> &str;

    /// UUID of the accelerator the bitstream contains, when the container declares it.
    fn accelerator_type_uuid(&self) -> Option<&str>;

    /// The bytes handed to the driver.
    fn raw_bitstream_data(&self) -> &[u8];
}

/// A bitstream already extracted from its container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBitstream {
    interface_uuid: String,
    accelerator_type_uuid: Option<String>,
    data: Vec<u8>,
}

impl RawBitstream {
    pub fn new(interface_uuid: impl Into<String>, data: Vec<u8>) -> Self {
        RawBitstream {
            interface_uuid: interface_uuid.into(),
            accelerator_type_uuid: None,
            data,
        }
    }

    pub fn with_accelerator_type_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.accelerator_type_uuid = Some(uuid.into());
        self
    }

    /// Load raw bitstream bytes from `path`.
    pub fn from_file(
        interface_uuid: impl Into<String>,
        path: &Path,
    ) -> Result<RawBitstream, FpgactlError> {
        let data = std::fs::read(path).map_err(|e| FpgactlError::IORead {
            file: path.to_owned(),
            e,
        })?;
        Ok(RawBitstream::new(interface_uuid, data))
    }

    /// Load raw bitstream bytes from `path`, taking the interface UUID from the text file
    /// `interface_file`.
    pub fn from_files(interface_file: &Path, path: &Path) -> Result<RawBitstream, FpgactlError> {
        RawBitstream::from_file(fs_read(interface_file)?.trim(), path)
    }
}

impl Bitstream for RawBitstream {
    fn interface_uuid(&self) -> &str {
        &self.interface_uuid
    }

    fn accelerator_type_uuid(&self) -> Option<&str> {
        self.accelerator_type_uuid.as_deref()
    }

    fn raw_bitstream_data(&self) -> &[u8] {
        &self.data
    }
}

/// What a reconfiguration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrReport {
    pub port_id: u32,
    /// Node of the FME that programmed (or would program) the port.
    pub fme: PathBuf,
    pub dry_run: bool,
    /// `afu_id` of the port after programming. `None` for a dry run, or when it could not be
    /// read back and the bitstream declared no accelerator.
    pub accelerator_type_uuid: Option<String>,
}

/// UUIDs are printed with and without dashes, in either case, depending on the source.
pub fn normalize_uuid(uuid: &str) -> String {
    uuid.trim()
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn failed(step: ReconfigurationStep, port_id: u32, e: FpgactlError) -> FpgactlError {
    FpgactlError::Reconfiguration {
        step,
        port_id,
        source: Box::new(e),
        recovery: None,
    }
}

/// Reprogram `port` with `bitstream`, or only validate the request when `dry_run` is set.
///
/// # Returns: `Result<PrReport, FpgactlError>`
/// * `Ok(PrReport)` - the port was programmed (or would be)
/// * `Err(FpgactlError::EmptyPayload)` - the bitstream is empty; no request was issued
/// * `Err(FpgactlError::Incompatible)` - the bitstream does not fit the FME's PR interface
/// * `Err(FpgactlError::UnsupportedApi)` - the FME driver speaks another API version
/// * `Err(FpgactlError::Reconfiguration)` - a driver step failed; names the step
pub fn program_port(
    port: &dyn Port,
    bitstream: &dyn Bitstream,
    dry_run: bool,
) -> Result<PrReport, FpgactlError> {
    let port_id = port.port_id()?;
    let data = bitstream.raw_bitstream_data();
    if data.is_empty() {
        return Err(FpgactlError::EmptyPayload { port_id });
    }

    let fme = port.fme()?;
    let version = fme.api_version()?;
    if version != FPGA_API_VERSION {
        return Err(FpgactlError::UnsupportedApi {
            device: fme.dev_path().to_owned(),
            version,
            expected: FPGA_API_VERSION,
        });
    }
    let interface_uuid = fme.interface_uuid()?;
    if normalize_uuid(interface_uuid) != normalize_uuid(bitstream.interface_uuid()) {
        return Err(FpgactlError::Incompatible(format!(
            "FME interface UUID '{interface_uuid}' is not compatible with bitstream interface \
            UUID '{}'",
            bitstream.interface_uuid()
        )));
    }
    debug!(
        "{} accepts a {} byte bitstream for port {port_id}",
        fme.name(),
        data.len()
    );

    let mut report = PrReport {
        port_id,
        fme: fme.dev_path().to_owned(),
        dry_run,
        accelerator_type_uuid: None,
    };
    if dry_run {
        info!("Dry run: {} can be programmed through {}", port.name(), fme.name());
        return Ok(report);
    }

    fme.port_release(port_id)
        .map_err(|e| failed(ReconfigurationStep::Release, port_id, e))?;
    if let Err(e) = fme.port_pr(port_id, data) {
        return Err(FpgactlError::Reconfiguration {
            step: ReconfigurationStep::Program,
            port_id,
            source: Box::new(e),
            recovery: fme.port_assign(port_id).err().map(Box::new),
        });
    }
    fme.port_assign(port_id)
        .map_err(|e| failed(ReconfigurationStep::Assign, port_id, e))?;

    let Some(expected) = bitstream.accelerator_type_uuid() else {
        report.accelerator_type_uuid = port.accelerator_type_uuid().ok();
        info!("Programmed {}", port.name());
        return Ok(report);
    };
    let loaded = port
        .accelerator_type_uuid()
        .map_err(|e| failed(ReconfigurationStep::Verify, port_id, e))?;
    if normalize_uuid(expected) != normalize_uuid(&loaded) {
        return Err(failed(
            ReconfigurationStep::Verify,
            port_id,
            FpgactlError::Incompatible(format!(
                "port {port_id} reports accelerator '{loaded}' after programming, expected \
                '{expected}'"
            )),
        ));
    }
    info!("{} now runs accelerator {loaded}", port.name());
    report.accelerator_type_uuid = Some(loaded);
    Ok(report)
}
