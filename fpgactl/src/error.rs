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

use std::fmt;
use std::path::PathBuf;

/// The step of the release, program, assign sequence at which a reconfiguration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconfigurationStep {
    Release,
    Program,
    Assign,
    Verify,
}

impl fmt::Display for ReconfigurationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            ReconfigurationStep::Release => "port release",
            ReconfigurationStep::Program => "partial reconfiguration",
            ReconfigurationStep::Assign => "port assign",
            ReconfigurationStep::Verify => "accelerator verification",
        };
        f.write_str(step)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FpgactlError {
    #[error("FpgactlError::DeviceClass: {device:?} ({name}) is not a '{expected}*' device")]
    DeviceClass {
        device: PathBuf,
        name: String,
        expected: &'static str,
    },
    #[error("FpgactlError::SysfsResolution: {0}")]
    SysfsResolution(String),
    #[error("FpgactlError::IORead: An IO error occurred when reading from {file:?}: {e}")]
    IORead { file: PathBuf, e: std::io::Error },
    #[error("FpgactlError::IOReadDir: An IO error occurred when reading directory {dir:?}: {e}")]
    IOReadDir { dir: PathBuf, e: std::io::Error },
    #[error("FpgactlError::IOReadLink: Failed to evaluate symlinks of {path:?}: {e}")]
    IOReadLink { path: PathBuf, e: std::io::Error },
    #[error("FpgactlError::IOStat: Failed to stat {path:?}: {e}")]
    IOStat { path: PathBuf, e: std::io::Error },
    #[error("FpgactlError::AttributeParse: Failed to parse {attribute} value '{value}': {reason}")]
    AttributeParse {
        attribute: &'static str,
        value: String,
        reason: String,
    },
    #[error("FpgactlError::NotAvailable: {0} is not available")]
    NotAvailable(&'static str),
    #[error("FpgactlError::Driver: {request} on {device:?} failed: {e}")]
    Driver {
        request: &'static str,
        device: PathBuf,
        e: std::io::Error,
    },
    #[error(
        "FpgactlError::Programming: hardware reported an error while programming port {port_id} \
        (status 0x{status:x}): {e}"
    )]
    Programming {
        port_id: u32,
        status: u64,
        e: std::io::Error,
    },
    #[error("FpgactlError::PrParameter: driver rejected the request to program port {port_id}: {e}")]
    PrParameter { port_id: u32, e: std::io::Error },
    #[error("FpgactlError::Topology: {0}")]
    Topology(String),
    #[error("FpgactlError::EmptyPayload: refusing to program port {port_id} with an empty bitstream")]
    EmptyPayload { port_id: u32 },
    #[error(
        "FpgactlError::Reconfiguration: {step} failed for port {port_id}: {source}{}",
        recovery_suffix(.recovery)
    )]
    Reconfiguration {
        step: ReconfigurationStep,
        port_id: u32,
        #[source]
        source: Box<FpgactlError>,
        recovery: Option<Box<FpgactlError>>,
    },
    #[error("FpgactlError::Incompatible: {0}")]
    Incompatible(String),
    #[error("FpgactlError::UnsupportedApi: {device:?} reports API version {version}, expected {expected}")]
    UnsupportedApi {
        device: PathBuf,
        version: i32,
        expected: i32,
    },
    #[error("FpgactlError::Closed: {0:?} has already been closed")]
    Closed(PathBuf),
    #[error("FpgactlError::Argument: {0}")]
    Argument(String),
    #[error("FpgactlError::Config: Failed to parse config '{file:?}': {e}")]
    Config { file: PathBuf, e: toml::de::Error },
    #[error("FpgactlError::Internal: An Internal error occurred: {0}")]
    Internal(String),
}

fn recovery_suffix(recovery: &Option<Box<FpgactlError>>) -> String {
    match recovery {
        Some(r) => format!(" (recovery assign also failed: {r})"),
        None => String::new(),
    }
}

impl FpgactlError {
    /// The raw OS error code carried by a failed driver call, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            FpgactlError::Driver { e, .. }
            | FpgactlError::Programming { e, .. }
            | FpgactlError::PrParameter { e, .. } => e.raw_os_error(),
            FpgactlError::Reconfiguration { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}
