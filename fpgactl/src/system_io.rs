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

//! Error Wrapping File System I/O Helpers
//!
//! Thin wrappers around the standard file system calls the core needs to walk sysfs and
//! `/dev`. Every function traces what it touches and converts failures into an
//! [`FpgactlError`] carrying the offending path.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use fpgactl::system_io::{fs_read_trimmed, fs_canonicalize};
//! # use std::path::Path;
//! # fn example() -> Result<(), fpgactl::error::FpgactlError> {
//! let id = fs_read_trimmed(Path::new("/sys/class/fpga/intel-fpga-dev.0/intel-fpga-port.0/id"))?;
//! let node = fs_canonicalize(Path::new("/dev/char/241:0"))?;
//! # Ok(())
//! # }
//! ```

use crate::error::FpgactlError;
use log::trace;
use std::fs::OpenOptions;
use std::io::Read;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

/// Read the contents of a file to a String.
///
/// # Returns: `Result<String, FpgactlError>`
/// * `Ok(String)` - The complete contents of the file
/// * `Err(FpgactlError::IORead)` - If the file cannot be read (doesn't exist, permissions, etc.)
pub fn fs_read(file_path: &Path) -> Result<String, FpgactlError> {
    trace!("Attempting to read from {file_path:?}");
    let mut buf: String = String::new();
    let result = OpenOptions::new()
        .read(true)
        .open(file_path)
        .and_then(|mut f| f.read_to_string(&mut buf));

    match result {
        Ok(_) => {
            trace!("Reading done");
            Ok(buf)
        }
        Err(e) => Err(FpgactlError::IORead {
            file: file_path.into(),
            e,
        }),
    }
}

/// Read a sysfs attribute file, dropping surrounding whitespace and the trailing newline
/// (and the NUL terminator some drivers leave behind).
pub fn fs_read_trimmed(file_path: &Path) -> Result<String, FpgactlError> {
    fs_read(file_path).map(|s| s.trim_end_matches('\0').trim().to_string())
}

/// Read the contents of a directory and return entry names (not full paths).
///
/// Entries that cannot be read are silently skipped.
///
/// # Returns: `Result<Vec<String>, FpgactlError>`
/// * `Ok(Vec<String>)` - List of entry names in the directory
/// * `Err(FpgactlError::IOReadDir)` - If the directory cannot be read
pub fn fs_read_dir(dir: &Path) -> Result<Vec<String>, FpgactlError> {
    trace!("Attempting to read directory '{dir:?}'");
    std::fs::read_dir(dir).map_or_else(
        |e| {
            Err(FpgactlError::IOReadDir {
                dir: dir.to_owned(),
                e,
            })
        },
        |iter| {
            let ret = iter
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect();
            trace!("Dir reading done.");
            Ok(ret)
        },
    )
}

/// Evaluate every symlink in `path` and return the absolute target.
///
/// # Returns: `Result<PathBuf, FpgactlError>`
/// * `Ok(PathBuf)` - Canonical path
/// * `Err(FpgactlError::IOReadLink)` - A component is missing or a link dangles
pub fn fs_canonicalize(path: &Path) -> Result<PathBuf, FpgactlError> {
    trace!("Evaluating symlinks of {path:?}");
    std::fs::canonicalize(path).map_err(|e| FpgactlError::IOReadLink {
        path: path.to_owned(),
        e,
    })
}

/// Kind of a device node, as used in `/sys/dev/<kind>/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Char,
    Block,
}

impl DeviceKind {
    pub fn sysfs_dir_name(&self) -> &'static str {
        match self {
            DeviceKind::Char => "char",
            DeviceKind::Block => "block",
        }
    }
}

/// Device number of a node, split the way the kernel prints it in `dev` attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceNumber {
    pub kind: DeviceKind,
    pub major: u32,
    pub minor: u32,
}

impl std::fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// Stat `path` and return its device number.
///
/// # Returns: `Result<DeviceNumber, FpgactlError>`
/// * `Ok(DeviceNumber)` - `path` is a character or block device node
/// * `Err(FpgactlError::IOStat)` - `path` could not be stat'ed
/// * `Err(FpgactlError::SysfsResolution)` - `path` exists but is not a device node
pub fn fs_device_number(path: &Path) -> Result<DeviceNumber, FpgactlError> {
    trace!("Attempting to stat {path:?}");
    let metadata = std::fs::metadata(path).map_err(|e| FpgactlError::IOStat {
        path: path.to_owned(),
        e,
    })?;
    let file_type = metadata.file_type();
    let kind = if file_type.is_char_device() {
        DeviceKind::Char
    } else if file_type.is_block_device() {
        DeviceKind::Block
    } else {
        return Err(FpgactlError::SysfsResolution(format!(
            "{path:?} is not a device node"
        )));
    };
    let rdev = metadata.rdev() as libc::dev_t;
    Ok(DeviceNumber {
        kind,
        major: libc::major(rdev),
        minor: libc::minor(rdev),
    })
}
