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

//! Sysfs attribute resolution.
//!
//! Device nodes are mapped onto their sysfs directory through the kernel's device-number
//! index (`/sys/dev/char/<major>:<minor>`), and attributes are read from that directory as
//! whole sets: either every requested file is read, or the caller gets an error and nothing.
//!
//! # A sysfs map of an Intel FPGA card
//!
//! ```text
//! /sys/devices/pci0000:5e/0000:5e:00.0
//! ├── fpga
//! │   └── intel-fpga-dev.0
//! │       ├── intel-fpga-fme.0
//! │       │   ├── bitstream_id
//! │       │   ├── bitstream_metadata
//! │       │   ├── dev
//! │       │   ├── ports_num
//! │       │   ├── pr
//! │       │   │   └── interface_id
//! │       │   └── socket_id
//! │       └── intel-fpga-port.0
//! │           ├── afu_id
//! │           ├── dev
//! │           └── id
//! └── virtfn0 -> ../0000:5e:00.1
//! ```

use crate::config::SystemPaths;
use crate::error::FpgactlError;
use crate::system_io::{fs_canonicalize, fs_device_number, fs_read_dir, fs_read_trimmed};
use log::trace;
use std::path::{Component, Path, PathBuf};

/// Required FME attribute files, in the order [`read_attribute_set`] returns them.
pub static FME_ATTRIBUTES: [&str; 5] = [
    "bitstream_id",
    "bitstream_metadata",
    "dev",
    "ports_num",
    "pr/interface_id",
];

/// Older drivers do not publish the socket of an FME.
pub static FME_SOCKET_ID: &str = "socket_id";

/// Port attribute files, in the order [`read_attribute_set`] returns them.
pub static PORT_ATTRIBUTES: [&str; 3] = ["afu_id", "dev", "id"];

/// Locate the sysfs directory of the device node `dev_path`.
///
/// # Returns: `Result<PathBuf, FpgactlError>`
/// * `Ok(PathBuf)` - canonical sysfs directory, e.g. `/sys/devices/.../intel-fpga-port.0`
/// * `Err(FpgactlError::IOStat)` - `dev_path` does not exist
/// * `Err(FpgactlError::SysfsResolution)` - `dev_path` is not a device node
/// * `Err(FpgactlError::IOReadLink)` - the kernel has no sysfs entry for its device number
pub fn find_sysfs_device(paths: &SystemPaths, dev_path: &Path) -> Result<PathBuf, FpgactlError> {
    let number = fs_device_number(dev_path)?;
    let index = paths
        .sys_dev_dir
        .join(number.kind.sysfs_dir_name())
        .join(number.to_string());
    trace!("{dev_path:?} is {number}, looking up {index:?}");
    fs_canonicalize(&index)
}

/// Match a single path component against a pattern holding at most one `*`.
pub(crate) fn wildcard_match(pattern: &str, name: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == name,
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
    }
}

/// A glob candidate that is missing or not a directory contributes no matches. Anything else,
/// such as a permission error, must not be mistaken for an empty match.
fn is_absent(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
    )
}

/// Expand `pattern` (relative, one `*` allowed per component) under `base` and return the
/// only match.
///
/// Candidates are visited in sorted order so the outcome never depends on directory order.
///
/// # Returns: `Result<PathBuf, FpgactlError>`
/// * `Ok(PathBuf)` - exactly one path matched
/// * `Err(FpgactlError::SysfsResolution)` - no match, or more than one
pub fn resolve_single_match(base: &Path, pattern: &str) -> Result<PathBuf, FpgactlError> {
    let mut candidates = vec![base.to_path_buf()];
    for component in Path::new(pattern).components() {
        let Component::Normal(part) = component else {
            return Err(FpgactlError::Argument(format!(
                "'{pattern}' must be a plain relative pattern"
            )));
        };
        let part = part.to_string_lossy();
        let mut next = Vec::new();
        for dir in &candidates {
            if !part.contains('*') {
                let path = dir.join(part.as_ref());
                if path.exists() {
                    next.push(path);
                }
                continue;
            }
            let mut entries = match fs_read_dir(dir) {
                Ok(entries) => entries,
                Err(FpgactlError::IOReadDir { ref e, .. }) if is_absent(e) => continue,
                Err(e) => return Err(e),
            };
            entries.sort();
            next.extend(
                entries
                    .into_iter()
                    .filter(|entry| wildcard_match(&part, entry))
                    .map(|entry| dir.join(entry)),
            );
        }
        candidates = next;
    }

    match candidates.len() {
        1 => {
            let found = candidates.remove(0);
            trace!("{pattern} under {base:?} resolved to {found:?}");
            Ok(found)
        }
        0 => Err(FpgactlError::SysfsResolution(format!(
            "no entry matching '{pattern}' under {base:?}"
        ))),
        n => Err(FpgactlError::SysfsResolution(format!(
            "{n} entries match '{pattern}' under {base:?}, expected exactly one: {candidates:?}"
        ))),
    }
}

/// Read every attribute named in `names` from `dir`, trimmed, in the same order.
///
/// The set is read atomically from the caller's point of view: a single missing or unreadable
/// file fails the whole call.
pub fn read_attribute_set<const N: usize>(
    dir: &Path,
    names: [&str; N],
) -> Result<[String; N], FpgactlError> {
    trace!("Reading {names:?} from {dir:?}");
    let values = names
        .iter()
        .map(|name| fs_read_trimmed(&dir.join(name)))
        .collect::<Result<Vec<String>, FpgactlError>>()?;
    values
        .try_into()
        .map_err(|_| FpgactlError::Internal(format!("attribute count mismatch in {dir:?}")))
}

/// Read an attribute that a driver may legitimately omit.
///
/// # Returns: `Result<Option<String>, FpgactlError>`
/// * `Ok(None)` - the file does not exist
/// * `Ok(Some(String))` - trimmed contents
/// * `Err(FpgactlError::IORead)` - the file exists but cannot be read
pub fn read_optional_attribute(dir: &Path, name: &str) -> Result<Option<String>, FpgactlError> {
    match fs_read_trimmed(&dir.join(name)) {
        Ok(value) => Ok(Some(value)),
        Err(FpgactlError::IORead { e, .. }) if e.kind() == std::io::ErrorKind::NotFound => {
            trace!("{name} is absent from {dir:?}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
