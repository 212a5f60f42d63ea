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

//! Ioctl protocol layer for the Intel FPGA driver.
//!
//! Request structures mirror `include/uapi/linux/intel-fpga.h` field for field. Every
//! structure starts with `argsz`, which is set to the structure's size before each call.
//! This module is the only place where a request structure or a bitstream buffer is turned
//! into a raw address.

use crate::error::FpgactlError;
use log::debug;
use std::ffi::c_void;
use std::fs::{File, OpenOptions};
use std::io;
use std::mem::size_of;
use std::os::fd::AsRawFd;
use std::os::raw::c_ulong;
use std::path::{Path, PathBuf};

/// `_IO(type, nr)`: no direction and no size bits, the argument is passed through untouched.
const fn io(ty: u8, nr: u8) -> c_ulong {
    ((ty as c_ulong) << 8) | (nr as c_ulong)
}

pub const FPGA_MAGIC: u8 = 0xB6;
const FPGA_BASE: u8 = 0;
const PORT_BASE: u8 = 0x40;
const FME_BASE: u8 = 0x80;

/// The only driver API version this layer speaks.
pub const FPGA_API_VERSION: i32 = 0;

pub const FPGA_GET_API_VERSION: c_ulong = io(FPGA_MAGIC, FPGA_BASE);
pub const FPGA_CHECK_EXTENSION: c_ulong = io(FPGA_MAGIC, FPGA_BASE + 1);
pub const FPGA_PORT_RESET: c_ulong = io(FPGA_MAGIC, PORT_BASE);
pub const FPGA_PORT_GET_INFO: c_ulong = io(FPGA_MAGIC, PORT_BASE + 1);
pub const FPGA_PORT_GET_REGION_INFO: c_ulong = io(FPGA_MAGIC, PORT_BASE + 2);
pub const FPGA_FME_PORT_PR: c_ulong = io(FPGA_MAGIC, FME_BASE);
pub const FPGA_FME_PORT_RELEASE: c_ulong = io(FPGA_MAGIC, FME_BASE + 4);
pub const FPGA_FME_PORT_ASSIGN: c_ulong = io(FPGA_MAGIC, FME_BASE + 5);

pub const FPGA_REGION_READ: u32 = 1 << 0;
pub const FPGA_REGION_WRITE: u32 = 1 << 1;
pub const FPGA_REGION_MMAP: u32 = 1 << 2;

pub const FPGA_PORT_INDEX_AFU: u32 = 0;
pub const FPGA_PORT_INDEX_STP: u32 = 1;

/// Size header alone, for requests with no payload of their own.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArgSize {
    pub argsz: u32,
}

/// `struct fpga_port_info`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PortInfoArg {
    pub argsz: u32,
    pub flags: u32,
    pub num_regions: u32,
    pub num_umsgs: u32,
}

/// `struct fpga_port_region_info`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PortRegionInfoArg {
    pub argsz: u32,
    pub flags: u32,
    pub index: u32,
    pub padding: u32,
    pub size: u64,
    pub offset: u64,
}

/// `struct fpga_fme_port_pr`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FmePortPrArg {
    pub argsz: u32,
    pub flags: u32,
    pub port_id: u32,
    pub buffer_size: u32,
    pub buffer_address: u64,
    pub status: u64,
}

/// `struct fpga_fme_port_release` and `struct fpga_fme_port_assign`, which share a layout.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FmePortIdArg {
    pub argsz: u32,
    pub flags: u32,
    pub port_id: u32,
}

fn argsz<T>() -> u32 {
    size_of::<T>() as u32
}

/// The driver requests this layer issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    GetApiVersion,
    CheckExtension,
    PortReset,
    PortGetInfo,
    PortGetRegionInfo,
    FmePortPr,
    FmePortRelease,
    FmePortAssign,
}

impl Request {
    pub const fn code(self) -> c_ulong {
        match self {
            Request::GetApiVersion => FPGA_GET_API_VERSION,
            Request::CheckExtension => FPGA_CHECK_EXTENSION,
            Request::PortReset => FPGA_PORT_RESET,
            Request::PortGetInfo => FPGA_PORT_GET_INFO,
            Request::PortGetRegionInfo => FPGA_PORT_GET_REGION_INFO,
            Request::FmePortPr => FPGA_FME_PORT_PR,
            Request::FmePortRelease => FPGA_FME_PORT_RELEASE,
            Request::FmePortAssign => FPGA_FME_PORT_ASSIGN,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Request::GetApiVersion => "FPGA_GET_API_VERSION",
            Request::CheckExtension => "FPGA_CHECK_EXTENSION",
            Request::PortReset => "FPGA_PORT_RESET",
            Request::PortGetInfo => "FPGA_PORT_GET_INFO",
            Request::PortGetRegionInfo => "FPGA_PORT_GET_REGION_INFO",
            Request::FmePortPr => "FPGA_FME_PORT_PR",
            Request::FmePortRelease => "FPGA_FME_PORT_RELEASE",
            Request::FmePortAssign => "FPGA_FME_PORT_ASSIGN",
        }
    }

    /// Requests that change which image is loaded on a port, or whether it is attached.
    pub const fn is_mutating(self) -> bool {
        matches!(
            self,
            Request::FmePortPr | Request::FmePortRelease | Request::FmePortAssign
        )
    }
}

/// The request structure handed to the driver, borrowed for the duration of one call.
#[derive(Debug)]
pub enum Payload<'a> {
    Header(&'a mut ArgSize),
    PortInfo(&'a mut PortInfoArg),
    RegionInfo(&'a mut PortRegionInfoArg),
    PortPr(&'a mut FmePortPrArg),
    PortId(&'a mut FmePortIdArg),
}

impl Payload<'_> {
    fn as_mut_ptr(&mut self) -> *mut c_void {
        match self {
            Payload::Header(arg) => &mut **arg as *mut ArgSize as *mut c_void,
            Payload::PortInfo(arg) => &mut **arg as *mut PortInfoArg as *mut c_void,
            Payload::RegionInfo(arg) => &mut **arg as *mut PortRegionInfoArg as *mut c_void,
            Payload::PortPr(arg) => &mut **arg as *mut FmePortPrArg as *mut c_void,
            Payload::PortId(arg) => &mut **arg as *mut FmePortIdArg as *mut c_void,
        }
    }
}

/// An open device node that accepts driver requests.
///
/// Callers serialize requests per handle; implementations need no locking of their own.
pub trait DeviceHandle: Send + Sync {
    /// Issue `request` with `payload`.
    ///
    /// # Returns: `io::Result<i32>`
    /// * `Ok(i32)` - the driver's non-negative return value
    /// * `Err(io::Error)` - the driver's errno, untranslated
    fn ioctl(&self, request: Request, payload: Payload<'_>) -> io::Result<i32>;
}

/// A device node opened read/write, talking to the kernel through `ioctl(2)`.
#[derive(Debug)]
pub struct DevNode {
    file: File,
}

impl DevNode {
    pub fn open(dev_path: &Path) -> Result<DevNode, FpgactlError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(dev_path)
            .map_err(|e| FpgactlError::IORead {
                file: dev_path.to_owned(),
                e,
            })?;
        Ok(DevNode { file })
    }
}

impl DeviceHandle for DevNode {
    fn ioctl(&self, request: Request, mut payload: Payload<'_>) -> io::Result<i32> {
        let arg = payload.as_mut_ptr();
        // SAFETY: the fd stays open for the lifetime of `self`, `arg` points at a live,
        // exclusively borrowed repr(C) structure whose argsz matches its size, and any buffer
        // address inside it comes from a slice borrowed by the caller for this whole call.
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), request.code() as _, arg) };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret)
        }
    }
}

/// Capabilities of a port, from `FPGA_PORT_GET_INFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortInfo {
    pub flags: u32,
    pub regions: u32,
    pub umsgs: u32,
}

/// One MMIO region of a port, from `FPGA_PORT_GET_REGION_INFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRegionInfo {
    pub flags: u32,
    pub index: u32,
    pub offset: u64,
    pub size: u64,
}

fn issue(
    handle: &dyn DeviceHandle,
    device: &Path,
    request: Request,
    payload: Payload<'_>,
) -> Result<i32, FpgactlError> {
    debug!("Issuing {} on {device:?}", request.name());
    handle
        .ioctl(request, payload)
        .map_err(|e| FpgactlError::Driver {
            request: request.name(),
            device: PathBuf::from(device),
            e,
        })
}

/// Report the version of the driver API.
pub fn api_version(handle: &dyn DeviceHandle, device: &Path) -> Result<i32, FpgactlError> {
    let mut arg = ArgSize {
        argsz: argsz::<ArgSize>(),
    };
    issue(handle, device, Request::GetApiVersion, Payload::Header(&mut arg))
}

/// Check whether an extension is supported. 0 means not supported.
pub fn check_extension(handle: &dyn DeviceHandle, device: &Path) -> Result<i32, FpgactlError> {
    let mut arg = ArgSize {
        argsz: argsz::<ArgSize>(),
    };
    issue(handle, device, Request::CheckExtension, Payload::Header(&mut arg))
}

/// Reset a port and its AFU.
///
/// Can be done at any time, e.g. during DMA or PR. It never causes a system level issue, only a
/// recoverable functional failure of whatever was in flight.
pub fn port_reset(handle: &dyn DeviceHandle, device: &Path) -> Result<(), FpgactlError> {
    let mut arg = ArgSize {
        argsz: argsz::<ArgSize>(),
    };
    issue(handle, device, Request::PortReset, Payload::Header(&mut arg)).map(|_| ())
}

pub fn port_info(handle: &dyn DeviceHandle, device: &Path) -> Result<PortInfo, FpgactlError> {
    let mut arg = PortInfoArg {
        argsz: argsz::<PortInfoArg>(),
        ..Default::default()
    };
    issue(handle, device, Request::PortGetInfo, Payload::PortInfo(&mut arg))?;
    Ok(PortInfo {
        flags: arg.flags,
        regions: arg.num_regions,
        umsgs: arg.num_umsgs,
    })
}

/// Describe the memory region `index` of a port. The driver fills every field but `index`.
pub fn port_region_info(
    handle: &dyn DeviceHandle,
    device: &Path,
    index: u32,
) -> Result<PortRegionInfo, FpgactlError> {
    let mut arg = PortRegionInfoArg {
        argsz: argsz::<PortRegionInfoArg>(),
        index,
        ..Default::default()
    };
    issue(handle, device, Request::PortGetRegionInfo, Payload::RegionInfo(&mut arg))?;
    Ok(PortRegionInfo {
        flags: arg.flags,
        index: arg.index,
        offset: arg.offset,
        size: arg.size,
    })
}

/// Program `bitstream` onto port `port_id` through the FME at `device`.
///
/// `EIO` means the hardware detected an error while programming; the driver's `status` word is
/// kept in [`FpgactlError::Programming`]. `EINVAL` means the request itself was rejected.
pub fn fme_port_pr(
    handle: &dyn DeviceHandle,
    device: &Path,
    port_id: u32,
    bitstream: &[u8],
) -> Result<(), FpgactlError> {
    if bitstream.is_empty() {
        return Err(FpgactlError::EmptyPayload { port_id });
    }
    let buffer_size = u32::try_from(bitstream.len()).map_err(|_| {
        FpgactlError::Argument(format!(
            "bitstream of {} bytes does not fit the driver's 32 bit size field",
            bitstream.len()
        ))
    })?;
    let mut arg = FmePortPrArg {
        argsz: argsz::<FmePortPrArg>(),
        port_id,
        buffer_size,
        buffer_address: bitstream.as_ptr() as u64,
        ..Default::default()
    };
    debug!("Issuing {} on {device:?}", Request::FmePortPr.name());
    match handle.ioctl(Request::FmePortPr, Payload::PortPr(&mut arg)) {
        Ok(_) => Ok(()),
        Err(e) => match e.raw_os_error() {
            Some(libc::EIO) => Err(FpgactlError::Programming {
                port_id,
                status: arg.status,
                e,
            }),
            Some(libc::EINVAL) => Err(FpgactlError::PrParameter { port_id, e }),
            _ => Err(FpgactlError::Driver {
                request: Request::FmePortPr.name(),
                device: PathBuf::from(device),
                e,
            }),
        },
    }
}

/// Detach port `port_id` from its host interface so it can be programmed.
pub fn fme_port_release(
    handle: &dyn DeviceHandle,
    device: &Path,
    port_id: u32,
) -> Result<(), FpgactlError> {
    let mut arg = FmePortIdArg {
        argsz: argsz::<FmePortIdArg>(),
        port_id,
        ..Default::default()
    };
    issue(handle, device, Request::FmePortRelease, Payload::PortId(&mut arg)).map(|_| ())
}

/// Attach port `port_id` back to its host interface.
pub fn fme_port_assign(
    handle: &dyn DeviceHandle,
    device: &Path,
    port_id: u32,
) -> Result<(), FpgactlError> {
    let mut arg = FmePortIdArg {
        argsz: argsz::<FmePortIdArg>(),
        port_id,
        ..Default::default()
    };
    issue(handle, device, Request::FmePortAssign, Payload::PortId(&mut arg)).map(|_| ())
}
