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

//! fpgactl - inspect and reprogram Intel FPGA management engines and ports.
//!
//! The Intel FPGA driver exposes each card as two kinds of character device:
//! - an **FME** (FPGA Management Engine, `intel-fpga-fme.N`) that owns the card and performs
//!   partial reconfiguration
//! - one **port** per reconfigurable region (`intel-fpga-port.N`), which hosts an accelerator
//!   (AFU) and may sit behind an SR-IOV virtual function
//!
//! Devices are opened by node path ([`IntelFpgaFme::open`], [`IntelFpgaPort::open`]), which
//! resolves the node to its sysfs directory, checks the device class, and reads the static
//! attributes once. A port finds its FME through the physical function of its PCI device, so a
//! port on a virtual function is programmed by the FME on the parent card.
//!
//! Reprogramming goes through [`Port::pr`], see [`reconfigure`] for the sequence.
//!
//! All filesystem and driver access goes through a [`DeviceBackend`]; [`LinuxBackend`] is the real
//! one, and the roots it reads from are configurable with [`SystemPaths`].
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - the library logs through the `log` facade; the `fpgactl` binary installs
//!   `env_logger` and defaults to `info`
//!
//! [`IntelFpgaFme::open`]: devices::intel_components::intel_fme::IntelFpgaFme::open
//! [`IntelFpgaPort::open`]: devices::intel_components::intel_port::IntelFpgaPort::open
//! [`Port::pr`]: devices::device::Port::pr
//! [`DeviceBackend`]: backend::DeviceBackend
//! [`LinuxBackend`]: backend::LinuxBackend
//! [`SystemPaths`]: config::SystemPaths

pub mod backend;
pub mod config;
pub mod devices;
pub mod error;
pub mod ioctl;
pub mod pci;
pub mod reconfigure;
pub mod sysfs;
pub mod system_io;
