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

//! FPGA device entities.
//!
//! A card exposes one FPGA Management Engine (FME) per physical function and one Port per
//! reconfigurable accelerator slot. [`device`] defines the capability traits both kinds share,
//! [`intel`] and [`intel_components`] implement them for the Intel FPGA driver.

pub mod device;
pub mod intel;
pub mod intel_components;
