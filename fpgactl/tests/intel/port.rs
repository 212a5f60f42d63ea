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

use crate::common::{AFU_UUID, INTERFACE_UUID, REGION_SIZE, TestSystem, write_attr};
use fpgactl::devices::device::{FpgaDevice, Port};
use fpgactl::devices::intel_components::intel_port::IntelFpgaPort;
use fpgactl::ioctl::{
    FPGA_PORT_INDEX_STP, FPGA_REGION_MMAP, FPGA_REGION_READ, FPGA_REGION_WRITE, PortInfo,
    PortRegionInfo, Request,
};
use googletest::prelude::*;
use rstest::*;

#[gtest]
fn reads_the_attribute_set_on_open() {
    let sys = TestSystem::new();
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    expect_that!(port.name(), eq("intel-fpga-port.0"));
    expect_that!(port.port_id(), ok(eq(&0)));
    expect_that!(port.dev(), ok(eq(&"240:0")));
    expect_that!(port.accelerator_type_uuid(), ok(eq(&AFU_UUID.to_string())));
    expect_that!(port.has_fme(), eq(false));
    expect_that!(sys.fake.opens_of(&sys.fme_node), eq(0));
}

#[gtest]
fn accelerator_uuid_follows_sysfs() {
    let sys = TestSystem::new();
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    write_attr(&sys.pf_port_dir, "afu_id", "00000000000000000000000000000001");
    expect_that!(
        port.accelerator_type_uuid(),
        ok(eq(&"00000000000000000000000000000001".to_string()))
    );
}

#[gtest]
fn fme_node_is_not_a_port() {
    let sys = TestSystem::new();
    let res = IntelFpgaPort::open(sys.backend(), &sys.fme_node);
    expect_that!(res, err(displays_as(contains_substring("FpgactlError::DeviceClass"))));
}

#[gtest]
#[rstest]
#[case::physical_function(false)]
#[case::virtual_function(true)]
fn resolves_the_fme_of_the_physical_function(#[case] vf: bool) {
    let sys = TestSystem::new();
    let node = if vf { &sys.vf_port_node } else { &sys.pf_port_node };
    let port = IntelFpgaPort::open(sys.backend(), node).expect("open failed");
    expect_that!(
        port.pci_device().map(|p| p.is_virtual_function()),
        ok(eq(&vf))
    );

    let fme = port.fme().expect("FME not found");
    expect_that!(fme.dev_path(), eq(sys.fme_node.as_path()));
    expect_that!(fme.sysfs_path(), eq(sys.fme_dir.as_path()));
    expect_that!(
        fme.pci_device().map(|p| p.address().to_string()),
        ok(eq(&"0000:5e:00.0".to_string()))
    );
    expect_that!(port.interface_uuid(), ok(eq(&INTERFACE_UUID)));
}

#[gtest]
fn fme_is_resolved_once() {
    let sys = TestSystem::new();
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    port.fme().expect("FME not found");
    port.interface_uuid().expect("no interface UUID");
    port.fme().expect("FME not found");
    expect_that!(port.has_fme(), eq(true));
    expect_that!(sys.fake.opens_of(&sys.fme_node), eq(1));
}

#[gtest]
fn missing_dev_char_link_is_a_topology_error() {
    let sys = TestSystem::new();
    std::fs::remove_file(sys.dev_char_dir.join("241:0"))
        .expect("failed to remove link");
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    expect_that!(
        port.fme().map(|f| f.name().to_string()),
        err(displays_as(contains_substring("FpgactlError::Topology")))
    );
    expect_that!(port.has_fme(), eq(false));
}

#[gtest]
fn dev_char_link_to_a_non_fme_is_a_topology_error() {
    let sys = TestSystem::new();
    let link = sys.dev_char_dir.join("241:0");
    std::fs::remove_file(&link).expect("failed to remove link");
    std::os::unix::fs::symlink("../intel-fpga-port.0", &link).expect("failed to relink");
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    expect_that!(
        port.fme().map(|f| f.name().to_string()),
        err(displays_as(all!(
            contains_substring("FpgactlError::Topology"),
            contains_substring("FpgactlError::DeviceClass")
        )))
    );
    expect_that!(port.has_fme(), eq(false));
}

#[gtest]
fn close_cascades_to_the_resolved_fme() {
    let sys = TestSystem::new();
    let mut port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    expect_that!(port.intel_fme().map(|f| f.is_open()), ok(eq(&true)));

    port.close();
    expect_that!(port.is_open(), eq(false));
    expect_that!(port.intel_fme().map(|f| f.is_open()), ok(eq(&false)));
    expect_that!(
        port.port_reset(),
        err(displays_as(contains_substring("FpgactlError::Closed")))
    );
    expect_that!(
        port.fme().and_then(|f| f.api_version()),
        err(displays_as(contains_substring("FpgactlError::Closed")))
    );

    port.close();
    expect_that!(port.is_open(), eq(false));
}

#[gtest]
fn close_without_fme_only_closes_the_port() {
    let sys = TestSystem::new();
    let mut port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    port.close();
    expect_that!(port.has_fme(), eq(false));
    expect_that!(sys.fake.opens_of(&sys.fme_node), eq(0));
}

#[gtest]
fn port_requests_decode_driver_replies() {
    let sys = TestSystem::new();
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    expect_that!(port.port_reset(), ok(eq(&())));
    expect_that!(
        port.port_info(),
        ok(eq(&PortInfo {
            flags: 0,
            regions: 2,
            umsgs: 8,
        }))
    );
    expect_that!(
        port.port_region_info(FPGA_PORT_INDEX_STP),
        ok(eq(&PortRegionInfo {
            flags: FPGA_REGION_READ | FPGA_REGION_WRITE | FPGA_REGION_MMAP,
            index: FPGA_PORT_INDEX_STP,
            offset: REGION_SIZE,
            size: REGION_SIZE,
        }))
    );
    expect_that!(
        sys.fake.calls(),
        elements_are![
            eq(&(sys.pf_port_node.clone(), Request::PortReset)),
            eq(&(sys.pf_port_node.clone(), Request::PortGetInfo)),
            eq(&(sys.pf_port_node.clone(), Request::PortGetRegionInfo))
        ]
    );
}

#[gtest]
fn port_reset_failure_names_the_request() {
    let sys = TestSystem::new();
    sys.fake.fail(Request::PortReset, libc::EBUSY);
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    expect_that!(
        port.port_reset(),
        err(displays_as(contains_substring("FPGA_PORT_RESET")))
    );
}
