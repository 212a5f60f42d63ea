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

use crate::common::{
    BITSTREAM_ID, BITSTREAM_METADATA, FME_DEV, INTERFACE_UUID, TestSystem, remove_attr,
    write_attr,
};
use fpgactl::devices::device::{FpgaDevice, Fme};
use fpgactl::devices::intel_components::intel_fme::IntelFpgaFme;
use fpgactl::error::FpgactlError;
use fpgactl::ioctl::Request;
use googletest::prelude::*;
use rstest::*;

#[gtest]
fn reads_the_attribute_set_on_open() {
    let sys = TestSystem::new();
    let fme = IntelFpgaFme::open(sys.backend(), &sys.fme_node).expect("open failed");
    expect_that!(fme.name(), eq("intel-fpga-fme.0"));
    expect_that!(fme.dev_path(), eq(sys.fme_node.as_path()));
    expect_that!(fme.sysfs_path(), eq(sys.fme_dir.as_path()));
    expect_that!(fme.dev(), ok(eq(&FME_DEV)));
    expect_that!(fme.bitstream_id(), ok(eq(&BITSTREAM_ID)));
    expect_that!(fme.bitstream_metadata(), ok(eq(&BITSTREAM_METADATA)));
    expect_that!(fme.interface_uuid(), ok(eq(&INTERFACE_UUID)));
    expect_that!(fme.ports_num(), ok(eq(&1)));
    expect_that!(fme.socket_id(), ok(eq(&0)));
    let pci = fme.pci_device().expect("no PCI device");
    expect_that!(pci.address(), eq("0000:5e:00.0"));
    expect_that!(pci.is_virtual_function(), eq(false));
}

#[gtest]
fn attributes_are_a_snapshot_taken_at_open() {
    let sys = TestSystem::new();
    let fme = IntelFpgaFme::open(sys.backend(), &sys.fme_node).expect("open failed");
    write_attr(&sys.fme_dir, "bitstream_id", "0xdeadbeef");
    expect_that!(fme.bitstream_id(), ok(eq(&BITSTREAM_ID)));
}

#[gtest]
#[rstest]
#[case::bitstream_id("bitstream_id")]
#[case::bitstream_metadata("bitstream_metadata")]
#[case::dev("dev")]
#[case::ports_num("ports_num")]
#[case::interface_id("pr/interface_id")]
fn missing_required_attribute_fails_open(#[case] attribute: &str) {
    let sys = TestSystem::new();
    remove_attr(&sys.fme_dir, attribute);
    let res = IntelFpgaFme::open(sys.backend(), &sys.fme_node);
    expect_that!(res, err(displays_as(contains_substring("FpgactlError::IORead"))));
    expect_that!(res, err(displays_as(contains_substring(attribute))));
    expect_that!(sys.fake.opens_of(&sys.fme_node), eq(0));
}

#[gtest]
#[rstest]
#[case::absent(None)]
#[case::empty(Some(""))]
fn socket_id_may_be_unavailable(#[case] socket_id: Option<&str>) {
    let sys = TestSystem::new();
    match socket_id {
        Some(value) => write_attr(&sys.fme_dir, "socket_id", value),
        None => remove_attr(&sys.fme_dir, "socket_id"),
    }
    let fme = IntelFpgaFme::open(sys.backend(), &sys.fme_node).expect("open failed");
    expect_that!(
        fme.socket_id(),
        err(displays_as(contains_substring("FpgactlError::NotAvailable")))
    );
    expect_that!(fme.bitstream_id(), ok(eq(&BITSTREAM_ID)));
}

#[gtest]
fn malformed_number_is_a_parse_error() {
    let sys = TestSystem::new();
    write_attr(&sys.fme_dir, "ports_num", "many");
    let fme = IntelFpgaFme::open(sys.backend(), &sys.fme_node).expect("open failed");
    expect_that!(
        fme.ports_num(),
        err(displays_as(contains_substring("FpgactlError::AttributeParse")))
    );
}

#[gtest]
fn port_node_is_not_an_fme() {
    let sys = TestSystem::new();
    let res = IntelFpgaFme::open(sys.backend(), &sys.pf_port_node);
    expect_that!(res, err(displays_as(contains_substring("FpgactlError::DeviceClass"))));
    expect_that!(sys.fake.opens_of(&sys.pf_port_node), eq(0));
}

#[gtest]
fn reopened_entities_are_independent() {
    let sys = TestSystem::new();
    let mut first = IntelFpgaFme::open(sys.backend(), &sys.fme_node).expect("open failed");
    let second = IntelFpgaFme::open(sys.backend(), &sys.fme_node).expect("reopen failed");
    expect_that!(sys.fake.opens_of(&sys.fme_node), eq(2));

    first.close();
    expect_that!(first.is_open(), eq(false));
    expect_that!(second.is_open(), eq(true));
    expect_that!(
        first.api_version(),
        err(displays_as(contains_substring("FpgactlError::Closed")))
    );
    expect_that!(second.api_version(), ok(eq(&0)));
}

#[gtest]
fn close_twice_is_a_no_op() {
    let sys = TestSystem::new();
    let mut fme = IntelFpgaFme::open(sys.backend(), &sys.fme_node).expect("open failed");
    fme.close();
    fme.close();
    expect_that!(fme.is_open(), eq(false));
    expect_that!(fme.bitstream_id(), ok(eq(&BITSTREAM_ID)));
}

#[gtest]
fn requests_go_through_the_fme_node() {
    let sys = TestSystem::new();
    let fme = IntelFpgaFme::open(sys.backend(), &sys.fme_node).expect("open failed");
    expect_that!(fme.api_version(), ok(eq(&0)));
    expect_that!(fme.check_extension(), ok(eq(&0)));
    expect_that!(fme.port_release(0), ok(eq(&())));
    expect_that!(fme.port_assign(0), ok(eq(&())));
    let requests: Vec<Request> = sys.fake.calls().into_iter().map(|(_, r)| r).collect();
    expect_that!(
        requests,
        elements_are![
            eq(&Request::GetApiVersion),
            eq(&Request::CheckExtension),
            eq(&Request::FmePortRelease),
            eq(&Request::FmePortAssign)
        ]
    );
    expect_that!(
        sys.fake.calls().iter().all(|(device, _)| *device == sys.fme_node),
        eq(true)
    );
}

#[gtest]
fn empty_bitstream_is_never_handed_to_the_driver() {
    let sys = TestSystem::new();
    let fme = IntelFpgaFme::open(sys.backend(), &sys.fme_node).expect("open failed");
    let res = fme.port_pr(0, &[]);
    assert!(matches!(res, Err(FpgactlError::EmptyPayload { port_id: 0 })));
    expect_that!(sys.fake.calls(), is_empty());
}

#[gtest]
#[rstest]
#[case::hardware(libc::EIO, "FpgactlError::Programming")]
#[case::parameter(libc::EINVAL, "FpgactlError::PrParameter")]
#[case::busy(libc::EBUSY, "FpgactlError::Driver")]
fn pr_failures_are_classified(#[case] errno: i32, #[case] exp: &str) {
    let sys = TestSystem::new();
    sys.fake.fail(Request::FmePortPr, errno);
    let fme = IntelFpgaFme::open(sys.backend(), &sys.fme_node).expect("open failed");
    let res = fme.port_pr(0, &[1, 2, 3]);
    expect_that!(res, err(displays_as(contains_substring(exp))));
    expect_that!(res.err().and_then(|e| e.raw_os_error()), some(eq(errno)));
}
