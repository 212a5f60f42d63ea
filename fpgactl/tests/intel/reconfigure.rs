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

use crate::common::{AFU_UUID, PR_STATUS, TestSystem, remove_attr};
use fpgactl::devices::device::Port;
use fpgactl::devices::intel_components::intel_port::IntelFpgaPort;
use fpgactl::error::{FpgactlError, ReconfigurationStep};
use fpgactl::ioctl::Request;
use fpgactl::reconfigure::{PrReport, RawBitstream};
use googletest::prelude::*;
use rstest::*;

/// The FME's interface UUID as a bitstream container would carry it.
static BITSTREAM_INTERFACE: &str = "CE48969398F05F33946D560708BE108A";

fn bitstream() -> RawBitstream {
    RawBitstream::new(BITSTREAM_INTERFACE, vec![0x5a; 64])
}

fn mutating(sys: &TestSystem) -> Vec<Request> {
    sys.fake
        .mutating_calls()
        .into_iter()
        .map(|(_, request)| request)
        .collect()
}

#[gtest]
#[rstest]
#[case::physical_function(false)]
#[case::virtual_function(true)]
fn programs_in_release_pr_assign_order(#[case] vf: bool) {
    let sys = TestSystem::new();
    let node = if vf { &sys.vf_port_node } else { &sys.pf_port_node };
    let port = IntelFpgaPort::open(sys.backend(), node).expect("open failed");

    let report = port.pr(&bitstream(), false);
    expect_that!(
        report,
        ok(eq(&PrReport {
            port_id: 0,
            fme: sys.fme_node.clone(),
            dry_run: false,
            accelerator_type_uuid: Some(AFU_UUID.to_string()),
        }))
    );
    expect_that!(
        sys.fake.mutating_calls(),
        elements_are![
            eq(&(sys.fme_node.clone(), Request::FmePortRelease)),
            eq(&(sys.fme_node.clone(), Request::FmePortPr)),
            eq(&(sys.fme_node.clone(), Request::FmePortAssign))
        ]
    );
}

#[gtest]
fn dry_run_validates_without_touching_the_port() {
    let sys = TestSystem::new();
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    let report = port.pr(&bitstream(), true);
    expect_that!(
        report,
        ok(eq(&PrReport {
            port_id: 0,
            fme: sys.fme_node.clone(),
            dry_run: true,
            accelerator_type_uuid: None,
        }))
    );
    expect_that!(mutating(&sys), is_empty());
    expect_that!(
        sys.fake.calls(),
        elements_are![eq(&(sys.fme_node.clone(), Request::GetApiVersion))]
    );
}

#[gtest]
#[rstest]
#[case::real(false)]
#[case::dry_run(true)]
fn empty_bitstream_issues_no_requests(#[case] dry_run: bool) {
    let sys = TestSystem::new();
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    let res = port.pr(&RawBitstream::new(BITSTREAM_INTERFACE, Vec::new()), dry_run);
    assert!(matches!(res, Err(FpgactlError::EmptyPayload { port_id: 0 })));
    expect_that!(sys.fake.calls(), is_empty());
}

#[gtest]
#[rstest]
#[case::real(false)]
#[case::dry_run(true)]
fn incompatible_interface_is_rejected(#[case] dry_run: bool) {
    let sys = TestSystem::new();
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    let foreign = RawBitstream::new("00000000-0000-0000-0000-000000000000", vec![1; 8]);
    expect_that!(
        port.pr(&foreign, dry_run),
        err(displays_as(contains_substring("FpgactlError::Incompatible")))
    );
    expect_that!(mutating(&sys), is_empty());
}

#[gtest]
#[rstest]
#[case::real(false)]
#[case::dry_run(true)]
fn unsupported_api_is_rejected(#[case] dry_run: bool) {
    let sys = TestSystem::new();
    sys.fake.set_api_version(1);
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    expect_that!(
        port.pr(&bitstream(), dry_run),
        err(displays_as(contains_substring("FpgactlError::UnsupportedApi")))
    );
    expect_that!(mutating(&sys), is_empty());
}

#[gtest]
fn failed_release_stops_the_sequence() {
    let sys = TestSystem::new();
    sys.fake.fail(Request::FmePortRelease, libc::EBUSY);
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    let res = port.pr(&bitstream(), false);
    match res {
        Err(FpgactlError::Reconfiguration {
            step, recovery, ..
        }) => {
            expect_that!(step, eq(ReconfigurationStep::Release));
            expect_that!(recovery.is_none(), eq(true));
        }
        other => panic!("expected a release failure, got {other:?}"),
    }
    expect_that!(mutating(&sys), elements_are![eq(&Request::FmePortRelease)]);
}

#[gtest]
fn hardware_error_keeps_its_status_and_reassigns() {
    let sys = TestSystem::new();
    sys.fake.fail(Request::FmePortPr, libc::EIO);
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    let res = port.pr(&bitstream(), false);
    expect_that!(res.as_ref().err().and_then(|e| e.raw_os_error()), some(eq(libc::EIO)));
    match res {
        Err(FpgactlError::Reconfiguration {
            step,
            port_id,
            source,
            recovery,
        }) => {
            expect_that!(step, eq(ReconfigurationStep::Program));
            expect_that!(port_id, eq(0));
            assert!(matches!(
                *source,
                FpgactlError::Programming { status, .. } if status == PR_STATUS
            ));
            expect_that!(recovery.is_none(), eq(true));
        }
        other => panic!("expected a programming failure, got {other:?}"),
    }
    expect_that!(
        mutating(&sys),
        elements_are![
            eq(&Request::FmePortRelease),
            eq(&Request::FmePortPr),
            eq(&Request::FmePortAssign)
        ]
    );
}

#[gtest]
fn rejected_parameters_are_not_a_hardware_error() {
    let sys = TestSystem::new();
    sys.fake.fail(Request::FmePortPr, libc::EINVAL);
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    let res = port.pr(&bitstream(), false);
    assert!(matches!(
        res,
        Err(FpgactlError::Reconfiguration { ref source, .. })
            if matches!(**source, FpgactlError::PrParameter { .. })
    ));
}

#[gtest]
fn failed_recovery_is_reported_alongside_the_pr_error() {
    let sys = TestSystem::new();
    sys.fake.fail(Request::FmePortPr, libc::EIO);
    sys.fake.fail(Request::FmePortAssign, libc::ENODEV);
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    let res = port.pr(&bitstream(), false);
    expect_that!(
        res,
        err(displays_as(all!(
            contains_substring("partial reconfiguration failed"),
            contains_substring("FpgactlError::Programming"),
            contains_substring("recovery assign also failed"),
            contains_substring("FPGA_FME_PORT_ASSIGN")
        )))
    );
}

#[gtest]
fn failed_assign_names_the_step() {
    let sys = TestSystem::new();
    sys.fake.fail(Request::FmePortAssign, libc::EBUSY);
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    expect_that!(
        port.pr(&bitstream(), false),
        err(displays_as(contains_substring("port assign failed for port 0")))
    );
}

#[gtest]
#[rstest]
#[case::matching(AFU_UUID, true)]
#[case::dashed_matching("d8424dc4-a4a3-c413-f89e-433683f9040b", true)]
#[case::different("11111111111111111111111111111111", false)]
fn declared_accelerator_is_verified(#[case] afu: &str, #[case] accepted: bool) {
    let sys = TestSystem::new();
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    let res = port.pr(&bitstream().with_accelerator_type_uuid(afu), false);
    if accepted {
        expect_that!(res.map(|r| r.accelerator_type_uuid), ok(some(eq(&AFU_UUID.to_string()))));
    } else {
        expect_that!(
            res,
            err(displays_as(contains_substring("accelerator verification failed")))
        );
    }
    expect_that!(mutating(&sys).len(), eq(3));
}

#[gtest]
fn unreadable_accelerator_is_not_a_failure_when_none_was_declared() {
    let sys = TestSystem::new();
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    remove_attr(&sys.pf_port_dir, "afu_id");
    expect_that!(
        port.pr(&bitstream(), false),
        ok(eq(&PrReport {
            port_id: 0,
            fme: sys.fme_node.clone(),
            dry_run: false,
            accelerator_type_uuid: None,
        }))
    );
    expect_that!(mutating(&sys).len(), eq(3));
}

#[gtest]
fn unreadable_accelerator_fails_verification_when_declared() {
    let sys = TestSystem::new();
    let port = IntelFpgaPort::open(sys.backend(), &sys.pf_port_node).expect("open failed");
    remove_attr(&sys.pf_port_dir, "afu_id");
    expect_that!(
        port.pr(&bitstream().with_accelerator_type_uuid(AFU_UUID), false),
        err(displays_as(all!(
            contains_substring("accelerator verification failed"),
            contains_substring("FpgactlError::IORead")
        )))
    );
}
