// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::unreadable_literal)] // Large test constants
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::items_after_statements)] // Test helpers
#![allow(clippy::too_many_lines)] // Example/test code
#![allow(clippy::needless_pass_by_value)] // Test functions

//! Execution control integration tests
//!
//! Runs complete federations over the loopback RTI, one thread per
//! federate: early joiner initialisation, late joiner alignment, freeze
//! round trips and shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use approx::assert_abs_diff_eq;
use hlafed::config::{SP_INITIALIZATION_STARTED, SP_MTR_FREEZE, SP_MTR_RUN};
use hlafed::rti::{DeliveryInfo, FederateAmbassador, FederateHandle, TransportOrder};
use hlafed::{
    Error, ExecutionMode, Executive, Federate, FederateConfig, FederateConfigBuilder,
    Int64Interval, KnownFederate, LoopbackRti, SimExecutive,
};

const ROOT_FRAME: &str = "SolarSystemBarycentricInertial";
const DEADLINE: Duration = Duration::from_secs(60);

fn spacefom_timing(builder: FederateConfigBuilder, lcts_micros: i64) -> FederateConfigBuilder {
    builder
        .least_common_time_step(Int64Interval::from_micros(lcts_micros))
        .lookahead(Int64Interval::from_micros(lcts_micros))
        .time_padding(Int64Interval::from_micros(1_000_000))
        .wait_sleep(Duration::from_micros(200))
}

fn master_config(federation: &str, lcts_micros: i64) -> FederateConfigBuilder {
    spacefom_timing(FederateConfig::builder(federation, "Master"), lcts_micros)
        .master(true)
        .root_frame_name(ROOT_FRAME)
        .publish_root_frame(true)
}

fn member_config(federation: &str, name: &str, lcts_micros: i64) -> FederateConfigBuilder {
    spacefom_timing(FederateConfig::builder(federation, name), lcts_micros).master(false)
}

fn start(rti: &LoopbackRti, config: FederateConfig, core_cycle: f64) -> (Federate, Arc<SimExecutive>) {
    let exec = SimExecutive::shared(core_cycle);
    let federate =
        Federate::new(config, rti.ambassador(), exec.clone()).expect("federate creation should succeed");
    (federate, exec)
}

/// Cycle while running until the scenario clock reaches `until`.
fn run_until(federate: &mut Federate, exec: &SimExecutive, until: f64) {
    let deadline = Instant::now() + DEADLINE;
    while federate.scenario_time() < until {
        assert!(Instant::now() < deadline, "timed out running to {}", until);
        let mode = federate.run_cycle(exec).expect("cycle should succeed");
        assert_eq!(mode, ExecutionMode::Running);
    }
}

fn run_until_shutdown(federate: &mut Federate, exec: &SimExecutive) {
    let deadline = Instant::now() + DEADLINE;
    loop {
        assert!(Instant::now() < deadline, "timed out waiting for shutdown");
        if federate.run_cycle(exec).expect("cycle should succeed") == ExecutionMode::Shutdown {
            break;
        }
    }
}

#[test]
fn test_master_and_early_joiner_reach_running() {
    let rti = LoopbackRti::new();
    let barrier = Arc::new(Barrier::new(2));

    let master = {
        let rti = rti.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let config = master_config("EarlyJoin", 250_000)
                .known_federate(KnownFederate::required("Lander"))
                .build()
                .expect("master config should succeed");
            let (mut federate, exec) = start(&rti, config, 0.25);
            federate.initialize().expect("master initialize should succeed");
            let mode = federate.mode();
            let started = federate
                .shared()
                .sync_points()
                .is_synchronized(SP_INITIALIZATION_STARTED);

            run_until(&mut federate, &exec, 1.0);
            let exco = federate.exco().clone();
            barrier.wait();

            federate
                .request_mode_transition(ExecutionMode::Shutdown)
                .expect("shutdown request should succeed");
            run_until_shutdown(&mut federate, &exec);
            (mode, started, federate.is_master(), exco)
        })
    };

    let joiner = {
        let rti = rti.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let config = member_config("EarlyJoin", "Lander", 250_000)
                .build()
                .expect("member config should succeed");
            let (mut federate, exec) = start(&rti, config, 0.25);
            federate.initialize().expect("joiner initialize should succeed");
            let mode = federate.mode();
            let late = federate.is_late_joiner();

            run_until(&mut federate, &exec, 1.0);
            let exco = federate.exco().clone();
            let has_root = federate.frames().contains(ROOT_FRAME);
            barrier.wait();

            run_until_shutdown(&mut federate, &exec);
            (mode, late, federate.is_master(), has_root, exco)
        })
    };

    let (master_mode, started, is_master, master_exco) =
        master.join().expect("master thread should succeed");
    let (joiner_mode, late, joiner_is_master, has_root, joiner_exco) =
        joiner.join().expect("joiner thread should succeed");

    assert_eq!(master_mode, ExecutionMode::Running);
    assert_eq!(joiner_mode, ExecutionMode::Running);
    assert!(started);
    assert!(is_master);
    assert!(!joiner_is_master);
    assert!(!late);
    assert!(has_root, "root frame should be reflected into the joiner's tree");

    assert_eq!(joiner_exco, master_exco);
    assert_eq!(joiner_exco.root_frame_name, ROOT_FRAME);
    assert_eq!(joiner_exco.current_execution_mode, ExecutionMode::Running);
    assert_eq!(
        joiner_exco.least_common_time_step,
        Int64Interval::from_micros(250_000)
    );
    assert!(!rti.federation_exists("EarlyJoin"));
}

#[test]
fn test_late_joiner_aligns_and_runs() {
    let rti = LoopbackRti::new();
    let (start_tx, start_rx) = mpsc::channel::<()>();
    let late_ready = Arc::new(AtomicBool::new(false));

    let master = {
        let rti = rti.clone();
        let late_ready = Arc::clone(&late_ready);
        thread::spawn(move || {
            let config = master_config("LateJoin", 1_000)
                .scenario_time_epoch(1000.0)
                .build()
                .expect("master config should succeed");
            let (mut federate, exec) = start(&rti, config, 0.001);
            federate.initialize().expect("master initialize should succeed");

            let deadline = Instant::now() + DEADLINE;
            let mut signalled = false;
            let mut shutdown_requested = false;
            loop {
                assert!(Instant::now() < deadline, "master timed out");
                let mode = federate.run_cycle(&exec).expect("cycle should succeed");
                if mode == ExecutionMode::Shutdown {
                    break;
                }
                if !signalled && federate.granted_time().seconds() >= 0.2 {
                    start_tx.send(()).expect("start signal should succeed");
                    signalled = true;
                }
                if !shutdown_requested && late_ready.load(Ordering::Acquire) {
                    federate
                        .request_mode_transition(ExecutionMode::Shutdown)
                        .expect("shutdown request should succeed");
                    shutdown_requested = true;
                }
            }
        })
    };

    start_rx.recv().expect("master should reach 0.2 s");
    let config = member_config("LateJoin", "Rover", 1_000)
        .build()
        .expect("member config should succeed");
    let (mut federate, exec) = start(&rti, config, 0.001);
    exec.set_sim_time(10.0);
    federate.initialize().expect("late joiner initialize should succeed");

    assert!(federate.is_late_joiner());
    assert_eq!(federate.mode(), ExecutionMode::Running);
    assert!(!federate.shared().sync_points().is_announced(SP_MTR_RUN));

    let granted = federate.granted_time();
    assert!(granted.seconds() >= 0.2);
    assert_eq!(granted.base_units() % 1_000, 0, "grant should sit on an LCTS boundary");
    assert_abs_diff_eq!(
        federate.timeline().offset(),
        granted.seconds() - 10.0,
        epsilon = 1e-9
    );
    assert_abs_diff_eq!(federate.timeline().epoch(), 1000.0, epsilon = 1e-12);
    assert_abs_diff_eq!(
        federate.scenario_time(),
        1000.0 + granted.seconds(),
        epsilon = 1e-9
    );
    assert!(federate.frames().contains(ROOT_FRAME));

    late_ready.store(true, Ordering::Release);
    run_until_shutdown(&mut federate, &exec);
    assert!(exec.is_stopped());
    master.join().expect("master thread should succeed");
}

/// Master loop for the freeze scenarios. A master-initiated freeze is
/// requested so that it is accepted at `freeze_request_at`.
fn master_freeze_loop(
    federate: &mut Federate,
    exec: &SimExecutive,
    freeze_request_at: Option<f64>,
) -> Option<f64> {
    let deadline = Instant::now() + DEADLINE;
    let mut freeze_requested = freeze_request_at.is_none();
    let mut run_requested = false;
    let mut shutdown_requested = false;
    let mut frozen_at = None;
    loop {
        assert!(Instant::now() < deadline, "master timed out");
        let mode = federate.run_cycle(exec).expect("cycle should succeed");
        let now = federate.scenario_time();
        match mode {
            ExecutionMode::Shutdown => break,
            ExecutionMode::Freeze => {
                frozen_at.get_or_insert(now);
                if !run_requested {
                    federate
                        .request_mode_transition(ExecutionMode::Running)
                        .expect("run request should succeed");
                    run_requested = true;
                }
            }
            ExecutionMode::Running => {
                if let Some(at) = freeze_request_at {
                    // Requests are accepted on the following cycle.
                    if !freeze_requested && now + 0.25 >= at {
                        federate
                            .request_mode_transition(ExecutionMode::Freeze)
                            .expect("freeze request should succeed");
                        freeze_requested = true;
                    }
                }
                if run_requested && !shutdown_requested && now >= frozen_at.unwrap_or(0.0) + 2.0 {
                    federate
                        .request_mode_transition(ExecutionMode::Shutdown)
                        .expect("shutdown request should succeed");
                    shutdown_requested = true;
                }
            }
            other => panic!("unexpected mode {}", other),
        }
    }
    frozen_at
}

/// Member loop: records where it froze and whether it resumed.
fn member_freeze_loop(
    federate: &mut Federate,
    exec: &SimExecutive,
    freeze_request_at: Option<f64>,
) -> (Option<f64>, bool) {
    let deadline = Instant::now() + DEADLINE;
    let mut frozen_at = None;
    let mut resumed = false;
    let mut requested = false;
    loop {
        assert!(Instant::now() < deadline, "member timed out");
        let mode = federate.run_cycle(exec).expect("cycle should succeed");
        match mode {
            ExecutionMode::Shutdown => break,
            ExecutionMode::Freeze => {
                frozen_at.get_or_insert(federate.scenario_time());
            }
            ExecutionMode::Running => {
                if frozen_at.is_some() {
                    resumed = true;
                }
                if let Some(at) = freeze_request_at {
                    if !requested && federate.scenario_time() >= at {
                        federate
                            .request_mode_transition(ExecutionMode::Freeze)
                            .expect("freeze request should succeed");
                        requested = true;
                    }
                }
            }
            other => panic!("unexpected mode {}", other),
        }
    }
    (frozen_at, resumed)
}

#[test]
fn test_freeze_round_trip() {
    let rti = LoopbackRti::new();

    let master = {
        let rti = rti.clone();
        thread::spawn(move || {
            let config = master_config("Freeze", 250_000)
                .known_federate(KnownFederate::required("Lander"))
                .build()
                .expect("master config should succeed");
            let (mut federate, exec) = start(&rti, config, 0.25);
            federate.initialize().expect("master initialize should succeed");
            master_freeze_loop(&mut federate, &exec, Some(5.0))
        })
    };

    let joiner = {
        let rti = rti.clone();
        thread::spawn(move || {
            let config = member_config("Freeze", "Lander", 250_000)
                .build()
                .expect("member config should succeed");
            let (mut federate, exec) = start(&rti, config, 0.25);
            federate.initialize().expect("joiner initialize should succeed");
            let outcome = member_freeze_loop(&mut federate, &exec, None);
            let synchronized = [SP_MTR_FREEZE, SP_MTR_RUN]
                .iter()
                .all(|label| federate.shared().sync_points().is_synchronized(label));
            (outcome, synchronized)
        })
    };

    let master_frozen = master.join().expect("master thread should succeed");
    let ((joiner_frozen, resumed), synchronized) =
        joiner.join().expect("joiner thread should succeed");

    assert_abs_diff_eq!(master_frozen.expect("master should freeze"), 6.0, epsilon = 1e-9);
    assert_abs_diff_eq!(joiner_frozen.expect("joiner should freeze"), 6.0, epsilon = 1e-9);
    assert!(resumed, "joiner should return to running");
    assert!(synchronized);
}

#[test]
fn test_member_requests_freeze_through_mtr() {
    let rti = LoopbackRti::new();

    let master = {
        let rti = rti.clone();
        thread::spawn(move || {
            let config = master_config("MtrFreeze", 250_000)
                .known_federate(KnownFederate::required("Lander"))
                .build()
                .expect("master config should succeed");
            let (mut federate, exec) = start(&rti, config, 0.25);
            federate.initialize().expect("master initialize should succeed");
            master_freeze_loop(&mut federate, &exec, None)
        })
    };

    let joiner = {
        let rti = rti.clone();
        thread::spawn(move || {
            let config = member_config("MtrFreeze", "Lander", 250_000)
                .build()
                .expect("member config should succeed");
            let (mut federate, exec) = start(&rti, config, 0.25);
            federate.initialize().expect("joiner initialize should succeed");
            member_freeze_loop(&mut federate, &exec, Some(2.0))
        })
    };

    let master_frozen = master.join().expect("master thread should succeed");
    let (joiner_frozen, resumed) = joiner.join().expect("joiner thread should succeed");

    let master_frozen = master_frozen.expect("master should freeze");
    let joiner_frozen = joiner_frozen.expect("joiner should freeze");
    assert_abs_diff_eq!(master_frozen, joiner_frozen, epsilon = 1e-9);
    // Accepted one padding after the request reached the master.
    assert!(master_frozen >= 3.0);
    assert!(resumed);
}

#[test]
fn test_request_validation() {
    let rti = LoopbackRti::new();
    let config = master_config("Validation", 250_000)
        .build()
        .expect("master config should succeed");
    let (mut federate, _exec) = start(&rti, config, 0.25);

    let err = federate
        .request_mode_transition(ExecutionMode::Initializing)
        .expect_err("initializing is not requestable");
    assert!(matches!(err, Error::UnknownModeTransition(1)));
    assert!(!federate.is_joined());
}

#[test]
fn test_connection_loss_is_reported() {
    let rti = LoopbackRti::new();
    let config = master_config("Lost", 250_000)
        .build()
        .expect("master config should succeed");
    let (mut federate, exec) = start(&rti, config, 0.25);
    federate.initialize().expect("master initialize should succeed");
    run_until(&mut federate, &exec, 0.5);

    assert!(rti.disconnect_federate("Lost", "Master"));

    let deadline = Instant::now() + DEADLINE;
    let err = loop {
        assert!(Instant::now() < deadline, "connection loss not reported");
        match federate.run_cycle(&exec) {
            Ok(_) => continue,
            Err(e) => break e,
        }
    };
    assert!(err.is_environment(), "unexpected error {}", err);
    assert!(!federate.is_joined());
    assert!(exec.is_stopped());
}

#[test]
fn test_member_leaves_on_shutdown_announcement() {
    let rti = LoopbackRti::new();
    let barrier = Arc::new(Barrier::new(2));

    let master = {
        let rti = rti.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let config = master_config("Announced", 250_000)
                .known_federate(KnownFederate::required("Lander"))
                .build()
                .expect("master config should succeed");
            let (mut federate, exec) = start(&rti, config, 0.25);
            federate.initialize().expect("master initialize should succeed");
            run_until(&mut federate, &exec, 1.0);
            barrier.wait();

            federate
                .request_mode_transition(ExecutionMode::Shutdown)
                .expect("shutdown request should succeed");
            run_until_shutdown(&mut federate, &exec);
            Instant::now()
        })
    };

    let joiner = {
        let rti = rti.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let config = member_config("Announced", "Lander", 250_000)
                .build()
                .expect("member config should succeed");
            let (mut federate, exec) = start(&rti, config, 0.25);
            federate.initialize().expect("joiner initialize should succeed");
            run_until(&mut federate, &exec, 1.0);
            barrier.wait();

            // Blocks on its next grant while the master holds the padding.
            run_until_shutdown(&mut federate, &exec);
            (Instant::now(), federate.is_joined(), exec.is_stopped())
        })
    };

    let master_done = master.join().expect("master thread should succeed");
    let (joiner_done, joined, stopped) = joiner.join().expect("joiner thread should succeed");

    assert!(!joined);
    assert!(stopped);
    // The master sleeps one padding (1s) after announcing mtr_shutdown.
    assert!(
        joiner_done + Duration::from_millis(500) < master_done,
        "member should resign on the announcement, not on the master's resignation"
    );
}

#[test]
fn test_master_rejects_foreign_exco() {
    let rti = LoopbackRti::new();
    let config = master_config("Foreign", 250_000)
        .build()
        .expect("master config should succeed");
    let (mut federate, exec) = start(&rti, config, 0.25);
    federate.initialize().expect("master initialize should succeed");
    run_until(&mut federate, &exec, 0.5);

    let exco = federate
        .shared()
        .exco_instance()
        .expect("master should own the ExCO instance");
    let info = DeliveryInfo {
        order: TransportOrder::Receive,
        time: None,
        producer: FederateHandle(99),
    };
    federate
        .shared()
        .reflect_attribute_values(exco, &Vec::new(), &[], info);
    assert!(federate.shared().is_foreign_exco_reflected());

    let err = federate
        .run_cycle(&exec)
        .expect_err("a reflected ExCO must end the master's run");
    assert!(matches!(err, Error::ExcoNotFromMaster), "unexpected error {}", err);
    assert!(!federate.is_joined());
    assert!(exec.is_stopped());
}
