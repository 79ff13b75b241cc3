// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::similar_names)] // Test variable naming

//! Reference frame tree and relative state integration tests

use std::f64::consts::FRAC_PI_2;

use approx::assert_abs_diff_eq;
use hlafed::frames::{relative_state, SpaceTimeCoordinate};
use hlafed::math::{vector, QuaternionData, Vec3};
use hlafed::{Error, FrameKinematics, PhysicalEntity, RefFrame, RefFrameTree};

fn assert_vec(actual: &Vec3, expected: &Vec3, epsilon: f64) {
    for i in 0..3 {
        assert_abs_diff_eq!(actual[i], expected[i], epsilon = epsilon);
    }
}

fn random_vec(rng: &mut fastrand::Rng, scale: f64) -> Vec3 {
    [
        (rng.f64() * 2.0 - 1.0) * scale,
        (rng.f64() * 2.0 - 1.0) * scale,
        (rng.f64() * 2.0 - 1.0) * scale,
    ]
}

fn random_attitude(rng: &mut fastrand::Rng) -> QuaternionData {
    let axis = random_vec(rng, 1.0);
    let norm = vector::norm(&axis).max(1e-3);
    let axis = vector::scale(&axis, 1.0 / norm);
    QuaternionData::from_axis_angle(&axis, rng.f64() * std::f64::consts::TAU)
}

fn random_kinematics(rng: &mut fastrand::Rng) -> FrameKinematics {
    FrameKinematics {
        state: SpaceTimeCoordinate {
            position: random_vec(rng, 10.0),
            velocity: random_vec(rng, 1.0),
            attitude: random_attitude(rng),
            angular_velocity: random_vec(rng, 0.5),
            time: 0.0,
        },
        acceleration: random_vec(rng, 0.1),
        angular_acceleration: random_vec(rng, 0.01),
    }
}

/// Root with two branches: Root <- A <- B and Root <- C.
fn random_tree(rng: &mut fastrand::Rng) -> RefFrameTree {
    let mut tree = RefFrameTree::new();
    tree.add_frame(RefFrame::root("Root")).expect("add should succeed");
    tree.add_frame(RefFrame::new("A", "Root").with_kinematics(random_kinematics(rng)))
        .expect("add should succeed");
    tree.add_frame(RefFrame::new("B", "A").with_kinematics(random_kinematics(rng)))
        .expect("add should succeed");
    tree.add_frame(RefFrame::new("C", "Root").with_kinematics(random_kinematics(rng)))
        .expect("add should succeed");
    tree.validate().expect("tree should be valid");
    tree
}

fn spinning_frame(attitude: QuaternionData, time: f64) -> RefFrameTree {
    let mut tree = RefFrameTree::new();
    tree.add_frame(RefFrame::root("Root")).expect("add should succeed");
    let spin = FrameKinematics {
        state: SpaceTimeCoordinate {
            attitude,
            angular_velocity: [0.0, 0.0, FRAC_PI_2],
            time,
            ..SpaceTimeCoordinate::identity()
        },
        ..FrameKinematics::identity()
    };
    tree.add_frame(RefFrame::new("A", "Root").with_kinematics(spin))
        .expect("add should succeed");
    tree
}

fn entity_on_x_axis(time: f64) -> PhysicalEntity {
    let mut entity = PhysicalEntity::new("Rover", "A");
    entity.state.position = [1.0, 0.0, 0.0];
    entity.state.time = time;
    entity
}

#[test]
fn test_rotating_frame_entity_in_root() {
    let tree = spinning_frame(QuaternionData::identity(), 0.0);
    let entity = entity_on_x_axis(0.0);

    let in_root = relative_state(&tree, &entity, "Root").expect("relative state should succeed");

    assert_eq!(in_root.parent_frame, "Root");
    assert_eq!(in_root.name, "Rover");
    assert_vec(&in_root.state.position, &[1.0, 0.0, 0.0], 1e-12);
    assert_vec(&in_root.state.velocity, &[0.0, FRAC_PI_2, 0.0], 1e-12);
    assert_abs_diff_eq!(in_root.state.attitude.scalar, 1.0, epsilon = 1e-12);
    assert_vec(&in_root.state.attitude.vector, &[0.0, 0.0, 0.0], 1e-12);
    // Centripetal acceleration of a point on a spinning frame.
    assert_vec(
        &in_root.acceleration,
        &[-FRAC_PI_2 * FRAC_PI_2, 0.0, 0.0],
        1e-12,
    );
}

#[test]
fn test_rotating_frame_later_in_time() {
    // A quarter second into the spin the frame has turned by pi/8.
    let attitude = QuaternionData::from_axis_angle(&[0.0, 0.0, 1.0], FRAC_PI_2 * 0.25);
    let tree = spinning_frame(attitude, 0.25);
    let entity = entity_on_x_axis(0.25);

    let in_root = relative_state(&tree, &entity, "Root").expect("relative state should succeed");

    let expected = attitude.normalized();
    assert_abs_diff_eq!(in_root.state.attitude.scalar, expected.scalar, epsilon = 1e-15);
    assert_vec(&in_root.state.attitude.vector, &expected.vector, 1e-15);
    assert_abs_diff_eq!(vector::norm(&in_root.state.position), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(in_root.state.position[2], 0.0, epsilon = 1e-12);
    // Rigid rotation: speed |w| |r| and velocity normal to the radius.
    assert_abs_diff_eq!(vector::norm(&in_root.state.velocity), FRAC_PI_2, epsilon = 1e-12);
    assert_abs_diff_eq!(
        vector::dot(&in_root.state.velocity, &in_root.state.position),
        0.0,
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(in_root.state.time, 0.25, epsilon = 1e-15);
}

#[test]
fn test_entity_already_in_target_frame_is_copied() {
    let tree = spinning_frame(QuaternionData::identity(), 0.0);
    let mut entity = entity_on_x_axis(0.0);
    entity.status = "deployed".into();
    let copy = relative_state(&tree, &entity, "A").expect("relative state should succeed");
    assert_eq!(copy, entity);
}

#[test]
fn test_unknown_frame_reports_error() {
    let tree = spinning_frame(QuaternionData::identity(), 0.0);
    let entity = entity_on_x_axis(0.0);
    let err = relative_state(&tree, &entity, "Mars").expect_err("Mars is not in the tree");
    assert!(matches!(err, Error::FrameNotFound(name) if name == "Mars"));
}

#[test]
fn test_transform_to_self_is_identity() {
    let mut rng = fastrand::Rng::with_seed(7);
    let tree = random_tree(&mut rng);
    for name in ["Root", "A", "B", "C"] {
        let mut out = RefFrame::root("scratch");
        tree.build_transform(name, name, &mut out)
            .expect("transform should succeed");
        assert_eq!(out.name, name);
        assert_eq!(out.parent_name, name);
        assert_eq!(out.kinematics(), FrameKinematics::identity());
    }
}

#[test]
fn test_transform_round_trip_is_identity() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    let pairs = [("B", "C"), ("C", "B"), ("B", "Root"), ("A", "B"), ("C", "A")];
    for _ in 0..50 {
        let tree = random_tree(&mut rng);
        for (source, target) in pairs {
            let forward = tree.transform(source, target).expect("transform should succeed");
            let backward = tree.transform(target, source).expect("transform should succeed");
            let round_trip = forward.compose(&backward);

            let state = &round_trip.state;
            assert_vec(&state.position, &[0.0; 3], 1e-10);
            assert_vec(&state.velocity, &[0.0; 3], 1e-10);
            assert_vec(&round_trip.acceleration, &[0.0; 3], 1e-10);
            assert_vec(&state.angular_velocity, &[0.0; 3], 1e-10);
            assert_vec(&round_trip.angular_acceleration, &[0.0; 3], 1e-10);
            assert_abs_diff_eq!(state.attitude.scalar.abs(), 1.0, epsilon = 1e-10);
        }
    }
}

#[test]
fn test_composition_through_common_ancestor() {
    let mut rng = fastrand::Rng::with_seed(42);
    let tree = random_tree(&mut rng);
    let mut entity = PhysicalEntity::new("Lander", "B");
    entity.set_kinematics(&random_kinematics(&mut rng));

    // Direct, and via an intermediate re-expression in the root frame.
    let direct = relative_state(&tree, &entity, "C").expect("relative state should succeed");
    let via_root = relative_state(&tree, &entity, "Root").expect("relative state should succeed");
    let via_root = relative_state(&tree, &via_root, "C").expect("relative state should succeed");

    assert_vec(&direct.state.position, &via_root.state.position, 1e-9);
    assert_vec(&direct.state.velocity, &via_root.state.velocity, 1e-9);
    assert_vec(&direct.acceleration, &via_root.acceleration, 1e-9);
    assert_vec(
        &direct.state.angular_velocity,
        &via_root.state.angular_velocity,
        1e-9,
    );
    let dot = direct.state.attitude.scalar * via_root.state.attitude.scalar
        + vector::dot(&direct.state.attitude.vector, &via_root.state.attitude.vector);
    assert_abs_diff_eq!(dot.abs(), 1.0, epsilon = 1e-9);
}

#[test]
fn test_quaternion_rate_recovers_omega() {
    let mut rng = fastrand::Rng::with_seed(1234);
    for _ in 0..200 {
        let mut q = random_attitude(&mut rng);
        q.normalize();
        assert!((q.norm_squared().sqrt() - 1.0).abs() <= 4.0 * f64::EPSILON);

        let omega = random_vec(&mut rng, 1.0 / 3f64.sqrt());
        let q_dot = q.derivative_first(&omega);
        assert_vec(&q.compute_omega(&q_dot), &omega, 1e-12);
    }
}
