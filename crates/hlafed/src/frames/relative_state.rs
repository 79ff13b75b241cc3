// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Kinematic composition of frame states.
//!
//! A [`FrameKinematics`] value `X_B/A` describes frame `B` relative to frame
//! `A`: position, velocity and acceleration of `B`'s origin expressed in `A`,
//! the attitude quaternion of `B` with respect to `A`, and `B`'s angular
//! velocity and acceleration expressed in `B`.
//!
//! With `C` mapping child vectors into the parent (`q* v q`) and `T` mapping
//! parent vectors into the child (`q v q*`), composing a path `X_S/T` with
//! an entity `X_E/S` gives
//!
//! ```text
//! r = r_S + C(r_E)
//! v = v_S + C(v_E + w_S x r_E)
//! a = a_S + C(a_E + 2 w_S x v_E + w_S x (w_S x r_E) + dw_S x r_E)
//! q = q_E * q_S
//! w = w_E + T_E(w_S)
//! dw = dw_E + T_E(dw_S) - w_E x T_E(w_S)
//! ```

use super::physical_entity::PhysicalEntity;
use super::space_time::SpaceTimeCoordinate;
use super::tree::RefFrameTree;
use crate::error::Result;
use crate::math::{vector, Vec3};

/// State plus accelerations of one frame relative to another.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameKinematics {
    pub state: SpaceTimeCoordinate,
    /// Linear acceleration, expressed in the reference frame.
    pub acceleration: Vec3,
    /// Angular acceleration, expressed in the moving frame.
    pub angular_acceleration: Vec3,
}

impl FrameKinematics {
    /// Frame coincident with its reference.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Express `entity` (relative to this frame) in this frame's reference.
    pub fn compose(&self, entity: &FrameKinematics) -> FrameKinematics {
        let path = &self.state;
        let q_path = &path.attitude;
        let w_p = &path.angular_velocity;
        let dw_p = &self.angular_acceleration;

        let body = &entity.state;
        let r_e = &body.position;
        let v_e = &body.velocity;

        let position = vector::add(&path.position, &q_path.conjugate_transform_vector(r_e));

        let w_cross_r = vector::cross(w_p, r_e);
        let velocity = vector::add(
            &path.velocity,
            &q_path.conjugate_transform_vector(&vector::add(v_e, &w_cross_r)),
        );

        let accel_local = vector::sum(&[
            entity.acceleration,
            vector::scale(&vector::cross(w_p, v_e), 2.0),
            vector::cross(w_p, &w_cross_r),
            vector::cross(dw_p, r_e),
        ]);
        let acceleration = vector::add(
            &self.acceleration,
            &q_path.conjugate_transform_vector(&accel_local),
        );

        let mut attitude = body.attitude.multiply(q_path);
        attitude.normalize();

        let w_p_body = body.attitude.transform_vector(w_p);
        let angular_velocity = vector::add(&body.angular_velocity, &w_p_body);
        let angular_acceleration = vector::sub(
            &vector::add(
                &entity.angular_acceleration,
                &body.attitude.transform_vector(dw_p),
            ),
            &vector::cross(&body.angular_velocity, &w_p_body),
        );

        FrameKinematics {
            state: SpaceTimeCoordinate {
                position,
                velocity,
                attitude,
                angular_velocity,
                time: body.time,
            },
            acceleration,
            angular_acceleration,
        }
    }

    /// `X_A/B` from `X_B/A`.
    pub fn inverse(&self) -> FrameKinematics {
        let s = &self.state;
        let q = &s.attitude;
        let w = &s.angular_velocity;

        // Reference-frame vectors re-expressed in the moving frame.
        let r = q.transform_vector(&s.position);
        let v = q.transform_vector(&s.velocity);
        let a = q.transform_vector(&self.acceleration);

        let w_cross_r = vector::cross(w, &r);
        let velocity = vector::add(&vector::negate(&v), &w_cross_r);
        let acceleration = vector::sum(&[
            vector::negate(&a),
            vector::scale(&vector::cross(w, &v), 2.0),
            vector::cross(&self.angular_acceleration, &r),
            vector::negate(&vector::cross(w, &w_cross_r)),
        ]);

        FrameKinematics {
            state: SpaceTimeCoordinate {
                position: vector::negate(&r),
                velocity,
                attitude: q.conjugated(),
                angular_velocity: vector::negate(&q.conjugate_transform_vector(w)),
                time: s.time,
            },
            acceleration,
            angular_acceleration: vector::negate(
                &q.conjugate_transform_vector(&self.angular_acceleration),
            ),
        }
    }
}

/// State of `entity` expressed in the frame named `express`.
///
/// The returned entity is a copy of the input with its kinematics and parent
/// frame replaced. An entity already expressed in `express` is copied
/// verbatim. On error nothing is produced.
pub fn relative_state(
    tree: &RefFrameTree,
    entity: &PhysicalEntity,
    express: &str,
) -> Result<PhysicalEntity> {
    if entity.parent_frame == express {
        return Ok(entity.clone());
    }
    let path = tree.transform(&entity.parent_frame, express)?;
    let mut out = entity.clone();
    out.set_kinematics(&path.compose(&entity.kinematics()));
    out.parent_frame = express.to_string();
    log::debug!(
        "[frames] {} re-expressed from {} in {}",
        entity.name,
        entity.parent_frame,
        express
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::QuaternionData;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn assert_vec(actual: &Vec3, expected: &Vec3) {
        for i in 0..3 {
            assert_abs_diff_eq!(actual[i], expected[i], epsilon = 1e-12);
        }
    }

    fn sample() -> FrameKinematics {
        FrameKinematics {
            state: SpaceTimeCoordinate {
                position: [1.0, -2.0, 0.5],
                velocity: [0.1, 0.2, -0.3],
                attitude: QuaternionData::from_axis_angle(&[0.0, 0.6, 0.8], 0.7),
                angular_velocity: [0.01, -0.02, 0.03],
                time: 3.0,
            },
            acceleration: [0.5, 0.0, -0.25],
            angular_acceleration: [0.001, 0.002, -0.004],
        }
    }

    #[test]
    fn test_rotating_frame_velocity() {
        let path = FrameKinematics {
            state: SpaceTimeCoordinate {
                angular_velocity: [0.0, 0.0, FRAC_PI_2],
                ..SpaceTimeCoordinate::identity()
            },
            ..FrameKinematics::identity()
        };
        let entity = FrameKinematics {
            state: SpaceTimeCoordinate {
                position: [1.0, 0.0, 0.0],
                ..SpaceTimeCoordinate::identity()
            },
            ..FrameKinematics::identity()
        };
        let out = path.compose(&entity);
        assert_vec(&out.state.position, &[1.0, 0.0, 0.0]);
        assert_vec(&out.state.velocity, &[0.0, FRAC_PI_2, 0.0]);
        // Centripetal acceleration towards the axis.
        assert_vec(&out.acceleration, &[-FRAC_PI_2 * FRAC_PI_2, 0.0, 0.0]);
    }

    #[test]
    fn test_compose_with_inverse_is_identity() {
        let x = sample();
        let round = x.inverse().compose(&x);
        assert_vec(&round.state.position, &vector::ZERO);
        assert_vec(&round.state.velocity, &vector::ZERO);
        assert_vec(&round.acceleration, &vector::ZERO);
        assert_vec(&round.state.angular_velocity, &vector::ZERO);
        assert_vec(&round.angular_acceleration, &vector::ZERO);
        assert_abs_diff_eq!(round.state.attitude.scalar.abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_double_inverse() {
        let x = sample();
        let back = x.inverse().inverse();
        assert_vec(&back.state.position, &x.state.position);
        assert_vec(&back.state.velocity, &x.state.velocity);
        assert_vec(&back.acceleration, &x.acceleration);
        assert_vec(&back.state.angular_velocity, &x.state.angular_velocity);
        assert_vec(&back.angular_acceleration, &x.angular_acceleration);
    }

    #[test]
    fn test_identity_path_keeps_entity() {
        let x = sample();
        let out = FrameKinematics::identity().compose(&x);
        assert_vec(&out.state.position, &x.state.position);
        assert_vec(&out.state.velocity, &x.state.velocity);
        assert_vec(&out.state.angular_velocity, &x.state.angular_velocity);
        assert_eq!(out.state.time, x.state.time);
    }

    #[test]
    fn test_angular_terms_in_entity_frame() {
        // Path spins about its z axis; entity is rolled 90 degrees about x
        // and spins about its own x axis.
        let path = FrameKinematics {
            state: SpaceTimeCoordinate {
                angular_velocity: [0.0, 0.0, 1.0],
                ..SpaceTimeCoordinate::identity()
            },
            ..FrameKinematics::identity()
        };
        let entity = FrameKinematics {
            state: SpaceTimeCoordinate {
                attitude: QuaternionData::from_axis_angle(&[1.0, 0.0, 0.0], FRAC_PI_2),
                angular_velocity: [1.0, 0.0, 0.0],
                ..SpaceTimeCoordinate::identity()
            },
            ..FrameKinematics::identity()
        };
        let out = path.compose(&entity);

        // Path z axis seen from the entity is -y.
        assert_vec(&out.state.angular_velocity, &[1.0, -1.0, 0.0]);
        assert_vec(&out.angular_acceleration, &[0.0, 0.0, 1.0]);
    }
}
