// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the [`Kinematics`] trait.
use crate::exception::{JakaException, JakaResult};
use crate::robot::error::describe_status;
use crate::robot::types::{CartesianPose, JointVector};
#[cfg(test)]
use mockall::automock;

/// Inverse kinematics of the arm.
#[cfg_attr(test, automock)]
pub trait Kinematics {
    /// Computes the joint positions that reach `target`, choosing the solution closest to
    /// `reference`.
    ///
    /// # Errors
    /// * [`KinematicsUnreachable`](`crate::exception::JakaException::KinematicsUnreachable`) if there is no solution.
    fn inverse(&self, reference: &JointVector, target: &CartesianPose) -> JakaResult<JointVector>;
}

/// Turns the status of a controller-side inverse kinematics call into a result.
pub fn kinematics_result(
    status: i32,
    solution: JointVector,
    target: &CartesianPose,
) -> JakaResult<JointVector> {
    if status == 0 {
        Ok(solution)
    } else {
        Err(JakaException::KinematicsUnreachable {
            message: format!(
                "no inverse kinematics solution for {:?}: {}",
                target.to_array(),
                describe_status(status)
            ),
        })
    }
}
