// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the [`Actuator`] trait which abstracts the low-level controller interface of the arm.
use crate::exception::{JakaException, JakaResult};
use crate::robot::types::{ActuatorStatus, CartesianPose, CoordType, JointVector, MoveMode};
#[cfg(test)]
use mockall::automock;

/// Low-level command interface of the arm controller.
///
/// Every command returns the raw status of the controller: zero for success, otherwise one of
/// the codes of [`ErrorCode`](`crate::robot::error::ErrorCode`) or an unknown code.
/// Use [`check_status`] to turn a status into a [`JakaResult`].
#[cfg_attr(test, automock)]
pub trait Actuator {
    fn power_on(&mut self) -> i32;
    fn power_off(&mut self) -> i32;
    fn enable(&mut self) -> i32;
    fn disable(&mut self) -> i32;

    /// Configures the joint-space low pass filter applied to streamed commands.
    fn set_joint_filter(&mut self, cutoff_frequency: f64) -> i32;
    /// Enters or leaves the streaming (servo) mode.
    fn enable_streaming(&mut self, enable: bool) -> i32;
    /// Submits one joint command. `step_num` is the number of controller cycles the command is
    /// spread over.
    fn submit_joint_command(&mut self, joints: &JointVector, mode: MoveMode, step_num: u32) -> i32;
    /// Stops the current motion immediately.
    fn abort_motion(&mut self) -> i32;

    /// Linear move of the tool, translation in \[mm\], speed in \[mm/s\], acceleration in \[mm/s²\].
    fn linear_move(
        &mut self,
        pose: &CartesianPose,
        mode: MoveMode,
        blocking: bool,
        speed: f64,
        acceleration: f64,
        tolerance: f64,
    ) -> i32;
    /// Joint move, speed in \[rad/s\], acceleration in \[rad/s²\].
    fn joint_move(
        &mut self,
        joints: &JointVector,
        mode: MoveMode,
        blocking: bool,
        speed: f64,
        acceleration: f64,
        tolerance: f64,
    ) -> i32;
    fn jog(
        &mut self,
        axis: usize,
        mode: MoveMode,
        coord: CoordType,
        velocity: f64,
        position: f64,
    ) -> i32;
    /// Stops the jog of one axis, `-1` stops all axes.
    fn jog_stop(&mut self, axis: i32) -> i32;

    fn status(&self) -> JakaResult<ActuatorStatus>;
    fn joint_position(&self) -> JakaResult<JointVector>;
    fn tcp_position(&self) -> JakaResult<CartesianPose>;
}

/// Maps a controller status to a result. Only zero is a success.
///
/// # Errors
/// * [`ActuatorRejected`](`crate::exception::JakaException::ActuatorRejected`) for every non-zero status.
pub fn check_status(status: i32) -> JakaResult<()> {
    match status {
        0 => Ok(()),
        status => Err(JakaException::ActuatorRejected { status, log: None }),
    }
}
