// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the [`TargetResolver`] which turns single-shot motion requests into actuator
//! commands.
use std::thread;

use tracing::{debug, info, warn};

use crate::config::{JogConfig, MotionConfig};
use crate::exception::create_parameter_error;
use crate::robot::actuator::Actuator;
use crate::robot::control_types::{
    CommandResponse, JogCommand, MotionTarget, CMD_EXECUTED, JOG_STARTED, JOG_STILL_MOVING,
};
use crate::robot::error::describe_status;
use crate::robot::types::{CartesianPose, JointVector, MoveMode};
use crate::utils::ensure_finite;

/// Scale from the request units \[m\] to the actuator units \[mm\].
const METERS_TO_MILLIMETERS: f64 = 1000.;

pub struct TargetResolver {
    jog: JogConfig,
    motion: MotionConfig,
    active_jog: Option<i32>,
}

impl TargetResolver {
    pub fn new(jog: JogConfig, motion: MotionConfig) -> Self {
        TargetResolver {
            jog,
            motion,
            active_jog: None,
        }
    }

    /// Index of the jog that is currently running, if any.
    pub fn active_jog(&self) -> Option<i32> {
        self.active_jog
    }

    pub fn resolve<A: Actuator>(&mut self, actuator: &mut A, target: &MotionTarget) -> CommandResponse {
        match target {
            MotionTarget::AbsoluteLinear {
                pose,
                speed,
                acceleration,
                blocking,
            } => self.move_linear(actuator, pose, *speed, *acceleration, *blocking),
            MotionTarget::AbsoluteJoint {
                joints,
                speed,
                acceleration,
                blocking,
            } => self.move_joint(actuator, joints, *speed, *acceleration, *blocking),
            MotionTarget::Jog(jog) => self.jog(actuator, jog),
        }
    }

    /// Linear move to `pose` given in \[m\] and \[rad\]; speed in \[m/s\] and acceleration in \[m/s²\].
    pub fn move_linear<A: Actuator>(
        &mut self,
        actuator: &mut A,
        pose: &[f64; 6],
        speed: f64,
        acceleration: f64,
        blocking: bool,
    ) -> CommandResponse {
        if !(pose.iter().all(|x| x.is_finite()) && speed.is_finite() && acceleration.is_finite()) {
            return CommandResponse::invalid(create_parameter_error(format!(
                "linear move with non-finite input: pose {:?}, speed {}, acceleration {}",
                pose, speed, acceleration
            )));
        }
        let target = CartesianPose::from_meters(pose);
        info!("linear move to {:?}", target.to_array());
        let status = actuator.linear_move(
            &target,
            MoveMode::Absolute,
            blocking,
            speed * METERS_TO_MILLIMETERS,
            acceleration * METERS_TO_MILLIMETERS,
            self.motion.linear_tolerance,
        );
        log_rejection("linear move", status);
        CommandResponse::from_status(status, CMD_EXECUTED)
    }

    /// Joint move to `joints` in \[rad\].
    pub fn move_joint<A: Actuator>(
        &mut self,
        actuator: &mut A,
        joints: &JointVector,
        speed: f64,
        acceleration: f64,
        blocking: bool,
    ) -> CommandResponse {
        if let Err(error) = ensure_finite(joints, "joint move target") {
            return CommandResponse::invalid(error);
        }
        if !(speed.is_finite() && acceleration.is_finite()) {
            return CommandResponse::invalid(create_parameter_error(format!(
                "joint move with non-finite speed {} or acceleration {}",
                speed, acceleration
            )));
        }
        info!("joint move to {:?}", joints);
        let status = actuator.joint_move(
            joints,
            MoveMode::Absolute,
            blocking,
            speed,
            acceleration,
            self.motion.joint_tolerance,
        );
        log_rejection("joint move", status);
        CommandResponse::from_status(status, CMD_EXECUTED)
    }

    /// Starts a continuous jog. Repeating the active jog does not touch the actuator.
    pub fn jog<A: Actuator>(&mut self, actuator: &mut A, jog: &JogCommand) -> CommandResponse {
        if self.active_jog == Some(jog.index) {
            debug!("jog {} is still moving", jog.index);
            return CommandResponse::success(JOG_STILL_MOVING);
        }
        let status = actuator.jog_stop(-1);
        if status != 0 {
            log_rejection("jog stop", status);
            return CommandResponse::rejected(status);
        }
        let settle_delay = self.jog.settle_delay();
        if !settle_delay.is_zero() {
            thread::sleep(settle_delay);
        }
        let velocity = jog.velocity(&self.jog);
        info!(
            "jog axis {} in {:?} with velocity {}",
            jog.axis, jog.coord, velocity
        );
        let status = actuator.jog(jog.axis, MoveMode::Continuous, jog.coord, velocity, 0.);
        if status != 0 {
            log_rejection("jog", status);
            return CommandResponse::rejected(status);
        }
        self.active_jog = Some(jog.index);
        CommandResponse::success(JOG_STARTED)
    }

    /// Aborts the current motion and forgets the active jog.
    pub fn stop<A: Actuator>(&mut self, actuator: &mut A) -> CommandResponse {
        self.active_jog = None;
        let status = actuator.abort_motion();
        log_rejection("stop", status);
        CommandResponse::from_status(status, "stopped")
    }
}

fn log_rejection(what: &str, status: i32) {
    if status != 0 {
        warn!("{} rejected: {}", what, describe_status(status));
    }
}
