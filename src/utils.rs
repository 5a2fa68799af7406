// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! contains useful type definitions and conversion functions.
use crate::exception::{create_parameter_error, JakaResult};
use crate::robot::types::JointVector;
use nalgebra::SVector;
use std::time::Duration;

/// A Vector with 6 entries
pub type Vector6 = SVector<f64, 6>;

/// Converts degrees to radians.
pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees.to_radians()
}

/// Number of control ticks that fit into `duration`, rounded to the nearest tick.
pub fn ticks_for(duration: f64, control_period: Duration) -> usize {
    let ticks = (duration / control_period.as_secs_f64()).round();
    if ticks.is_sign_negative() || !ticks.is_finite() {
        0
    } else {
        ticks as usize
    }
}

/// Checks that all six joint values are finite.
pub fn ensure_finite(joints: &JointVector, what: &str) -> JakaResult<()> {
    if joints.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(create_parameter_error(format!(
            "{} contains non-finite values: {:?}",
            what, joints
        )))
    }
}
