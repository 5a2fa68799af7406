// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Single-axis position profiles.
//!
//! Both generators return exactly `total_ticks` positions. The start position itself is not
//! part of the output, the last entry is always the end position.

use crate::exception::{create_parameter_error, create_precondition_violation, JakaResult};

fn check_inputs(values: &[f64], total_ticks: usize) -> JakaResult<()> {
    if total_ticks == 0 {
        return Err(create_precondition_violation(
            "a profile needs at least one tick",
        ));
    }
    if let Some(value) = values.iter().find(|x| !x.is_finite()) {
        return Err(create_parameter_error(format!(
            "profile input {} is not finite",
            value
        )));
    }
    Ok(())
}

/// Linear interpolation with a constant step of `(end - start) / total_ticks`.
///
/// # Errors
/// * [`PreconditionViolation`](`crate::exception::JakaException::PreconditionViolation`) if `total_ticks` is zero.
/// * [`ParameterError`](`crate::exception::JakaException::ParameterError`) if `start` or `end` is not finite.
pub fn average(start: f64, end: f64, total_ticks: usize) -> JakaResult<Vec<f64>> {
    check_inputs(&[start, end], total_ticks)?;
    let step = (end - start) / total_ticks as f64;
    let mut trajectory: Vec<f64> = (1..total_ticks)
        .map(|t| start + step * t as f64)
        .collect();
    trajectory.push(end);
    Ok(trajectory)
}

/// Trapezoidal velocity profile from `start` to `end`.
///
/// Velocities are distances per tick and are applied in the direction of `end - start`.
/// The velocity ramps from `start_velocity` to `cruise_velocity` during the first
/// `accel_ticks` ticks, holds `cruise_velocity` and ramps towards `end_velocity` during the
/// last `decel_ticks` ticks. A step never moves past `end`: once the remaining distance is
/// smaller than the velocity the position snaps to `end`. The last tick is `end` even if the
/// velocity schedule is too slow to cover the distance.
///
/// # Errors
/// * [`PreconditionViolation`](`crate::exception::JakaException::PreconditionViolation`) if `total_ticks` is zero.
/// * [`ParameterError`](`crate::exception::JakaException::ParameterError`) if an input is not finite.
#[allow(clippy::too_many_arguments)]
pub fn trapezoid(
    start: f64,
    end: f64,
    start_velocity: f64,
    end_velocity: f64,
    cruise_velocity: f64,
    accel_ticks: usize,
    decel_ticks: usize,
    total_ticks: usize,
) -> JakaResult<Vec<f64>> {
    check_inputs(
        &[start, end, start_velocity, end_velocity, cruise_velocity],
        total_ticks,
    )?;
    let direction = if end >= start { 1. } else { -1. };
    let decel_begin = total_ticks.saturating_sub(decel_ticks);
    let mut trajectory = Vec::with_capacity(total_ticks);
    let mut position = start;
    let mut velocity = start_velocity;
    for t in 0..total_ticks {
        if t < accel_ticks {
            velocity += (cruise_velocity - start_velocity) / accel_ticks as f64;
        } else if t < decel_begin {
            velocity = cruise_velocity;
        } else {
            velocity -= (cruise_velocity - end_velocity) / decel_ticks as f64;
        }
        let speed = velocity.max(0.);
        let remaining = end - position;
        position += if remaining.abs() > speed {
            direction * speed
        } else {
            remaining
        };
        trajectory.push(position);
    }
    if let Some(last) = trajectory.last_mut() {
        *last = end;
    }
    Ok(trajectory)
}
