// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Combines six single-axis profiles into one time-aligned joint trajectory.
//!
//! Every composer output has the same number of entries for all axes and ends exactly at the
//! target, so all axes arrive on the same tick.

use crate::exception::{create_parameter_error, create_precondition_violation, JakaResult};
use crate::robot::types::{JointVector, NUM_JOINTS};
use crate::trajectory::profile::{average, trapezoid};
use crate::utils::{ensure_finite, ticks_for, Vector6};
use std::time::Duration;

/// One joint vector per control tick.
pub type Trajectory = Vec<JointVector>;

/// Displacements below this value count as no motion.
const DELTA_Q_MOTION_FINISHED: f64 = 1e-9;
/// Per-tick slack when comparing steps against the limits.
const LIMIT_TOLERANCE: f64 = 1e-12;
const MAX_PLAN_ITERATIONS: usize = 1_000_000;

/// Kinematic limits and boundary velocities for a synchronized trapezoidal motion.
///
/// Velocities in \[rad/s\], accelerations in \[rad/s²\]. Start and end velocities are
/// non-negative speeds along each axis' direction of travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapezoidLimits {
    pub velocity: JointVector,
    pub acceleration: JointVector,
    pub start_velocity: JointVector,
    pub end_velocity: JointVector,
}

impl TrapezoidLimits {
    /// Limits for a motion that starts and ends at rest.
    pub fn at_rest(velocity: JointVector, acceleration: JointVector) -> Self {
        TrapezoidLimits {
            velocity,
            acceleration,
            start_velocity: [0.; NUM_JOINTS],
            end_velocity: [0.; NUM_JOINTS],
        }
    }

    fn validate(&self) -> JakaResult<()> {
        for i in 0..NUM_JOINTS {
            let (v, a) = (self.velocity[i], self.acceleration[i]);
            let (v0, v1) = (self.start_velocity[i], self.end_velocity[i]);
            if !(v.is_finite() && v > 0.) || !(a.is_finite() && a > 0.) {
                return Err(create_parameter_error(format!(
                    "axis {}: velocity and acceleration limits must be positive, got {} and {}",
                    i, v, a
                )));
            }
            if !(v0.is_finite() && v1.is_finite()) || v0 < 0. || v1 < 0. || v0 > v || v1 > v {
                return Err(create_parameter_error(format!(
                    "axis {}: boundary velocities {} and {} must lie within [0, {}]",
                    i, v0, v1, v
                )));
            }
        }
        Ok(())
    }
}

/// Shared tick layout of a synchronized trapezoidal motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    pub pacing_axis: usize,
    pub accel_ticks: usize,
    pub decel_ticks: usize,
    pub total_ticks: usize,
}

/// Builds joint trajectories at a fixed control period.
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryComposer {
    control_period: Duration,
}

impl TrajectoryComposer {
    /// # Errors
    /// * [`ParameterError`](`crate::exception::JakaException::ParameterError`) if the period is zero.
    pub fn new(control_period: Duration) -> JakaResult<Self> {
        if control_period.is_zero() {
            return Err(create_parameter_error("control period must be positive"));
        }
        Ok(TrajectoryComposer { control_period })
    }

    pub fn control_period(&self) -> Duration {
        self.control_period
    }

    /// Interpolates every axis linearly over `round(duration / control_period)` ticks.
    ///
    /// # Errors
    /// * [`PreconditionViolation`](`crate::exception::JakaException::PreconditionViolation`) if the duration is shorter than half a tick.
    /// * [`ParameterError`](`crate::exception::JakaException::ParameterError`) if a joint value is not finite.
    pub fn compose_uniform(
        &self,
        start: &JointVector,
        end: &JointVector,
        duration: f64,
    ) -> JakaResult<Trajectory> {
        ensure_finite(start, "start joints")?;
        ensure_finite(end, "end joints")?;
        let ticks = ticks_for(duration, self.control_period);
        if ticks == 0 {
            return Err(create_precondition_violation(format!(
                "duration {}s is shorter than one control tick",
                duration
            )));
        }
        let mut series = Vec::with_capacity(NUM_JOINTS);
        for i in 0..NUM_JOINTS {
            series.push(average(start[i], end[i], ticks)?);
        }
        Ok(interleave(&series, ticks))
    }

    /// Synchronized trapezoidal motion of all axes.
    ///
    /// The axis with the largest displacement paces the motion (the first one on ties). Its
    /// trapezoid, or its triangular profile if it cannot reach the velocity limit, defines the
    /// initial acceleration, deceleration and total tick counts. Every axis then follows a
    /// trapezoid on these shared ramps, with a cruise velocity chosen from the exact discrete
    /// distance sum so that it covers its displacement in exactly the shared tick count. The
    /// ramps and the total are stretched until every axis stays within its own velocity and
    /// acceleration limit, starting at its start velocity and leaving with its end velocity.
    ///
    /// # Errors
    /// * [`ParameterError`](`crate::exception::JakaException::ParameterError`) if limits are not
    /// positive, a joint value is not finite, or an axis' displacement is too short for its
    /// boundary velocities on the shared ramps.
    pub fn compose_trapezoid(
        &self,
        start: &JointVector,
        end: &JointVector,
        limits: &TrapezoidLimits,
    ) -> JakaResult<Trajectory> {
        ensure_finite(start, "start joints")?;
        ensure_finite(end, "end joints")?;
        limits.validate()?;
        let plan = match self.plan_trapezoid(start, end, limits)? {
            Some(plan) => plan,
            None => return Ok(vec![*end]),
        };
        let t = self.control_period.as_secs_f64();
        let distance = (Vector6::from_row_slice(end) - Vector6::from_row_slice(start)).abs();
        let mut series = Vec::with_capacity(NUM_JOINTS);
        for i in 0..NUM_JOINTS {
            let v0 = limits.start_velocity[i] * t;
            let v1 = limits.end_velocity[i] * t;
            series.push(trapezoid(
                start[i],
                end[i],
                v0,
                v1,
                cruise_step(distance[i], v0, v1, &plan).max(0.),
                plan.accel_ticks,
                plan.decel_ticks,
                plan.total_ticks,
            )?);
        }
        Ok(interleave(&series, plan.total_ticks))
    }

    /// Computes the shared tick layout. Returns `None` if no axis has to move.
    ///
    /// # Errors
    /// * [`ParameterError`](`crate::exception::JakaException::ParameterError`) if limits are not
    /// positive or an axis cannot honor its boundary velocities on the shared ramps.
    pub fn plan_trapezoid(
        &self,
        start: &JointVector,
        end: &JointVector,
        limits: &TrapezoidLimits,
    ) -> JakaResult<Option<TickPlan>> {
        limits.validate()?;
        let t = self.control_period.as_secs_f64();
        let distance = (Vector6::from_row_slice(end) - Vector6::from_row_slice(start)).abs();
        let mut pacing_axis = 0;
        for i in 1..NUM_JOINTS {
            if distance[i] > distance[pacing_axis] {
                pacing_axis = i;
            }
        }
        if distance[pacing_axis] < DELTA_Q_MOTION_FINISHED {
            return Ok(None);
        }

        let p = pacing_axis;
        let (a, v0, v1) = (
            limits.acceleration[p],
            limits.start_velocity[p],
            limits.end_velocity[p],
        );
        let trapezoidal = is_trapezoidal(distance[p], limits, p);
        let peak = if trapezoidal {
            limits.velocity[p]
        } else {
            ((2. * a * distance[p] + v0 * v0 + v1 * v1) / 2.).sqrt()
        };
        let accel_ticks = ticks_ceil((peak - v0) / a / t).max(1);
        let decel_ticks = ticks_ceil((peak - v1) / a / t).max(1);
        let cruise_ticks = if trapezoidal {
            let (accel_distance, decel_distance) = ramp_distances(limits, p);
            ticks_ceil((distance[p] - accel_distance - decel_distance) / peak / t)
        } else {
            0
        };
        let mut plan = TickPlan {
            pacing_axis,
            accel_ticks,
            decel_ticks,
            total_ticks: accel_ticks + decel_ticks + cruise_ticks,
        };

        for _ in 0..MAX_PLAN_ITERATIONS {
            let mut stretch = None;
            for i in 0..NUM_JOINTS {
                stretch = required_stretch(distance[i], limits, i, t, &plan)?;
                if stretch.is_some() {
                    break;
                }
            }
            match stretch {
                None => return Ok(Some(plan)),
                Some(Stretch::Cruise) => plan.total_ticks += 1,
                Some(Stretch::Acceleration) => {
                    plan.accel_ticks += 1;
                    plan.total_ticks += 1;
                }
                Some(Stretch::Deceleration) => {
                    plan.decel_ticks += 1;
                    plan.total_ticks += 1;
                }
            }
        }
        Err(create_parameter_error(format!(
            "no synchronized trapezoid within the limits after {} ticks",
            plan.total_ticks
        )))
    }
}

/// Part of the shared tick layout which has to grow for one axis to stay within its limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stretch {
    Cruise,
    Acceleration,
    Deceleration,
}

fn required_stretch(
    distance: f64,
    limits: &TrapezoidLimits,
    axis: usize,
    t: f64,
    plan: &TickPlan,
) -> JakaResult<Option<Stretch>> {
    let v0 = limits.start_velocity[axis] * t;
    let v1 = limits.end_velocity[axis] * t;
    let max_step = limits.velocity[axis] * t;
    let max_change = limits.acceleration[axis] * t * t;
    let cruise = cruise_step(distance, v0, v1, plan);
    // longer ramps only add distance at the boundary velocities
    if cruise < -LIMIT_TOLERANCE {
        return Err(create_parameter_error(format!(
            "axis {}: displacement {} is too short for boundary velocities {} and {}",
            axis, distance, limits.start_velocity[axis], limits.end_velocity[axis]
        )));
    }
    Ok(if cruise > max_step + LIMIT_TOLERANCE {
        Some(Stretch::Cruise)
    } else if (cruise - v0).abs() > plan.accel_ticks as f64 * max_change + LIMIT_TOLERANCE {
        Some(Stretch::Acceleration)
    } else if (cruise - v1).abs() > plan.decel_ticks as f64 * max_change + LIMIT_TOLERANCE {
        Some(Stretch::Deceleration)
    } else {
        None
    })
}

/// Cruise step which covers `distance` in exactly `plan.total_ticks` ticks. A profile with
/// cruise step `c` covers `c * (n - (accel + decel) / 2)` plus the distance of the boundary
/// velocities during the discrete ramps.
fn cruise_step(distance: f64, v0: f64, v1: f64, plan: &TickPlan) -> f64 {
    let ramp_offset =
        v0 * (plan.accel_ticks as f64 - 1.) / 2. + v1 * (plan.decel_ticks as f64 + 1.) / 2.;
    let half_ramps = (plan.accel_ticks + plan.decel_ticks) as f64 / 2.;
    (distance - ramp_offset) / (plan.total_ticks as f64 - half_ramps)
}

fn ramp_distances(limits: &TrapezoidLimits, axis: usize) -> (f64, f64) {
    let v = limits.velocity[axis];
    let a = limits.acceleration[axis];
    let v0 = limits.start_velocity[axis];
    let v1 = limits.end_velocity[axis];
    ((v * v - v0 * v0) / (2. * a), (v * v - v1 * v1) / (2. * a))
}

fn is_trapezoidal(distance: f64, limits: &TrapezoidLimits, axis: usize) -> bool {
    let (accel_distance, decel_distance) = ramp_distances(limits, axis);
    distance >= accel_distance + decel_distance
}

fn ticks_ceil(ticks: f64) -> usize {
    (ticks - 1e-9).ceil().max(0.) as usize
}

fn interleave(series: &[Vec<f64>], ticks: usize) -> Trajectory {
    (0..ticks)
        .map(|t| {
            let mut joints = [0.; NUM_JOINTS];
            for (i, axis) in series.iter().enumerate() {
                joints[i] = axis[t];
            }
            joints
        })
        .collect()
}
