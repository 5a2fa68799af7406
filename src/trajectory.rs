// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the trajectory generators which turn sparse joint targets into one joint vector
//! per control tick.

pub mod composer;
pub mod profile;

pub use composer::{TickPlan, Trajectory, TrajectoryComposer, TrapezoidLimits};
