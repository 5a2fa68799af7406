// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the [`Driver`](`crate::robot::driver::Driver`) and everything it needs to talk to
//! the arm.

pub mod actuator;
mod control_tools;
pub mod control_types;
pub mod driver;
pub mod error;
pub mod kinematics;
pub mod logger;
pub mod monitor;
pub mod resolver;
pub mod servo_loop;
pub mod service_types;
pub mod session;
pub mod telemetry;
pub mod types;
