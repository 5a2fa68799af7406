// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! # libjaka-rs
//! libjaka-rs is a library to drive 6-axis JAKA arms in real time. It turns motion requests
//! into dense joint trajectories and streams them to the controller, one command per control
//! period.
//!
//! **ALWAYS HAVE THE USER STOP BUTTON AT
//! HAND WHILE CONTROLLING THE ROBOT!**
//!
//! ## Design
//! The controller connection and the inverse kinematics are not part of this library. They
//! are plugged in through two traits:
//! * [`Actuator`](`crate::robot::actuator::Actuator`) - power, enable, single-shot moves, jog and
//! the servo (streaming) interface of the controller.
//! * [`Kinematics`](`crate::robot::kinematics::Kinematics`) - inverse kinematics with a joint
//! reference.
//!
//! The library is divided into the following modules:
//! * [trajectory](`crate::trajectory`) - single-axis profiles and the multi-axis composers.
//! * [robot](`crate::robot`) - servo streaming loop, request resolution, telemetry, connection
//! monitoring and the [`Driver`](`crate::robot::driver::Driver`) tying them together.
//! * [config](`crate::config`) - the [`DriverConfig`](`crate::config::DriverConfig`), loadable from TOML.
//!
//! # Example:
//!```no_run
//! use jaka::{
//!     request_channel, Actuator, CancelToken, ConnectionMonitor, Driver, DriverConfig,
//!     JakaResult, Kinematics, NullSink,
//! };
//! fn serve<A: Actuator, K: Kinematics>(actuator: A, kinematics: K) -> JakaResult<()> {
//!     let config = DriverConfig::from_file("driver.toml")?;
//!     let monitor = ConnectionMonitor::start(|| true, config.monitor.period());
//!     let mut driver =
//!         Driver::new(actuator, kinematics, config)?.with_connection_health(monitor.health());
//!     driver.bring_up()?;
//!     let (handle, requests) = request_channel(driver.session());
//!     std::thread::spawn(move || {
//!         let response = handle.move_joint([0.; 6], 0.5, 1.0, true, std::time::Duration::from_secs(30));
//!         println!("{:?}", response);
//!     });
//!     driver.run(&requests, &mut NullSink, &CancelToken::new())
//! }
//! ```
//!
//! Every fallible function returns a [`JakaResult`] whose error is a
//! [`JakaException`](`crate::exception::JakaException`). Servo sessions fail fast: a rejected
//! command aborts the motion and the remaining ticks are never sent.
//!
//! ## Trajectories
//! The composers can be used without a robot:
//!```
//! use std::time::Duration;
//! use jaka::TrajectoryComposer;
//! let composer = TrajectoryComposer::new(Duration::from_millis(8)).unwrap();
//! let trajectory = composer.compose_uniform(&[0.; 6], &[0.8; 6], 0.8).unwrap();
//! assert_eq!(trajectory.len(), 100);
//! assert_eq!(trajectory[99], [0.8; 6]);
//! ```

pub mod config;
pub mod exception;
pub mod robot;
pub mod trajectory;
pub mod utils;

pub use config::DriverConfig;
pub use exception::{JakaException, JakaResult};
pub use robot::actuator::Actuator;
pub use robot::control_types::*;
pub use robot::driver::Driver;
pub use robot::error::ErrorCode;
pub use robot::kinematics::Kinematics;
pub use robot::monitor::{ConnectionHealth, ConnectionMonitor};
pub use robot::service_types::{request_channel, DriverHandle, DriverRequest};
pub use robot::telemetry::{NullSink, TelemetrySink};
pub use robot::types::*;
pub use trajectory::{Trajectory, TrajectoryComposer, TrapezoidLimits};
pub use utils::*;
