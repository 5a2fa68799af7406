// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the requests understood by the [`Driver`](`crate::robot::driver::Driver`) and a
//! [`DriverHandle`] to send them from other threads.
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::exception::{JakaException, JakaResult};
use crate::robot::control_types::CommandResponse;
use crate::robot::session::ServoSession;
use crate::robot::types::JointVector;

/// Capacity of the request queue of a driver.
pub const REQUEST_QUEUE_SIZE: usize = 10;

#[derive(Debug)]
pub enum DriverRequest {
    /// Linear move, pose in \[m\] and \[rad\], speed in \[m/s\], acceleration in \[m/s²\].
    MoveLinear {
        pose: [f64; 6],
        speed: f64,
        acceleration: f64,
        blocking: bool,
        reply: Sender<CommandResponse>,
    },
    MoveJoint {
        joints: JointVector,
        speed: f64,
        acceleration: f64,
        blocking: bool,
        reply: Sender<CommandResponse>,
    },
    /// Jog by index `0..=11` in coordinate mode 0 joint, 1 base or 2 tool.
    Jog {
        index: i32,
        coord_mode: i32,
        reply: Sender<CommandResponse>,
    },
    Stop {
        reply: Sender<CommandResponse>,
    },
    EnableRobot {
        reply: Sender<CommandResponse>,
    },
    DisableRobot {
        reply: Sender<CommandResponse>,
    },
}

/// Creates the request queue of a driver. Servo targets bypass the queue and are written to
/// `session`, see [`DriverHandle::servo_target`].
pub fn request_channel(session: ServoSession) -> (DriverHandle, Receiver<DriverRequest>) {
    let (tx, rx) = crossbeam_channel::bounded(REQUEST_QUEUE_SIZE);
    (DriverHandle { tx, session }, rx)
}

fn channel_closed() -> JakaException {
    JakaException::CommunicationError {
        message: "driver request queue is closed".to_string(),
    }
}

/// Sending side of the request queue. Cloning the handle is cheap.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: Sender<DriverRequest>,
    session: ServoSession,
}

impl DriverHandle {
    /// Sends a request and waits at most `timeout` for its answer.
    ///
    /// # Errors
    /// * [`CommunicationError`](`crate::exception::JakaException::CommunicationError`) if the
    /// driver is gone or did not answer in time.
    pub fn call(
        &self,
        timeout: Duration,
        request: impl FnOnce(Sender<CommandResponse>) -> DriverRequest,
    ) -> JakaResult<CommandResponse> {
        let (reply, response) = crossbeam_channel::bounded(1);
        self.tx
            .send_timeout(request(reply), timeout)
            .map_err(|_| channel_closed())?;
        response
            .recv_timeout(timeout)
            .map_err(|e| JakaException::CommunicationError {
                message: format!("no response from driver: {}", e),
            })
    }

    pub fn move_linear(
        &self,
        pose: [f64; 6],
        speed: f64,
        acceleration: f64,
        blocking: bool,
        timeout: Duration,
    ) -> JakaResult<CommandResponse> {
        self.call(timeout, |reply| DriverRequest::MoveLinear {
            pose,
            speed,
            acceleration,
            blocking,
            reply,
        })
    }

    pub fn move_joint(
        &self,
        joints: JointVector,
        speed: f64,
        acceleration: f64,
        blocking: bool,
        timeout: Duration,
    ) -> JakaResult<CommandResponse> {
        self.call(timeout, |reply| DriverRequest::MoveJoint {
            joints,
            speed,
            acceleration,
            blocking,
            reply,
        })
    }

    pub fn jog(&self, index: i32, coord_mode: i32, timeout: Duration) -> JakaResult<CommandResponse> {
        self.call(timeout, |reply| DriverRequest::Jog {
            index,
            coord_mode,
            reply,
        })
    }

    pub fn stop(&self, timeout: Duration) -> JakaResult<CommandResponse> {
        self.call(timeout, |reply| DriverRequest::Stop { reply })
    }

    pub fn enable_robot(&self, timeout: Duration) -> JakaResult<CommandResponse> {
        self.call(timeout, |reply| DriverRequest::EnableRobot { reply })
    }

    pub fn disable_robot(&self, timeout: Duration) -> JakaResult<CommandResponse> {
        self.call(timeout, |reply| DriverRequest::DisableRobot { reply })
    }

    /// Publishes a servo target, pose in \[m\] and \[rad\], without waiting. Only the latest
    /// target is kept: a target which arrives before the driver took the previous one replaces
    /// it.
    ///
    /// # Errors
    /// * [`ParameterError`](`crate::exception::JakaException::ParameterError`) if a value is not finite.
    pub fn servo_target(&self, pose: [f64; 6], servo_mode_active: bool) -> JakaResult<()> {
        self.session.submit_target(&pose, servo_mode_active)
    }
}
