// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the request, response and outcome types of the motion interface.

use crate::config::JogConfig;
use crate::exception::{create_parameter_error, JakaResult};
use crate::robot::error::describe_status;
use crate::robot::types::{CoordType, JointVector, NUM_JOINTS};
use serde::Deserialize;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Used to decide whether to enforce realtime mode for the servo streaming thread.
/// see [`ServoConfig`](`crate::config::ServoConfig`)
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RealtimeConfig {
    Enforce,
    Ignore,
}

/// Message of a successfully executed single-shot move.
pub const CMD_EXECUTED: &str = "cmd has been executed!";
/// Message of a jog request that repeats the active jog.
pub const JOG_STILL_MOVING: &str = "still moving";
/// Message of a newly started jog.
pub const JOG_STARTED: &str = "jog started";

/// Direction of a jog along its axis.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum JogDirection {
    Positive,
    Negative,
}

impl JogDirection {
    pub fn sign(&self) -> f64 {
        match self {
            JogDirection::Positive => 1.,
            JogDirection::Negative => -1.,
        }
    }
}

/// A decoded jog request.
///
/// Indices come in pairs per axis: `0` is axis 0 positive, `1` is axis 0 negative, `2` is axis 1
/// positive and so on up to `11`. In Cartesian frames the axes are x, y, z, rx, ry, rz.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct JogCommand {
    pub index: i32,
    pub axis: usize,
    pub direction: JogDirection,
    pub coord: CoordType,
}

impl JogCommand {
    /// Decodes a jog index and a coordinate mode (0 joint, 1 base, 2 tool).
    ///
    /// # Errors
    /// * [`ParameterError`](`crate::exception::JakaException::ParameterError`) if the index is not in
    /// `0..=11` or the coordinate mode is unknown.
    pub fn from_index(index: i32, coord_mode: i32) -> JakaResult<Self> {
        if !(0..2 * NUM_JOINTS as i32).contains(&index) {
            return Err(create_parameter_error(format!(
                "jog index {} is out of range 0..={}",
                index,
                2 * NUM_JOINTS - 1
            )));
        }
        let coord = match coord_mode {
            0 => CoordType::Joint,
            1 => CoordType::Base,
            2 => CoordType::Tool,
            _ => {
                return Err(create_parameter_error(format!(
                    "unknown jog coordinate mode {}",
                    coord_mode
                )))
            }
        };
        let direction = if index % 2 == 0 {
            JogDirection::Positive
        } else {
            JogDirection::Negative
        };
        Ok(JogCommand {
            index,
            axis: (index / 2) as usize,
            direction,
            coord,
        })
    }

    /// True for the orientation axes of a Cartesian jog.
    pub fn is_rotational(&self) -> bool {
        self.coord != CoordType::Joint && self.axis >= 3
    }

    /// Signed jog velocity in \[rad/s\] or \[mm/s\].
    pub fn velocity(&self, config: &JogConfig) -> f64 {
        let speed = if self.coord == CoordType::Joint {
            config.joint_velocity
        } else if self.is_rotational() {
            config.rotational_velocity
        } else {
            config.translational_velocity
        };
        self.direction.sign() * speed
    }
}

/// A motion request after decoding. Consumed immediately by the resolver.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub enum MotionTarget {
    /// Linear move to a tool pose, translation in \[m\], speed in \[m/s\], acceleration in \[m/s²\].
    AbsoluteLinear {
        pose: [f64; 6],
        speed: f64,
        acceleration: f64,
        blocking: bool,
    },
    /// Joint move, speed in \[rad/s\], acceleration in \[rad/s²\].
    AbsoluteJoint {
        joints: JointVector,
        speed: f64,
        acceleration: f64,
        blocking: bool,
    },
    Jog(JogCommand),
}

/// Answer to a single-shot request.
///
/// `ret` is `1` for a success and the raw actuator status otherwise.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommandResponse {
    pub ok: bool,
    pub ret: i32,
    pub message: String,
}

impl CommandResponse {
    pub fn success(message: impl Into<String>) -> Self {
        CommandResponse {
            ok: true,
            ret: 1,
            message: message.into(),
        }
    }

    /// Response for a rejected command, carrying the symbolic name of `status`.
    pub fn rejected(status: i32) -> Self {
        CommandResponse {
            ok: false,
            ret: status,
            message: describe_status(status),
        }
    }

    /// Maps a raw status: zero gives a success with `message`.
    pub fn from_status(status: i32, message: &str) -> Self {
        if status == 0 {
            CommandResponse::success(message)
        } else {
            CommandResponse::rejected(status)
        }
    }

    /// Response for a request that never reached the actuator.
    pub fn invalid(error: impl ToString) -> Self {
        CommandResponse {
            ok: false,
            ret: 0,
            message: error.to_string(),
        }
    }
}

/// Result of a servo streaming session that did not fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ServoOutcome {
    /// All ticks were submitted.
    Completed { ticks: usize },
    /// The session was cancelled after `played` ticks. The motion was aborted.
    Cancelled { played: usize },
}

/// Shared flag to stop a running servo session or driver loop between two ticks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
    /// Clears the flag so the token can be used for the next session.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelToken, CommandResponse, JogCommand, JogDirection};
    use crate::config::JogConfig;
    use crate::exception::JakaException;
    use crate::robot::types::CoordType;

    #[test]
    fn jog_index_mapping() {
        let jog = JogCommand::from_index(5, 1).unwrap();
        assert_eq!(jog.axis, 2);
        assert_eq!(jog.direction, JogDirection::Negative);
        assert_eq!(jog.coord, CoordType::Base);
        assert!(!jog.is_rotational());

        let jog = JogCommand::from_index(6, 2).unwrap();
        assert_eq!(jog.axis, 3);
        assert_eq!(jog.direction, JogDirection::Positive);
        assert_eq!(jog.coord, CoordType::Tool);
        assert!(jog.is_rotational());

        assert!(!JogCommand::from_index(11, 0).unwrap().is_rotational());
    }

    #[test]
    fn jog_out_of_range_is_rejected() {
        for (index, coord_mode) in [(-1, 0), (12, 0), (0, 3), (0, -1)] {
            assert!(matches!(
                JogCommand::from_index(index, coord_mode),
                Err(JakaException::ParameterError { .. })
            ));
        }
    }

    #[test]
    fn jog_velocity_by_frame() {
        let config = JogConfig::default();
        let two_degrees = 2f64.to_radians();
        let joint = JogCommand::from_index(1, 0).unwrap();
        assert!((joint.velocity(&config) + two_degrees).abs() < 1e-12);
        let translation = JogCommand::from_index(4, 1).unwrap();
        assert_eq!(translation.velocity(&config), 2.);
        let rotation = JogCommand::from_index(9, 2).unwrap();
        assert!((rotation.velocity(&config) + two_degrees).abs() < 1e-12);
    }

    #[test]
    fn responses_map_status() {
        let ok = CommandResponse::from_status(0, "done");
        assert!(ok.ok);
        assert_eq!(ok.ret, 1);
        let rejected = CommandResponse::from_status(-7, "done");
        assert!(!rejected.ok);
        assert_eq!(rejected.ret, -7);
        assert_eq!(rejected.message, "ERR_NOT_ENABLED");
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!clone.is_cancelled());
    }
}
