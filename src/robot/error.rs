// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later
//! Defines the status codes the actuator reports for its commands.
use std::fmt::{Debug, Display, Formatter, Result};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Non-zero status codes of the actuator. Zero means success and has no variant.
#[derive(Serialize_repr, Deserialize_repr, Debug, PartialEq, Eq, Copy, Clone)]
#[repr(i32)]
#[derive(FromPrimitive, ToPrimitive)]
pub enum ErrorCode {
    /// The controller could not execute the function call.
    FunctionCallError = 2,
    /// The connection handle is invalid, e.g. not logged in.
    InvalidHandler = -1,
    /// A parameter of the command is invalid.
    InvalidParameter = -2,
    /// Communication with the controller failed.
    CommunicationError = -3,
    /// The inverse kinematics of the controller failed.
    KineInverseError = -4,
    /// The emergency stop is pressed.
    EmergencyPressed = -5,
    /// The robot is not powered.
    NotPowered = -6,
    /// The robot is not enabled.
    NotEnabled = -7,
    /// Servo mode is disabled.
    DisableServoMode = -8,
    /// The robot is not in the off-enable state.
    NotOffEnable = -9,
    /// A program is running.
    ProgramIsRunning = -10,
    /// A file could not be opened.
    CannotOpenFile = -11,
    /// The motion became abnormal.
    MotionAbnormal = -12,
}

/// Coarse classes of actuator errors.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ErrorCategory {
    EmergencyStop,
    Communication,
    Kinematics,
    Parameter,
    Precondition,
    Motion,
}

impl ErrorCode {
    /// Maps a raw status to its code. Returns `None` for success and for unknown codes.
    pub fn from_status(status: i32) -> Option<ErrorCode> {
        ErrorCode::from_i32(status)
    }

    /// Symbolic name as reported by the controller SDK.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::FunctionCallError => "ERR_FUCTION_CALL_ERROR",
            ErrorCode::InvalidHandler => "ERR_INVALID_HANDLER",
            ErrorCode::InvalidParameter => "ERR_INVALID_PARAMETER",
            ErrorCode::CommunicationError => "ERR_COMMUNICATION_ERR",
            ErrorCode::KineInverseError => "ERR_KINE_INVERSE_ERR",
            ErrorCode::EmergencyPressed => "ERR_EMERGENCY_PRESSED",
            ErrorCode::NotPowered => "ERR_NOT_POWERED",
            ErrorCode::NotEnabled => "ERR_NOT_ENABLED",
            ErrorCode::DisableServoMode => "ERR_DISABLE_SERVOMODE",
            ErrorCode::NotOffEnable => "ERR_NOT_OFF_ENABLE",
            ErrorCode::ProgramIsRunning => "ERR_PROGRAM_IS_RUNNING",
            ErrorCode::CannotOpenFile => "ERR_CANNOT_OPEN_FILE",
            ErrorCode::MotionAbnormal => "ERR_MOTION_ABNORMAL",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorCode::EmergencyPressed => ErrorCategory::EmergencyStop,
            ErrorCode::CommunicationError | ErrorCode::InvalidHandler => {
                ErrorCategory::Communication
            }
            ErrorCode::KineInverseError => ErrorCategory::Kinematics,
            ErrorCode::InvalidParameter | ErrorCode::CannotOpenFile => ErrorCategory::Parameter,
            ErrorCode::NotPowered
            | ErrorCode::NotEnabled
            | ErrorCode::DisableServoMode
            | ErrorCode::NotOffEnable
            | ErrorCode::ProgramIsRunning => ErrorCategory::Precondition,
            ErrorCode::FunctionCallError | ErrorCode::MotionAbnormal => ErrorCategory::Motion,
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "{}", self.name())
    }
}

/// Human readable name of a raw status, including unknown codes.
pub fn describe_status(status: i32) -> String {
    match ErrorCode::from_status(status) {
        Some(code) => code.name().to_string(),
        None if status == 0 => "OK".to_string(),
        None => format!("ERR_UNKNOWN({})", status),
    }
}
