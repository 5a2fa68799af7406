// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains exception and Result definitions
use crate::robot::error::describe_status;
use crate::robot::logger::Record;
use std::time::Duration;
use thiserror::Error;

/// Represents all kind of errors which can occur while planning or executing a motion.
#[derive(Error, Debug)]
pub enum JakaException {
    /// ParameterError is returned if a request is malformed, e.g. an out-of-range jog index or
    /// a non-finite joint value.
    #[error("{message}")]
    ParameterError { message: String },

    /// ActuatorRejected is returned if the actuator answers a motion or servo command with a
    /// non-zero status. Inside a servo session the error holds the last submitted commands.
    #[error("actuator rejected command: {}", describe_status(*status))]
    ActuatorRejected {
        /// Raw status code reported by the actuator. Never zero.
        status: i32,
        /// Commands submitted just before the rejection, oldest first.
        log: Option<Vec<Record>>,
    },

    /// ActuatorUnavailable is returned if the actuator refuses to enter streaming mode.
    #[error("actuator unavailable for streaming: {}", describe_status(*status))]
    ActuatorUnavailable { status: i32 },

    /// KinematicsUnreachable is returned if the inverse kinematics has no solution for a target.
    #[error("{message}")]
    KinematicsUnreachable { message: String },

    /// CommunicationError is returned if the connection to the controller is lost.
    #[error("{message}")]
    CommunicationError { message: String },

    /// PreconditionViolation is returned if an operation is requested in a state where it is
    /// undefined, e.g. a trajectory with zero ticks.
    #[error("{message}")]
    PreconditionViolation { message: String },

    /// CommandTimeout is returned if a single servo command took longer than the configured
    /// bound. The motion has been aborted.
    #[error("servo command at tick {tick} took {elapsed:?} (limit {limit:?})")]
    CommandTimeout {
        tick: usize,
        elapsed: Duration,
        limit: Duration,
    },

    /// RealTimeException is returned if the real-time priority cannot be set
    #[error("{message}")]
    RealTimeException { message: String },

    /// ConfigException is returned if a configuration cannot be read or is inconsistent.
    #[error("{message}")]
    ConfigException { message: String },
}

/// creates a ParameterError from anything printable
pub(crate) fn create_parameter_error(message: impl Into<String>) -> JakaException {
    JakaException::ParameterError {
        message: message.into(),
    }
}

/// creates a PreconditionViolation from anything printable
pub(crate) fn create_precondition_violation(message: impl Into<String>) -> JakaException {
    JakaException::PreconditionViolation {
        message: message.into(),
    }
}

/// Result type which can have JakaException as Error
pub type JakaResult<T> = Result<T, JakaException>;
