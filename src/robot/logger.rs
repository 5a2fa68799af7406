// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the logging type definitions for [`ActuatorRejected`](`crate::exception::JakaException::ActuatorRejected`)
use crate::robot::types::JointVector;
use std::collections::VecDeque;

/// One row of the log contains the servo command submitted at tick n and the status the
/// actuator answered with.
/// Provided by the [`ActuatorRejected`](`crate::exception::JakaException::ActuatorRejected`) error.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Record {
    /// Index of the tick inside the trajectory.
    pub tick: usize,
    /// Absolute joint command of this tick.
    pub command: JointVector,
    /// Status reported by the actuator.
    pub status: i32,
}

impl Record {
    /// creates a string representation based on the debug formatter
    pub fn log(&self) -> String {
        format!("{:?}", self)
    }
}

pub(crate) struct Logger {
    records: VecDeque<Record>,
    log_size: usize,
}

impl Logger {
    pub fn new(log_size: usize) -> Self {
        Logger {
            records: VecDeque::with_capacity(log_size),
            log_size,
        }
    }
    pub fn log(&mut self, record: Record) {
        if self.log_size == 0 {
            return;
        }
        if self.records.len() == self.log_size {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }
    /// returns the logged records, oldest first, and empties the log.
    pub fn flush(&mut self) -> Vec<Record> {
        self.records.drain(..).collect()
    }
}
