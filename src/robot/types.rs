// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

use serde::Deserialize;
use serde::Serialize;
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Number of actuated axes.
pub const NUM_JOINTS: usize = 6;

/// Joint positions of all six axes in \[rad\].
pub type JointVector = [f64; NUM_JOINTS];

/// Tool pose: translation in \[mm\] and roll/pitch/yaw orientation in \[rad\].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct CartesianPose {
    pub translation: [f64; 3],
    pub rpy: [f64; 3],
}

impl CartesianPose {
    /// Creates a pose from `[x, y, z, rx, ry, rz]` in \[mm\] and \[rad\].
    pub fn from_array(pose: &[f64; 6]) -> Self {
        CartesianPose {
            translation: [pose[0], pose[1], pose[2]],
            rpy: [pose[3], pose[4], pose[5]],
        }
    }

    /// Creates a pose from `[x, y, z, rx, ry, rz]` given in \[m\] and \[rad\].
    pub fn from_meters(pose: &[f64; 6]) -> Self {
        let mut out = CartesianPose::from_array(pose);
        out.translation.iter_mut().for_each(|x| *x *= 1000.);
        out
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.translation[0],
            self.translation[1],
            self.translation[2],
            self.rpy[0],
            self.rpy[1],
            self.rpy[2],
        ]
    }

    /// `[x, y, z, rx, ry, rz]` with the translation in \[m\].
    pub fn to_meters(&self) -> [f64; 6] {
        let mut out = self.to_array();
        out.iter_mut().take(3).for_each(|x| *x /= 1000.);
        out
    }
}

/// Interpretation of a motion target.
#[derive(Serialize_repr, Deserialize_repr, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum MoveMode {
    Absolute,
    Incremental,
    Continuous,
}

/// Frame in which a jog moves.
#[derive(Serialize_repr, Deserialize_repr, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum CoordType {
    Joint,
    Base,
    Tool,
}

#[derive(Serialize_repr, Deserialize_repr, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum ProgramState {
    Idle,
    Running,
    Paused,
}

impl Default for ProgramState {
    fn default() -> Self {
        ProgramState::Idle
    }
}

/// Snapshot of the actuator status. Only ever read by this crate.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct ActuatorStatus {
    pub enabled: bool,
    pub powered_on: bool,
    pub in_position: bool,
    pub program_state: ProgramState,
    /// Controller error code, zero if there is no error.
    pub error_code: i32,
    pub collision: bool,
    pub socket_connected: bool,
    pub emergency_stop: bool,
    /// True while the arm is hand-guided.
    pub dragging: bool,
}

/// Coarse state of the robot as published in the telemetry.
#[derive(Serialize_repr, Deserialize_repr, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum RobotStateClass {
    InPosition = 0,
    Paused = 1,
    EmergencyStop = 2,
    Moving = 3,
    Error = 4,
}

impl RobotStateClass {
    /// Classifies a status. Higher severity always wins over the remaining flags.
    pub fn classify(status: &ActuatorStatus) -> Self {
        if status.emergency_stop {
            RobotStateClass::EmergencyStop
        } else if status.error_code != 0 {
            RobotStateClass::Error
        } else if status.in_position
            && status.program_state == ProgramState::Idle
            && !status.dragging
        {
            RobotStateClass::InPosition
        } else if status.program_state == ProgramState::Paused {
            RobotStateClass::Paused
        } else {
            RobotStateClass::Moving
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ActuatorStatus, CartesianPose, ProgramState, RobotStateClass};

    fn idle_in_position() -> ActuatorStatus {
        ActuatorStatus {
            enabled: true,
            powered_on: true,
            in_position: true,
            socket_connected: true,
            ..Default::default()
        }
    }

    #[test]
    fn emergency_stop_wins_over_everything() {
        let mut status = idle_in_position();
        status.emergency_stop = true;
        status.error_code = 7;
        status.program_state = ProgramState::Paused;
        assert_eq!(
            RobotStateClass::classify(&status),
            RobotStateClass::EmergencyStop
        );
    }

    #[test]
    fn error_wins_over_in_position() {
        let mut status = idle_in_position();
        status.error_code = 7;
        assert_eq!(RobotStateClass::classify(&status), RobotStateClass::Error);
    }

    #[test]
    fn classification_precedence() {
        let status = idle_in_position();
        assert_eq!(
            RobotStateClass::classify(&status),
            RobotStateClass::InPosition
        );

        let mut dragged = idle_in_position();
        dragged.dragging = true;
        assert_eq!(RobotStateClass::classify(&dragged), RobotStateClass::Moving);

        let mut paused = idle_in_position();
        paused.program_state = ProgramState::Paused;
        assert_eq!(RobotStateClass::classify(&paused), RobotStateClass::Paused);

        let mut running = idle_in_position();
        running.program_state = ProgramState::Running;
        assert_eq!(RobotStateClass::classify(&running), RobotStateClass::Moving);

        let mut travelling = idle_in_position();
        travelling.in_position = false;
        assert_eq!(
            RobotStateClass::classify(&travelling),
            RobotStateClass::Moving
        );
    }

    #[test]
    fn pose_unit_conversion() {
        let pose = CartesianPose::from_meters(&[0.1, -0.2, 0.3, 0.1, 0.2, 0.3]);
        for (a, b) in pose.translation.iter().zip([100., -200., 300.].iter()) {
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(pose.rpy, [0.1, 0.2, 0.3]);
        let back = pose.to_meters();
        for (a, b) in back.iter().zip([0.1, -0.2, 0.3, 0.1, 0.2, 0.3].iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
