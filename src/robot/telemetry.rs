// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the telemetry messages and the sampler which produces them.
use serde::Serialize;
use tracing::trace;

use crate::exception::JakaResult;
use crate::robot::actuator::Actuator;
use crate::robot::session::ServoSession;
use crate::robot::types::{ActuatorStatus, JointVector, RobotStateClass, NUM_JOINTS};
#[cfg(test)]
use mockall::automock;

/// Names under which the joint states are published.
pub const JOINT_NAMES: [&str; NUM_JOINTS] =
    ["joint_1", "joint_2", "joint_3", "joint_4", "joint_5", "joint_6"];

/// Operating mode reported in every robot state message.
pub const ROBOT_MODE: u8 = 2;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct JointStates {
    pub name: Vec<String>,
    /// Joint positions in \[rad\].
    pub position: JointVector,
}

impl JointStates {
    pub fn new(position: JointVector) -> Self {
        JointStates {
            name: JOINT_NAMES.iter().map(|n| n.to_string()).collect(),
            position,
        }
    }
}

/// Coarse robot state message.
#[derive(Serialize, Debug, Copy, Clone, PartialEq)]
pub struct RobotStateSummary {
    pub state: RobotStateClass,
    pub mode: u8,
    /// True while the robot is powered on.
    pub motor_sync: bool,
    /// True while the robot is enabled.
    pub servo_enable: bool,
    pub collision_state: bool,
    /// Latest result of the connection monitor.
    pub connected: bool,
}

impl RobotStateSummary {
    pub fn new(status: &ActuatorStatus, connected: bool) -> Self {
        RobotStateSummary {
            state: RobotStateClass::classify(status),
            mode: ROBOT_MODE,
            motor_sync: status.powered_on,
            servo_enable: status.enabled,
            collision_state: status.collision,
            connected,
        }
    }
}

/// One telemetry sample.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    /// Tool pose, translation in \[m\], orientation in \[rad\].
    pub tool_pose: [f64; 6],
    pub joint_states: JointStates,
    pub robot_state: RobotStateSummary,
}

/// Debug channels of a servo segment, published once per played tick.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct DebugSample {
    /// z of the servo target in \[mm\].
    pub expected_z: f64,
    /// z of the latest measured tool pose in \[m\].
    pub measured_z: f64,
    pub measured_joint_2: f64,
    pub measured_joint_3: f64,
    pub commanded_joint_2: f64,
}

/// Receiver of the published telemetry.
#[cfg_attr(test, automock)]
pub trait TelemetrySink {
    fn publish_state(&mut self, sample: &TelemetrySample);
    fn publish_debug(&mut self, sample: &DebugSample);
}

/// A sink which drops everything.
#[derive(Debug, Default, Copy, Clone)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn publish_state(&mut self, _sample: &TelemetrySample) {}
    fn publish_debug(&mut self, _sample: &DebugSample) {}
}

/// Latest measured tool pose in \[m\] and joints.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Measurement {
    tool_pose: [f64; 6],
    joints: JointVector,
}

/// Samples the actuator and keeps the session's joint reference current.
#[derive(Debug, Clone)]
pub struct TelemetrySampler {
    session: ServoSession,
    last: Option<TelemetrySample>,
    measured: Option<Measurement>,
}

impl TelemetrySampler {
    pub fn new(session: ServoSession) -> Self {
        TelemetrySampler {
            session,
            last: None,
            measured: None,
        }
    }

    /// Reads tool pose, joints and status from the actuator and stores the joints as the
    /// current joint reference.
    ///
    /// # Errors
    /// Propagates the errors of the actuator queries. The session is left untouched then.
    pub fn sample<A: Actuator>(&mut self, actuator: &A, connected: bool) -> JakaResult<TelemetrySample> {
        let tool = actuator.tcp_position()?;
        let joints = actuator.joint_position()?;
        let status = actuator.status()?;
        self.session.set_current_joint(joints);
        let sample = TelemetrySample {
            tool_pose: tool.to_meters(),
            joint_states: JointStates::new(joints),
            robot_state: RobotStateSummary::new(&status, connected),
        };
        trace!("telemetry {:?}", sample.robot_state);
        self.measured = Some(Measurement {
            tool_pose: sample.tool_pose,
            joints,
        });
        self.last = Some(sample.clone());
        Ok(sample)
    }

    /// Reads tool pose and joints only, for the debug channels of a running servo segment.
    /// The joints become the current joint reference.
    ///
    /// # Errors
    /// Propagates the errors of the actuator queries. The session is left untouched then.
    pub fn measure<A: Actuator>(&mut self, actuator: &A) -> JakaResult<()> {
        let tool = actuator.tcp_position()?;
        let joints = actuator.joint_position()?;
        self.session.set_current_joint(joints);
        self.measured = Some(Measurement {
            tool_pose: tool.to_meters(),
            joints,
        });
        Ok(())
    }

    /// The most recent successful sample.
    pub fn last(&self) -> Option<&TelemetrySample> {
        self.last.as_ref()
    }

    /// Debug channels for a played servo point.
    pub fn debug_sample(&self, expected_z: f64, command: &JointVector) -> DebugSample {
        let mut sample = DebugSample {
            expected_z,
            commanded_joint_2: command[1],
            ..Default::default()
        };
        if let Some(measured) = self.measured.as_ref() {
            sample.measured_z = measured.tool_pose[2];
            sample.measured_joint_2 = measured.joints[1];
            sample.measured_joint_3 = measured.joints[2];
        }
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::{TelemetrySampler, JOINT_NAMES, ROBOT_MODE};
    use crate::exception::JakaException;
    use crate::robot::actuator::MockActuator;
    use crate::robot::session::ServoSession;
    use crate::robot::types::{ActuatorStatus, CartesianPose, RobotStateClass};
    use mockall::Sequence;

    #[test]
    fn sample_converts_units_and_feeds_the_session() {
        let session = ServoSession::new();
        let mut actuator = MockActuator::new();
        actuator
            .expect_tcp_position()
            .returning(|| Ok(CartesianPose::from_array(&[500., -250., 1000., 0.1, 0.2, 0.3])));
        actuator
            .expect_joint_position()
            .returning(|| Ok([0.1, 0.2, 0.3, 0.4, 0.5, 0.6]));
        actuator.expect_status().returning(|| {
            Ok(ActuatorStatus {
                powered_on: true,
                enabled: true,
                collision: true,
                in_position: true,
                ..Default::default()
            })
        });
        let mut sampler = TelemetrySampler::new(session.clone());
        let sample = sampler.sample(&actuator, true).unwrap();
        let expected = [0.5, -0.25, 1.0, 0.1, 0.2, 0.3];
        for (a, b) in sample.tool_pose.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(sample.joint_states.name, JOINT_NAMES.to_vec());
        assert_eq!(session.snapshot().current_joint, [0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        let state = sample.robot_state;
        assert_eq!(state.state, RobotStateClass::InPosition);
        assert_eq!(state.mode, ROBOT_MODE);
        assert!(state.motor_sync && state.servo_enable && state.collision_state && state.connected);

        let debug = sampler.debug_sample(300., &[0., 0.7, 0., 0., 0., 0.]);
        assert_eq!(debug.expected_z, 300.);
        assert_eq!(debug.measured_z, 1.0);
        assert_eq!(debug.measured_joint_2, 0.2);
        assert_eq!(debug.measured_joint_3, 0.3);
        assert_eq!(debug.commanded_joint_2, 0.7);
    }

    #[test]
    fn failed_query_keeps_the_reference() {
        let session = ServoSession::new();
        session.set_current_joint([1.; 6]);
        let mut actuator = MockActuator::new();
        actuator
            .expect_tcp_position()
            .returning(|| Ok(CartesianPose::default()));
        actuator.expect_joint_position().returning(|| {
            Err(JakaException::CommunicationError {
                message: "socket closed".to_string(),
            })
        });
        let mut sampler = TelemetrySampler::new(session.clone());
        assert!(sampler.sample(&actuator, false).is_err());
        assert!(sampler.last().is_none());
        assert_eq!(session.snapshot().current_joint, [1.; 6]);
    }

    #[test]
    fn measure_refreshes_debug_channels_between_samples() {
        let session = ServoSession::new();
        let mut actuator = MockActuator::new();
        let mut seq = Sequence::new();
        actuator
            .expect_tcp_position()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(CartesianPose::from_array(&[0., 0., 400., 0., 0., 0.])));
        actuator
            .expect_joint_position()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok([0.1; 6]));
        actuator
            .expect_tcp_position()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(CartesianPose::from_array(&[0., 0., 420., 0., 0., 0.])));
        actuator
            .expect_joint_position()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok([0.1, 0.25, 0.35, 0.1, 0.1, 0.1]));
        actuator.expect_status().never();
        let mut sampler = TelemetrySampler::new(session.clone());
        sampler.measure(&actuator).unwrap();
        assert_eq!(sampler.debug_sample(0., &[0.; 6]).measured_joint_2, 0.1);
        sampler.measure(&actuator).unwrap();
        let debug = sampler.debug_sample(0., &[0.; 6]);
        assert!((debug.measured_z - 0.42).abs() < 1e-12);
        assert_eq!(debug.measured_joint_2, 0.25);
        assert_eq!(debug.measured_joint_3, 0.35);
        assert_eq!(session.snapshot().current_joint, [0.1, 0.25, 0.35, 0.1, 0.1, 0.1]);
        assert!(sampler.last().is_none());
    }
}
