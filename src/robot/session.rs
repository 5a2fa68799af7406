// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the state shared between request intake, telemetry and the servo path.
use crate::exception::JakaResult;
use crate::robot::types::{CartesianPose, JointVector};
use crate::utils::ensure_finite;
use parking_lot::Mutex;
use std::sync::Arc;

/// Latest servo target and joint reference.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ServoSessionState {
    /// Latest servo-mode target, translation in \[mm\].
    pub expected_pose: CartesianPose,
    /// Latest measured joint positions.
    pub current_joint: JointVector,
    pub servo_mode_active: bool,
}

/// Handle to the shared [`ServoSessionState`]. Cloning the handle shares the state.
///
/// The lock is only held while copying, a reader always sees one consistent state.
#[derive(Debug, Clone, Default)]
pub struct ServoSession {
    state: Arc<Mutex<ServoSessionState>>,
}

impl ServoSession {
    pub fn new() -> Self {
        ServoSession::default()
    }

    /// Returns a consistent copy of the state.
    pub fn snapshot(&self) -> ServoSessionState {
        *self.state.lock()
    }

    /// Stores a new servo target.
    pub fn set_target(&self, expected_pose: CartesianPose, servo_mode_active: bool) {
        let mut state = self.state.lock();
        state.expected_pose = expected_pose;
        state.servo_mode_active = servo_mode_active;
    }

    /// Stores a servo target given in \[m\] and \[rad\], replacing a target which was not
    /// taken yet.
    ///
    /// # Errors
    /// * [`ParameterError`](`crate::exception::JakaException::ParameterError`) if a value is not finite.
    pub fn submit_target(&self, pose: &[f64; 6], servo_mode_active: bool) -> JakaResult<()> {
        ensure_finite(pose, "servo target")?;
        self.set_target(CartesianPose::from_meters(pose), servo_mode_active);
        Ok(())
    }

    pub fn set_current_joint(&self, joints: JointVector) {
        self.state.lock().current_joint = joints;
    }

    pub fn leave_servo_mode(&self) {
        self.state.lock().servo_mode_active = false;
    }

    /// Takes the pending servo target: returns a snapshot and clears the servo-mode flag if it
    /// was set, so every target is played once.
    pub fn take_servo_target(&self) -> Option<ServoSessionState> {
        let mut state = self.state.lock();
        if state.servo_mode_active {
            let snapshot = *state;
            state.servo_mode_active = false;
            Some(snapshot)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ServoSession;
    use crate::robot::types::CartesianPose;
    use std::thread;

    #[test]
    fn servo_target_is_taken_once() {
        let session = ServoSession::new();
        assert!(session.take_servo_target().is_none());
        let pose = CartesianPose::from_array(&[100., 0., 0., 0., 0., 0.]);
        session.set_current_joint([0.1; 6]);
        session.set_target(pose, true);
        let target = session.take_servo_target().unwrap();
        assert_eq!(target.expected_pose, pose);
        assert_eq!(target.current_joint, [0.1; 6]);
        assert!(session.take_servo_target().is_none());
        assert!(!session.snapshot().servo_mode_active);
    }

    #[test]
    fn snapshots_are_consistent_across_threads() {
        let session = ServoSession::new();
        let writer = session.clone();
        let handle = thread::spawn(move || {
            for i in 0..1000 {
                let value = i as f64;
                writer.set_target(CartesianPose::from_array(&[value; 6]), true);
            }
        });
        for _ in 0..1000 {
            let snapshot = session.snapshot();
            let pose = snapshot.expected_pose.to_array();
            assert!(pose.iter().all(|x| *x == pose[0]));
        }
        handle.join().unwrap();
        assert_eq!(session.snapshot().expected_pose.to_array(), [999.; 6]);
    }
}
