// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the [`Driver`] which owns the actuator and runs the control path: request intake,
//! periodic telemetry and servo-mode segments on a single thread.
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, error, info, warn};

use crate::config::{DriverConfig, SegmentProfile};
use crate::exception::{create_precondition_violation, JakaResult};
use crate::robot::actuator::{check_status, Actuator};
use crate::robot::control_types::{
    CancelToken, CommandResponse, JogCommand, MotionTarget, ServoOutcome,
};
use crate::robot::kinematics::Kinematics;
use crate::robot::monitor::ConnectionHealth;
use crate::robot::resolver::TargetResolver;
use crate::robot::servo_loop::ServoLoop;
use crate::robot::service_types::DriverRequest;
use crate::robot::session::ServoSession;
use crate::robot::telemetry::{TelemetrySample, TelemetrySampler, TelemetrySink};
use crate::robot::types::JointVector;
use crate::trajectory::{Trajectory, TrajectoryComposer, TrapezoidLimits};
use crate::utils::ensure_finite;

/// Control path of one arm.
///
/// # Example
/// ```ignore
/// let mut driver = jaka::Driver::new(actuator, kinematics, jaka::DriverConfig::default())?;
/// let (handle, requests) = jaka::request_channel(driver.session());
/// driver.bring_up()?;
/// let shutdown = jaka::CancelToken::new();
/// driver.run(&requests, &mut sink, &shutdown)?;
/// ```
pub struct Driver<A: Actuator, K: Kinematics> {
    actuator: A,
    kinematics: K,
    config: DriverConfig,
    composer: TrajectoryComposer,
    resolver: TargetResolver,
    session: ServoSession,
    sampler: TelemetrySampler,
    health: ConnectionHealth,
    cancel: CancelToken,
}

impl<A: Actuator, K: Kinematics> Driver<A, K> {
    /// # Errors
    /// * [`ConfigException`](`crate::exception::JakaException::ConfigException`) if the configuration is invalid.
    pub fn new(actuator: A, kinematics: K, config: DriverConfig) -> JakaResult<Self> {
        config.validate()?;
        let composer = TrajectoryComposer::new(config.servo.control_period())?;
        let resolver = TargetResolver::new(config.jog.clone(), config.motion.clone());
        let session = ServoSession::new();
        Ok(Driver {
            actuator,
            kinematics,
            composer,
            resolver,
            sampler: TelemetrySampler::new(session.clone()),
            session,
            health: ConnectionHealth::default(),
            cancel: CancelToken::new(),
            config,
        })
    }

    /// Reports the connection state published by a [`ConnectionMonitor`](`crate::robot::monitor::ConnectionMonitor`).
    pub fn with_connection_health(mut self, health: ConnectionHealth) -> Self {
        self.health = health;
        self
    }

    pub fn session(&self) -> ServoSession {
        self.session.clone()
    }

    /// Token which stops a servo segment between two ticks. It is reset when a segment ends, so
    /// a cancel issued while no segment runs stops the next segment before its first tick.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    /// Powers on and enables the robot. If the robot does not report itself enabled, it is
    /// powered off and the sequence is repeated once.
    ///
    /// # Errors
    /// * [`ActuatorRejected`](`crate::exception::JakaException::ActuatorRejected`) if the status cannot be read.
    /// * [`PreconditionViolation`](`crate::exception::JakaException::PreconditionViolation`) if the robot is still
    /// not enabled after the restart.
    pub fn bring_up(&mut self) -> JakaResult<()> {
        let delay = self.config.startup.step_delay();
        info!("powering on");
        self.power_on_and_enable();
        if self.actuator.status()?.enabled {
            info!("robot enabled");
            return Ok(());
        }
        warn!("robot not enabled, restarting");
        log_status("power off", self.actuator.power_off());
        thread::sleep(delay);
        self.power_on_and_enable();
        if self.actuator.status()?.enabled {
            info!("robot enabled");
            Ok(())
        } else {
            error!("robot could not be enabled");
            Err(create_precondition_violation(
                "robot is not enabled after restart",
            ))
        }
    }

    fn power_on_and_enable(&mut self) {
        let delay = self.config.startup.step_delay();
        log_status("power on", self.actuator.power_on());
        thread::sleep(delay);
        log_status("enable", self.actuator.enable());
        thread::sleep(delay);
    }

    pub fn enable_robot(&mut self) -> CommandResponse {
        let status = self.actuator.power_on();
        if status != 0 {
            log_status("power on", status);
            return CommandResponse::rejected(status);
        }
        let status = self.actuator.enable();
        log_status("enable", status);
        CommandResponse::from_status(status, "robot enabled")
    }

    pub fn disable_robot(&mut self) -> CommandResponse {
        let status = self.actuator.disable();
        log_status("disable", status);
        CommandResponse::from_status(status, "robot disabled")
    }

    /// Stores a servo-mode target given in \[m\] and \[rad\]. Non-finite targets are dropped.
    pub fn servo_target(&self, pose: &[f64; 6], servo_mode_active: bool) {
        if let Err(error) = self.session.submit_target(pose, servo_mode_active) {
            warn!("dropping servo target: {}", error);
        }
    }

    /// Executes one request and sends its response. A vanished requester is not an error.
    pub fn handle_request(&mut self, request: DriverRequest) {
        match request {
            DriverRequest::MoveLinear {
                pose,
                speed,
                acceleration,
                blocking,
                reply,
            } => {
                let response = self.execute(&MotionTarget::AbsoluteLinear {
                    pose,
                    speed,
                    acceleration,
                    blocking,
                });
                let _ = reply.send(response);
            }
            DriverRequest::MoveJoint {
                joints,
                speed,
                acceleration,
                blocking,
                reply,
            } => {
                let response = self.execute(&MotionTarget::AbsoluteJoint {
                    joints,
                    speed,
                    acceleration,
                    blocking,
                });
                let _ = reply.send(response);
            }
            DriverRequest::Jog {
                index,
                coord_mode,
                reply,
            } => {
                let response = match JogCommand::from_index(index, coord_mode) {
                    Ok(jog) => self.execute(&MotionTarget::Jog(jog)),
                    Err(error) => {
                        self.session.leave_servo_mode();
                        warn!("invalid jog request: {}", error);
                        CommandResponse::invalid(error)
                    }
                };
                let _ = reply.send(response);
            }
            DriverRequest::Stop { reply } => {
                let response = self.stop();
                let _ = reply.send(response);
            }
            DriverRequest::EnableRobot { reply } => {
                let response = self.enable_robot();
                let _ = reply.send(response);
            }
            DriverRequest::DisableRobot { reply } => {
                let response = self.disable_robot();
                let _ = reply.send(response);
            }
        }
    }

    /// Runs a single-shot motion. Leaves servo mode.
    pub fn execute(&mut self, target: &MotionTarget) -> CommandResponse {
        self.session.leave_servo_mode();
        self.resolver.resolve(&mut self.actuator, target)
    }

    /// Leaves servo mode and aborts the current motion.
    pub fn stop(&mut self) -> CommandResponse {
        self.session.leave_servo_mode();
        self.resolver.stop(&mut self.actuator)
    }

    /// Samples the actuator and publishes the result.
    pub fn sample_telemetry<S: TelemetrySink>(&mut self, sink: &mut S) -> JakaResult<TelemetrySample> {
        let sample = self
            .sampler
            .sample(&self.actuator, self.health.is_connected())?;
        sink.publish_state(&sample);
        Ok(sample)
    }

    /// Joint trajectory from `start` to `goal` for one servo segment.
    pub fn compose_segment(&self, start: &JointVector, goal: &JointVector) -> JakaResult<Trajectory> {
        let servo = &self.config.servo;
        match servo.profile {
            SegmentProfile::Uniform => {
                self.composer
                    .compose_uniform(start, goal, servo.segment_duration)
            }
            SegmentProfile::Trapezoid => self.composer.compose_trapezoid(
                start,
                goal,
                &TrapezoidLimits::at_rest(
                    [servo.velocity_limit; 6],
                    [servo.acceleration_limit; 6],
                ),
            ),
        }
    }

    /// Plays one servo segment towards the pending servo target, if there is one.
    ///
    /// The target is converted to joints with the current joint reference, interpolated and
    /// streamed. Every target is played once; a failed segment is not retried.
    ///
    /// # Errors
    /// * [`KinematicsUnreachable`](`crate::exception::JakaException::KinematicsUnreachable`) if the target has no solution.
    /// * every error of [`ServoLoop::run`](`crate::robot::servo_loop::ServoLoop::run`).
    pub fn spin_once<S: TelemetrySink>(&mut self, sink: &mut S) -> JakaResult<Option<ServoOutcome>> {
        let target = match self.session.take_servo_target() {
            Some(target) => target,
            None => return Ok(None),
        };
        let goal = self
            .kinematics
            .inverse(&target.current_joint, &target.expected_pose)?;
        ensure_finite(&goal, "inverse kinematics solution")?;
        let trajectory = self.compose_segment(&target.current_joint, &goal)?;
        debug!("servo segment with {} ticks", trajectory.len());

        let expected_z = target.expected_pose.translation[2];
        let sampler = &mut self.sampler;
        let mut observer = |_tick: usize, command: &JointVector, actuator: &A| {
            if let Err(error) = sampler.measure(actuator) {
                warn!("measurement during servo segment failed: {}", error);
            }
            sink.publish_debug(&sampler.debug_sample(expected_z, command))
        };
        let outcome = match ServoLoop::new(&mut self.actuator, &self.config.servo) {
            Ok(servo) => servo
                .with_cancel_token(self.cancel.clone())
                .run(&trajectory, Some(&mut observer)),
            Err(error) => Err(error),
        };
        self.cancel.reset();
        Ok(Some(outcome?))
    }

    /// Runs the control path until `shutdown` is cancelled or every request sender is gone.
    ///
    /// Failed servo segments and telemetry samples are logged and the loop continues.
    pub fn run<S: TelemetrySink>(
        &mut self,
        requests: &Receiver<DriverRequest>,
        sink: &mut S,
        shutdown: &CancelToken,
    ) -> JakaResult<()> {
        let period = self.config.telemetry.period();
        let poll = self.config.telemetry.poll_interval();
        let mut next_sample = Instant::now();
        info!("driver running");
        while !shutdown.is_cancelled() {
            match requests.recv_timeout(poll) {
                Ok(request) => self.handle_request(request),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            while let Ok(request) = requests.try_recv() {
                self.handle_request(request);
            }
            let now = Instant::now();
            if now >= next_sample {
                if let Err(error) = self.sample_telemetry(sink) {
                    warn!("telemetry sample failed: {}", error);
                }
                next_sample = now + period;
            }
            if let Err(error) = self.spin_once(sink) {
                error!("servo segment failed: {}", error);
            }
        }
        info!("driver stopped");
        Ok(())
    }
}

fn log_status(what: &str, status: i32) {
    if let Err(error) = check_status(status) {
        warn!("{} failed: {}", what, error);
    }
}

#[cfg(test)]
mod tests {
    use super::Driver;
    use crate::config::{DriverConfig, SegmentProfile};
    use crate::exception::JakaException;
    use crate::robot::actuator::MockActuator;
    use crate::robot::control_types::{CancelToken, ServoOutcome, CMD_EXECUTED};
    use crate::robot::kinematics::MockKinematics;
    use crate::robot::service_types::{request_channel, DriverRequest};
    use crate::robot::telemetry::{MockTelemetrySink, NullSink};
    use crate::robot::types::{ActuatorStatus, CartesianPose, JointVector, MoveMode};
    use mockall::Sequence;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    fn test_config() -> DriverConfig {
        let mut config = DriverConfig::default();
        config.servo.settle_delay = 0.;
        config.servo.actuator_paced = true;
        config.servo.command_timeout = 10.;
        config.servo.segment_duration = 0.08;
        config.jog.settle_delay = 0.;
        config.startup.step_delay = 0.;
        config.telemetry.poll_interval = 0.001;
        config
    }

    fn enabled(enabled: bool) -> ActuatorStatus {
        ActuatorStatus {
            enabled,
            powered_on: true,
            ..Default::default()
        }
    }

    #[test]
    fn bring_up_restarts_a_disabled_robot() {
        let mut actuator = MockActuator::new();
        let mut seq = Sequence::new();
        actuator.expect_power_on().times(1).in_sequence(&mut seq).returning(|| 0);
        actuator.expect_enable().times(1).in_sequence(&mut seq).returning(|| 0);
        actuator
            .expect_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(enabled(false)));
        actuator.expect_power_off().times(1).in_sequence(&mut seq).returning(|| 0);
        actuator.expect_power_on().times(1).in_sequence(&mut seq).returning(|| 0);
        actuator.expect_enable().times(1).in_sequence(&mut seq).returning(|| 0);
        actuator
            .expect_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(enabled(true)));
        let mut driver = Driver::new(actuator, MockKinematics::new(), test_config()).unwrap();
        driver.bring_up().unwrap();
    }

    #[test]
    fn bring_up_skips_the_restart_when_enabled() {
        let mut actuator = MockActuator::new();
        actuator.expect_power_on().times(1).returning(|| 0);
        actuator.expect_enable().times(1).returning(|| 0);
        actuator.expect_status().times(1).returning(|| Ok(enabled(true)));
        actuator.expect_power_off().never();
        let mut driver = Driver::new(actuator, MockKinematics::new(), test_config()).unwrap();
        driver.bring_up().unwrap();
    }

    #[test]
    fn bring_up_fails_if_the_restart_does_not_help() {
        let mut actuator = MockActuator::new();
        actuator.expect_power_on().times(2).returning(|| 0);
        actuator.expect_enable().times(2).returning(|| -6);
        actuator.expect_power_off().times(1).returning(|| 0);
        actuator.expect_status().times(2).returning(|| Ok(enabled(false)));
        let mut driver = Driver::new(actuator, MockKinematics::new(), test_config()).unwrap();
        assert!(matches!(
            driver.bring_up(),
            Err(JakaException::PreconditionViolation { .. })
        ));
    }

    #[test]
    fn servo_target_is_streamed_once() {
        let reference: JointVector = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let goal: JointVector = [0.2, 0.2, 0.3, 0.4, 0.5, 0.7];
        let mut kinematics = MockKinematics::new();
        kinematics
            .expect_inverse()
            .withf(move |current, pose| {
                *current == reference
                    && (pose.translation[0] - 400.).abs() < 1e-9
                    && (pose.translation[2] - 300.).abs() < 1e-9
            })
            .times(1)
            .returning(move |_, _| Ok(goal));

        let submitted = Arc::new(Mutex::new(Vec::new()));
        let recorder = submitted.clone();
        let mut actuator = MockActuator::new();
        actuator
            .expect_tcp_position()
            .times(10)
            .returning(|| Ok(CartesianPose::default()));
        let measured = submitted.clone();
        actuator
            .expect_joint_position()
            .times(10)
            .returning(move || Ok(*measured.lock().unwrap().last().unwrap()));
        actuator.expect_set_joint_filter().times(1).returning(|_| 0);
        actuator.expect_enable_streaming().times(2).returning(|_| 0);
        actuator
            .expect_submit_joint_command()
            .withf(|_, mode, steps| *mode == MoveMode::Absolute && *steps == 1)
            .times(10)
            .returning(move |q, _, _| {
                recorder.lock().unwrap().push(*q);
                0
            });
        actuator.expect_abort_motion().never();

        let mut sink = MockTelemetrySink::new();
        sink.expect_publish_debug()
            .withf(|sample| {
                (sample.expected_z - 300.).abs() < 1e-9
                    && sample.measured_joint_2 == sample.commanded_joint_2
            })
            .times(10)
            .return_const(());

        let mut driver = Driver::new(actuator, kinematics, test_config()).unwrap();
        let session = driver.session();
        session.set_current_joint(reference);
        driver.servo_target(&[0.4, 0., 0.3, 0., 0., 0.], true);

        let outcome = driver.spin_once(&mut sink).unwrap();
        assert_eq!(outcome, Some(ServoOutcome::Completed { ticks: 10 }));
        assert_eq!(driver.spin_once(&mut sink).unwrap(), None);
        assert!(!session.snapshot().servo_mode_active);
        assert_eq!(session.snapshot().current_joint, goal);

        let submitted = submitted.lock().unwrap();
        assert_eq!(submitted.len(), 10);
        assert_eq!(*submitted.last().unwrap(), goal);
        assert!((submitted[0][0] - 0.11).abs() < 1e-12);
    }

    #[test]
    fn trapezoid_segments_end_at_the_goal() {
        let goal: JointVector = [0.05, 0., 0., 0., 0., 0.];
        let mut kinematics = MockKinematics::new();
        kinematics.expect_inverse().returning(move |_, _| Ok(goal));
        let last = Arc::new(Mutex::new([f64::NAN; 6]));
        let recorder = last.clone();
        let mut actuator = MockActuator::new();
        actuator
            .expect_tcp_position()
            .returning(|| Ok(CartesianPose::default()));
        actuator.expect_joint_position().returning(|| Ok([0.; 6]));
        actuator.expect_set_joint_filter().returning(|_| 0);
        actuator.expect_enable_streaming().returning(|_| 0);
        actuator.expect_submit_joint_command().returning(move |q, _, _| {
            *recorder.lock().unwrap() = *q;
            0
        });
        let mut config = test_config();
        config.servo.profile = SegmentProfile::Trapezoid;
        let mut driver = Driver::new(actuator, kinematics, config).unwrap();
        driver.servo_target(&[0.; 6], true);
        match driver.spin_once(&mut NullSink).unwrap() {
            Some(ServoOutcome::Completed { ticks }) => assert!(ticks > 1),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(*last.lock().unwrap(), goal);
    }

    #[test]
    fn unreachable_target_never_arms_the_actuator() {
        let mut kinematics = MockKinematics::new();
        kinematics.expect_inverse().times(1).returning(|_, _| {
            Err(JakaException::KinematicsUnreachable {
                message: "out of reach".to_string(),
            })
        });
        let mut actuator = MockActuator::new();
        actuator.expect_enable_streaming().never();
        let mut driver = Driver::new(actuator, kinematics, test_config()).unwrap();
        driver.servo_target(&[5., 0., 0., 0., 0., 0.], true);
        assert!(matches!(
            driver.spin_once(&mut NullSink),
            Err(JakaException::KinematicsUnreachable { .. })
        ));
        assert_eq!(driver.spin_once(&mut NullSink).unwrap(), None);
    }

    #[test]
    fn single_shot_requests_leave_servo_mode() {
        let mut actuator = MockActuator::new();
        actuator
            .expect_joint_move()
            .times(1)
            .returning(|_, _, _, _, _, _| 0);
        let mut driver = Driver::new(actuator, MockKinematics::new(), test_config()).unwrap();
        driver.servo_target(&[0.1, 0., 0., 0., 0., 0.], true);
        let (reply, response) = crossbeam_channel::bounded(1);
        driver.handle_request(DriverRequest::MoveJoint {
            joints: [0.; 6],
            speed: 10.,
            acceleration: 10.,
            blocking: true,
            reply,
        });
        let response = response.recv().unwrap();
        assert!(response.ok);
        assert_eq!(response.message, CMD_EXECUTED);
        assert!(!driver.session().snapshot().servo_mode_active);
    }

    #[test]
    fn invalid_jog_is_answered_without_actuator_calls() {
        let mut actuator = MockActuator::new();
        actuator.expect_jog_stop().never();
        actuator.expect_jog().never();
        let mut driver = Driver::new(actuator, MockKinematics::new(), test_config()).unwrap();
        let (reply, response) = crossbeam_channel::bounded(1);
        driver.handle_request(DriverRequest::Jog {
            index: 12,
            coord_mode: 0,
            reply,
        });
        assert!(!response.recv().unwrap().ok);
    }

    #[test]
    fn enable_and_disable_requests() {
        let mut actuator = MockActuator::new();
        actuator.expect_power_on().times(1).returning(|| 0);
        actuator.expect_enable().times(1).returning(|| 0);
        actuator.expect_disable().times(1).returning(|| -8);
        let mut driver = Driver::new(actuator, MockKinematics::new(), test_config()).unwrap();
        assert!(driver.enable_robot().ok);
        let response = driver.disable_robot();
        assert!(!response.ok);
        assert_eq!(response.message, "ERR_DISABLE_SERVOMODE");
    }

    #[test]
    fn run_serves_requests_and_publishes_telemetry() {
        let mut actuator = MockActuator::new();
        actuator.expect_abort_motion().times(1).returning(|| 0);
        actuator
            .expect_tcp_position()
            .returning(|| Ok(CartesianPose::default()));
        actuator.expect_joint_position().returning(|| Ok([0.; 6]));
        actuator.expect_status().returning(|| Ok(enabled(true)));
        let mut sink = MockTelemetrySink::new();
        sink.expect_publish_state()
            .withf(|sample| sample.robot_state.servo_enable)
            .times(1..)
            .return_const(());

        let mut driver = Driver::new(actuator, MockKinematics::new(), test_config()).unwrap();
        let (handle, requests) = request_channel(driver.session());
        let shutdown = CancelToken::new();
        let stopper = shutdown.clone();
        let client = thread::spawn(move || {
            let response = handle.stop(Duration::from_secs(5)).unwrap();
            stopper.cancel();
            response
        });
        driver.run(&requests, &mut sink, &shutdown).unwrap();
        assert!(client.join().unwrap().ok);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let mut config = test_config();
        config.servo.step_num = 0;
        assert!(matches!(
            Driver::new(MockActuator::new(), MockKinematics::new(), config),
            Err(JakaException::ConfigException { .. })
        ));
    }
}
