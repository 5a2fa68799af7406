// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the servo streaming loop which plays a [`Trajectory`](`crate::trajectory::Trajectory`)
//! on the actuator, one joint command per control period.
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::config::ServoConfig;
use crate::exception::{create_precondition_violation, JakaException, JakaResult};
use crate::robot::actuator::Actuator;
use crate::robot::control_tools::apply_realtime_config;
use crate::robot::control_types::{CancelToken, ServoOutcome};
use crate::robot::error::describe_status;
use crate::robot::logger::{Logger, Record};
use crate::robot::types::{JointVector, MoveMode};

/// Receives every successfully submitted point together with its tick index and read access
/// to the actuator.
pub type TickObserver<'b, A> = &'b mut dyn FnMut(usize, &JointVector, &A);

/// States of a servo session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ServoState {
    Idle,
    Arming,
    Streaming,
    Completing,
    Aborting,
}

enum StreamEnd {
    Completed,
    Cancelled(usize),
}

pub struct ServoLoop<'a, A: Actuator> {
    actuator: &'a mut A,
    config: &'a ServoConfig,
    cancel: Option<CancelToken>,
    logger: Logger,
    state: ServoState,
}

impl<'a, A: Actuator> ServoLoop<'a, A> {
    /// Creates a servo loop and applies the realtime configuration to the calling thread.
    ///
    /// # Errors
    /// * [`RealTimeException`](`crate::exception::JakaException::RealTimeException`) if realtime
    /// scheduling is enforced but not available.
    pub fn new(actuator: &'a mut A, config: &'a ServoConfig) -> JakaResult<Self> {
        apply_realtime_config(config.realtime)?;
        Ok(ServoLoop {
            actuator,
            config,
            cancel: None,
            logger: Logger::new(config.log_size),
            state: ServoState::Idle,
        })
    }

    /// Checks `token` between two ticks and stops the session when it is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn state(&self) -> ServoState {
        self.state
    }

    /// Plays `trajectory` and leaves the actuator with streaming mode disabled.
    ///
    /// # Errors
    /// * [`PreconditionViolation`](`crate::exception::JakaException::PreconditionViolation`) if the trajectory is empty.
    /// * [`ActuatorUnavailable`](`crate::exception::JakaException::ActuatorUnavailable`) if streaming mode cannot be entered.
    /// * [`ActuatorRejected`](`crate::exception::JakaException::ActuatorRejected`) if a command was rejected.
    /// The motion is aborted and the remaining ticks are dropped.
    /// * [`CommandTimeout`](`crate::exception::JakaException::CommandTimeout`) if a command took too long.
    /// The motion is aborted.
    pub fn run(
        &mut self,
        trajectory: &[JointVector],
        observer: Option<TickObserver<A>>,
    ) -> JakaResult<ServoOutcome> {
        if trajectory.is_empty() {
            return Err(create_precondition_violation(
                "cannot stream an empty trajectory",
            ));
        }
        self.arm()?;
        match self.stream(trajectory, observer) {
            Ok(StreamEnd::Completed) => {
                self.complete()?;
                Ok(ServoOutcome::Completed {
                    ticks: trajectory.len(),
                })
            }
            Ok(StreamEnd::Cancelled(played)) => {
                warn!("servo session cancelled after {} ticks", played);
                self.abort();
                Ok(ServoOutcome::Cancelled { played })
            }
            Err(err) => {
                error!("servo session failed: {}", err);
                self.abort();
                Err(err)
            }
        }
    }

    fn arm(&mut self) -> JakaResult<()> {
        self.state = ServoState::Arming;
        let status = self.actuator.set_joint_filter(self.config.filter_cutoff);
        if status != 0 {
            self.state = ServoState::Idle;
            return Err(JakaException::ActuatorUnavailable { status });
        }
        let status = self.actuator.enable_streaming(true);
        if status != 0 {
            self.state = ServoState::Idle;
            return Err(JakaException::ActuatorUnavailable { status });
        }
        sleep(self.config.settle_delay());
        debug!("servo streaming armed");
        Ok(())
    }

    fn stream(
        &mut self,
        trajectory: &[JointVector],
        mut observer: Option<TickObserver<A>>,
    ) -> JakaResult<StreamEnd> {
        self.state = ServoState::Streaming;
        let period = self.config.control_period();
        let limit = self.config.command_timeout();
        let mut deadline = Instant::now();
        for (tick, command) in trajectory.iter().enumerate() {
            if self.cancel.as_ref().map_or(false, |c| c.is_cancelled()) {
                return Ok(StreamEnd::Cancelled(tick));
            }
            let started = Instant::now();
            let status =
                self.actuator
                    .submit_joint_command(command, MoveMode::Absolute, self.config.step_num);
            let elapsed = started.elapsed();
            self.logger.log(Record {
                tick,
                command: *command,
                status,
            });
            if status != 0 {
                return Err(JakaException::ActuatorRejected {
                    status,
                    log: Some(self.logger.flush()),
                });
            }
            if elapsed > limit {
                return Err(JakaException::CommandTimeout {
                    tick,
                    elapsed,
                    limit,
                });
            }
            if let Some(observer) = observer.as_mut() {
                observer(tick, command, &*self.actuator);
            }
            if !self.config.actuator_paced {
                deadline += period;
                sleep(deadline.saturating_duration_since(Instant::now()));
            }
        }
        Ok(StreamEnd::Completed)
    }

    fn complete(&mut self) -> JakaResult<()> {
        self.state = ServoState::Completing;
        sleep(self.config.settle_delay());
        let status = self.actuator.enable_streaming(false);
        self.state = ServoState::Idle;
        if status != 0 {
            error!("cannot leave streaming mode: {}", describe_status(status));
            return Err(JakaException::ActuatorRejected { status, log: None });
        }
        debug!("servo streaming completed");
        Ok(())
    }

    fn abort(&mut self) {
        self.state = ServoState::Aborting;
        let status = self.actuator.abort_motion();
        if status != 0 {
            error!("motion abort failed: {}", describe_status(status));
        }
        let status = self.actuator.enable_streaming(false);
        if status != 0 {
            error!("cannot leave streaming mode: {}", describe_status(status));
        }
        self.state = ServoState::Idle;
    }
}

fn sleep(duration: Duration) {
    if !duration.is_zero() {
        spin_sleep::sleep(duration);
    }
}
