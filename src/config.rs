// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the driver configuration.
//!
//! All durations are given in seconds. Every section and field has a default, so an empty
//! TOML document is a valid configuration:
//! ```
//! use jaka::DriverConfig;
//! let config = DriverConfig::from_toml_str("[servo]\ncontrol_period = 0.004").unwrap();
//! assert_eq!(config.servo.control_period().as_millis(), 4);
//! assert_eq!(config.jog.settle_delay().as_millis(), 200);
//! ```
use crate::exception::{JakaException, JakaResult};
use crate::robot::control_types::RealtimeConfig;
use crate::utils::deg_to_rad;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn seconds(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.))
}

fn config_error(message: String) -> JakaException {
    JakaException::ConfigException { message }
}

/// Interpolation of a servo-mode segment.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SegmentProfile {
    /// Constant step over `segment_duration`.
    Uniform,
    /// Synchronized trapezoid within `velocity_limit` and `acceleration_limit`.
    Trapezoid,
}

/// Settings of the servo streaming loop.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServoConfig {
    /// Interval between two servo commands.
    pub control_period: f64,
    /// Wait after enabling and before disabling streaming mode.
    pub settle_delay: f64,
    /// Cutoff frequency of the actuator's joint smoothing filter in \[Hz\].
    pub filter_cutoff: f64,
    /// Number of controller cycles a servo command is spread over.
    pub step_num: u32,
    /// Maximum duration of a single servo command before the motion is aborted. The duration
    /// is checked after the command returned, a command which never returns still blocks the
    /// servo loop.
    pub command_timeout: f64,
    /// Set if the actuator blocks for one control period per command itself.
    pub actuator_paced: bool,
    pub realtime: RealtimeConfig,
    /// Number of submitted commands kept for error reports.
    pub log_size: usize,
    /// Duration of one servo-mode segment towards the latest target.
    pub segment_duration: f64,
    pub profile: SegmentProfile,
    /// Joint velocity limit of trapezoidal segments in \[rad/s\].
    pub velocity_limit: f64,
    /// Joint acceleration limit of trapezoidal segments in \[rad/s²\].
    pub acceleration_limit: f64,
}

impl Default for ServoConfig {
    fn default() -> Self {
        ServoConfig {
            control_period: 0.008,
            settle_delay: 0.008,
            filter_cutoff: 4.,
            step_num: 1,
            command_timeout: 0.1,
            actuator_paced: false,
            realtime: RealtimeConfig::Ignore,
            log_size: 50,
            segment_duration: 0.1,
            profile: SegmentProfile::Uniform,
            velocity_limit: 1.,
            acceleration_limit: 2.,
        }
    }
}

impl ServoConfig {
    pub fn control_period(&self) -> Duration {
        seconds(self.control_period)
    }
    pub fn settle_delay(&self) -> Duration {
        seconds(self.settle_delay)
    }
    pub fn command_timeout(&self) -> Duration {
        seconds(self.command_timeout)
    }
}

/// Jog velocities and timing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct JogConfig {
    /// Joint jog velocity in \[rad/s\].
    pub joint_velocity: f64,
    /// Cartesian rotational jog velocity in \[rad/s\].
    pub rotational_velocity: f64,
    /// Cartesian translational jog velocity in \[mm/s\].
    pub translational_velocity: f64,
    /// Wait between stopping the current jog and starting the next one.
    pub settle_delay: f64,
}

impl Default for JogConfig {
    fn default() -> Self {
        JogConfig {
            joint_velocity: deg_to_rad(2.),
            rotational_velocity: deg_to_rad(2.),
            translational_velocity: 2.,
            settle_delay: 0.2,
        }
    }
}

impl JogConfig {
    pub fn settle_delay(&self) -> Duration {
        seconds(self.settle_delay)
    }
}

/// Settings of the single-shot moves.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    pub linear_tolerance: f64,
    pub joint_tolerance: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        MotionConfig {
            linear_tolerance: 0.3,
            joint_tolerance: 0.2,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub period: f64,
    /// Control-path idle poll interval between two iterations.
    pub poll_interval: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            period: 0.08,
            poll_interval: 0.001,
        }
    }
}

impl TelemetryConfig {
    pub fn period(&self) -> Duration {
        seconds(self.period)
    }
    pub fn poll_interval(&self) -> Duration {
        seconds(self.poll_interval)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub period: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig { period: 1. }
    }
}

impl MonitorConfig {
    pub fn period(&self) -> Duration {
        seconds(self.period)
    }
}

/// Delays of the power-on and enable sequence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StartupConfig {
    pub step_delay: f64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        StartupConfig { step_delay: 1. }
    }
}

impl StartupConfig {
    pub fn step_delay(&self) -> Duration {
        seconds(self.step_delay)
    }
}

/// Complete configuration of a [`Driver`](`crate::robot::driver::Driver`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct DriverConfig {
    pub servo: ServoConfig,
    pub jog: JogConfig,
    pub motion: MotionConfig,
    pub telemetry: TelemetryConfig,
    pub monitor: MonitorConfig,
    pub startup: StartupConfig,
}

impl DriverConfig {
    /// Parses and validates a TOML document.
    /// # Errors
    /// * [`ConfigException`](`crate::exception::JakaException::ConfigException`) if the document
    /// cannot be parsed or contains invalid values.
    pub fn from_toml_str(document: &str) -> JakaResult<Self> {
        let config: DriverConfig = toml::from_str(document)
            .map_err(|e| config_error(format!("invalid driver configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file, see [`from_toml_str`](`Self::from_toml_str`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> JakaResult<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|e| {
            config_error(format!("cannot read {}: {}", path.display(), e))
        })?;
        DriverConfig::from_toml_str(&document)
    }

    /// Checks that all values are usable.
    pub fn validate(&self) -> JakaResult<()> {
        let positive = [
            ("servo.control_period", self.servo.control_period),
            ("servo.command_timeout", self.servo.command_timeout),
            ("servo.filter_cutoff", self.servo.filter_cutoff),
            ("servo.segment_duration", self.servo.segment_duration),
            ("servo.velocity_limit", self.servo.velocity_limit),
            ("servo.acceleration_limit", self.servo.acceleration_limit),
            ("jog.joint_velocity", self.jog.joint_velocity),
            ("jog.rotational_velocity", self.jog.rotational_velocity),
            ("jog.translational_velocity", self.jog.translational_velocity),
            ("telemetry.period", self.telemetry.period),
            ("monitor.period", self.monitor.period),
        ];
        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.) {
                return Err(config_error(format!("{} must be positive, got {}", name, value)));
            }
        }
        let non_negative = [
            ("servo.settle_delay", self.servo.settle_delay),
            ("jog.settle_delay", self.jog.settle_delay),
            ("motion.linear_tolerance", self.motion.linear_tolerance),
            ("motion.joint_tolerance", self.motion.joint_tolerance),
            ("telemetry.poll_interval", self.telemetry.poll_interval),
            ("startup.step_delay", self.startup.step_delay),
        ];
        for (name, value) in non_negative.iter() {
            if !(value.is_finite() && *value >= 0.) {
                return Err(config_error(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }
        if self.servo.step_num == 0 {
            return Err(config_error("servo.step_num must be at least 1".to_string()));
        }
        if self.servo.segment_duration < self.servo.control_period / 2. {
            return Err(config_error(
                "servo.segment_duration must span at least one control period".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DriverConfig, SegmentProfile};
    use crate::exception::JakaException;
    use crate::robot::control_types::RealtimeConfig;
    use std::time::Duration;

    #[test]
    fn empty_document_gives_defaults() {
        let config = DriverConfig::from_toml_str("").unwrap();
        assert_eq!(config, DriverConfig::default());
        assert_eq!(config.servo.control_period(), Duration::from_millis(8));
        assert_eq!(config.telemetry.period(), Duration::from_millis(80));
        assert_eq!(config.monitor.period(), Duration::from_secs(1));
        assert!((config.jog.joint_velocity - std::f64::consts::PI / 90.).abs() < 1e-12);
    }

    #[test]
    fn sections_override_defaults() {
        let config = DriverConfig::from_toml_str(
            r#"
            [servo]
            control_period = 0.004
            realtime = "Enforce"
            step_num = 4
            profile = "Trapezoid"

            [jog]
            translational_velocity = 5.0
            "#,
        )
        .unwrap();
        assert_eq!(config.servo.control_period(), Duration::from_millis(4));
        assert_eq!(config.servo.realtime, RealtimeConfig::Enforce);
        assert_eq!(config.servo.step_num, 4);
        assert_eq!(config.servo.profile, SegmentProfile::Trapezoid);
        assert_eq!(config.servo.settle_delay(), Duration::from_millis(8));
        assert_eq!(config.jog.translational_velocity, 5.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for document in [
            "[servo]\ncontrol_period = 0.0",
            "[servo]\nstep_num = 0",
            "[jog]\nsettle_delay = -1.0",
            "[servo]\nsegment_duration = 0.001",
            "[servo]\ncontrol_period = \"fast\"",
            "[servo]\nacceleration_limit = -2.0",
        ] {
            assert!(matches!(
                DriverConfig::from_toml_str(document),
                Err(JakaException::ConfigException { .. })
            ));
        }
    }
}
