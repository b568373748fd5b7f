//! Differential-drive robot with a reactive obstacle avoidance controller.

use std::time::Duration;

use nalgebra::{Matrix3x2, Vector2, Vector3};
use thiserror::Error;

use super::{
    Angle, AvoidanceConfig, AvoidanceController, AvoidanceState, Maneuver, ObstaclePoint,
    OccupancyField, PointCloud, Position, RangeSensor, SensorOverlay, Velocity,
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    pub position: Position,
    pub heading: Angle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WheelSpeeds {
    pub left: Velocity,
    pub right: Velocity,
}

impl WheelSpeeds {
    pub const fn new(left: Velocity, right: Velocity) -> Self {
        Self { left, right }
    }

    /// Both wheels at the same speed.
    pub const fn uniform(velocity: Velocity) -> Self {
        Self::new(velocity, velocity)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Robot {
    pose: Pose,
    wheels: WheelSpeeds,
    avoidance: AvoidanceController,
    config: RobotConfig,
}

impl Robot {
    pub fn new(position: Position, config: RobotConfig) -> Result<Self, RobotError> {
        config.validate()?;
        log::info!(
            "robot at ({:.1}, {:.1}), axle width {:.2}, speeds {:.2}..{:.2}",
            position.x(),
            position.y(),
            config.axle_width,
            config.min_speed,
            config.max_speed
        );
        Ok(Self {
            pose: Pose {
                position,
                heading: Angle::default(),
            },
            wheels: WheelSpeeds::uniform(Velocity::new(config.min_speed)),
            avoidance: AvoidanceController::new(config.avoidance),
            config,
        })
    }

    pub fn position(&self) -> Position {
        self.pose.position
    }

    pub fn heading(&self) -> Angle {
        self.pose.heading
    }

    pub fn wheel_speeds(&self) -> WheelSpeeds {
        self.wheels
    }

    pub fn avoidance_state(&self) -> &AvoidanceState {
        self.avoidance.state()
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn set_heading(&mut self, heading: Angle) {
        self.pose.heading = heading;
    }

    pub fn set_wheel_speeds(&mut self, wheels: WheelSpeeds) {
        self.wheels = wheels;
    }

    /// Puts the robot back at `position` with its initial heading, speeds and avoidance state.
    pub fn reset(&mut self, position: Position) {
        self.pose = Pose {
            position,
            heading: Angle::default(),
        };
        self.wheels = WheelSpeeds::uniform(self.min_speed());
        self.avoidance.reset();
    }

    /// Runs one simulation step: sense from the current pose, update the avoidance controller and
    /// integrate the pose. Returns the point cloud sensed at the start of the step.
    pub fn tick(
        &mut self,
        sensor: &RangeSensor,
        field: &impl OccupancyField,
        overlay: &mut impl SensorOverlay,
        dt: Duration,
    ) -> PointCloud {
        let point_cloud =
            sensor.sense_obstacles_traced(field, self.position(), self.heading(), overlay);
        self.avoid_obstacles(&point_cloud, dt);
        self.integrate(dt);
        point_cloud
    }

    /// Commands the wheels according to the avoidance controller.
    pub fn avoid_obstacles(&mut self, point_cloud: &[ObstaclePoint], dt: Duration) {
        let maneuver =
            self.avoidance
                .update(self.pose.position, point_cloud, self.config.max_speed, dt);
        self.wheels = match maneuver {
            Maneuver::Cruise => WheelSpeeds::uniform(self.min_speed()),
            // Back off while turning.
            Maneuver::Reverse => WheelSpeeds::new(-self.min_speed().halved(), -self.min_speed()),
        };
    }

    /// Advances the pose by `dt` and clamps the wheel speeds into their valid range afterwards.
    ///
    /// Wheel speeds below the minimum (set by a reverse maneuver) drive the robot for this step
    /// and are only clamped once it has been integrated.
    pub fn integrate(&mut self, dt: Duration) {
        let q = self.velocity_vector();
        let dt = dt.as_secs_f64();

        self.pose.position = Position::new(
            self.pose.position.x() + q[0] * dt,
            self.pose.position.y() + q[1] * dt,
        );

        let heading = Angle::new(f64::from(self.pose.heading) + q[2] * dt);
        self.pose.heading = heading.reset_beyond_full_turn();
        if self.pose.heading != heading {
            log::debug!(
                "heading {:.3} rad beyond full turn, reset to 0",
                f64::from(heading)
            );
        }

        self.wheels = WheelSpeeds::new(
            self.wheels.left.clamp(self.min_speed(), self.max_speed()),
            self.wheels.right.clamp(self.min_speed(), self.max_speed()),
        );
    }

    /// Field-frame velocities `[dx/dt, dy/dt, dθ/dt]` from the wheel speeds `[left, right]`. The
    /// y-row is negated because the field's y-axis points down.
    fn velocity_vector(&self) -> Vector3<f64> {
        let heading: f64 = self.pose.heading.into();
        let omega = self.avoidance.state().angular_velocity() / self.config.axle_width;
        let j = Matrix3x2::new(
            heading.cos() / 2.0,
            heading.cos() / 2.0,
            -heading.sin() / 2.0,
            -heading.sin() / 2.0,
            -omega,
            omega,
        );
        let v = Vector2::new(self.wheels.left.into(), self.wheels.right.into());
        j * v
    }

    fn min_speed(&self) -> Velocity {
        Velocity::new(self.config.min_speed)
    }

    fn max_speed(&self) -> Velocity {
        Velocity::new(self.config.max_speed)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum RobotError {
    #[error("axle width must be positive and finite, got {0}")]
    InvalidAxleWidth(f64),
    #[error("wheel speed limits must be finite, got {min}..{max}")]
    NonFiniteSpeed { min: f64, max: f64 },
    #[error("minimum speed {min} exceeds maximum speed {max}")]
    InvertedSpeedLimits { min: f64, max: f64 },
    #[error("unit conversion factor must be positive and finite, got {0}")]
    InvalidUnitConversion(f64),
}

/// Speeds and distances are in field units (pixels); `meters_to_pixels` converts from metric.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RobotConfig {
    pub axle_width: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub meters_to_pixels: f64,
    pub avoidance: AvoidanceConfig,
}

impl RobotConfig {
    pub const METERS_TO_PIXELS: f64 = 3779.52;

    pub const fn new(
        axle_width: f64,
        min_speed: f64,
        max_speed: f64,
        meters_to_pixels: f64,
        avoidance: AvoidanceConfig,
    ) -> Self {
        RobotConfig {
            axle_width,
            min_speed,
            max_speed,
            meters_to_pixels,
            avoidance,
        }
    }

    /// Builds a config from metric axle width and speeds.
    pub fn from_metric(
        axle_width: f64,
        min_speed: f64,
        max_speed: f64,
        meters_to_pixels: f64,
        avoidance: AvoidanceConfig,
    ) -> Self {
        Self::new(
            axle_width * meters_to_pixels,
            min_speed * meters_to_pixels,
            max_speed * meters_to_pixels,
            meters_to_pixels,
            avoidance,
        )
    }

    /// Converts a speed in field units per second to meters per second.
    pub fn to_meters(&self, velocity: Velocity) -> f64 {
        f64::from(velocity) / self.meters_to_pixels
    }

    pub fn validate(&self) -> Result<(), RobotError> {
        if !self.axle_width.is_finite() || self.axle_width <= 0.0 {
            return Err(RobotError::InvalidAxleWidth(self.axle_width));
        }
        if !self.min_speed.is_finite() || !self.max_speed.is_finite() {
            return Err(RobotError::NonFiniteSpeed {
                min: self.min_speed,
                max: self.max_speed,
            });
        }
        if self.min_speed > self.max_speed {
            return Err(RobotError::InvertedSpeedLimits {
                min: self.min_speed,
                max: self.max_speed,
            });
        }
        if !self.meters_to_pixels.is_finite() || self.meters_to_pixels <= 0.0 {
            return Err(RobotError::InvalidUnitConversion(self.meters_to_pixels));
        }
        Ok(())
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self::from_metric(
            0.01,
            0.01,
            0.02,
            Self::METERS_TO_PIXELS,
            AvoidanceConfig::default(),
        )
    }
}
