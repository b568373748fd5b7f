//! Simulation configuration, loaded from a JSON file. Missing fields fall back to their defaults.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    domain::{
        Angle, AvoidanceConfig, OccupancyField, OccupancyGrid, Position, RangeSensor, Robot,
        RobotConfig, RobotError, SensorConfig, SensorError,
    },
    map::{generate_field, MapError, MapSettings},
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Robot(#[from] RobotError),
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("start position ({x}, {y}) is outside the map")]
    StartOutOfBounds { x: f64, y: f64 },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub map: MapSettings,
    pub robot: RobotSettings,
    pub sensor: SensorSettings,
}

/// Robot settings. Axle width and speeds are metric and converted with `meters_to_pixels`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotSettings {
    pub start_x: f64,
    pub start_y: f64,
    pub meters_to_pixels: f64,
    pub axle_width: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub min_obstacle_distance: f64,
    pub countdown: f64,
    pub baseline_angular_velocity: f64,
    pub angular_velocity_multiplier: f64,
    pub angular_velocity_timeout: f64,
}

impl Default for RobotSettings {
    fn default() -> Self {
        let avoidance = AvoidanceConfig::default();
        Self {
            start_x: 200.0,
            start_y: 200.0,
            meters_to_pixels: RobotConfig::METERS_TO_PIXELS,
            axle_width: 0.01,
            min_speed: 0.01,
            max_speed: 0.02,
            min_obstacle_distance: avoidance.min_obstacle_distance,
            countdown: avoidance.countdown,
            baseline_angular_velocity: avoidance.baseline_angular_velocity,
            angular_velocity_multiplier: avoidance.angular_velocity_multiplier,
            angular_velocity_timeout: avoidance.angular_velocity_timeout,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub range: f64,
    pub half_field_of_view_deg: f64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            range: 250.0,
            half_field_of_view_deg: 40.0,
        }
    }
}

/// Everything one simulation run needs, built from a [`SimulationConfig`].
#[derive(Clone, Debug)]
pub struct Scenario {
    pub robot: Robot,
    pub sensor: RangeSensor,
    pub field: OccupancyGrid,
    pub start: Position,
}

impl SimulationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn start_position(&self) -> Position {
        Position::new(self.robot.start_x, self.robot.start_y)
    }

    pub fn robot_config(&self) -> RobotConfig {
        let r = &self.robot;
        RobotConfig::from_metric(
            r.axle_width,
            r.min_speed,
            r.max_speed,
            r.meters_to_pixels,
            AvoidanceConfig {
                min_obstacle_distance: r.min_obstacle_distance,
                countdown: r.countdown,
                baseline_angular_velocity: r.baseline_angular_velocity,
                angular_velocity_multiplier: r.angular_velocity_multiplier,
                angular_velocity_timeout: r.angular_velocity_timeout,
            },
        )
    }

    pub fn sensor_config(&self) -> Result<SensorConfig, SensorError> {
        SensorConfig::new(
            self.sensor.range,
            Angle::from_deg(self.sensor.half_field_of_view_deg),
        )
    }

    pub fn build(&self) -> Result<Scenario, ConfigError> {
        let start = self.start_position();
        let field = generate_field(&self.map, start)?;
        if !field.in_bounds(start.x() as i64, start.y() as i64) {
            return Err(ConfigError::StartOutOfBounds {
                x: start.x(),
                y: start.y(),
            });
        }
        Ok(Scenario {
            robot: Robot::new(start, self.robot_config())?,
            sensor: RangeSensor::new(self.sensor_config()?),
            field,
            start,
        })
    }
}
