//! The domain module encapsulates the core business logic. It defines the `Robot`, its
//! `RangeSensor` and the `OccupancyField` the sensor observes, along with the avoidance rules
//! coupling them.
//!
//! By minimizing hard dependencies, this module ensures the business logic remains adaptable and
//! independent of specific implementation details.

mod avoidance;
mod basis;
mod field;
mod robot;
mod sensor;

pub use avoidance::{
    nearest_obstacle, AvoidanceConfig, AvoidanceController, AvoidanceState, Maneuver,
};
pub use basis::{Angle, Position, Velocity};
pub use field::{FieldError, OccupancyField, OccupancyGrid, SensorOverlay, TraceOverlay};
pub use robot::{Pose, Robot, RobotConfig, RobotError, WheelSpeeds};
pub use sensor::{
    ObstaclePoint, PointCloud, RangeSensor, SensorConfig, SensorError, RAY_COUNT, RAY_STEPS,
};
