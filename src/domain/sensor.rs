//! Range sensor casting a fan of rays against an occupancy field.
//!
//! Each ray is walked in equal linear steps from the sensor origin towards its far end point. The
//! first occupied cell along a ray is reported as an obstacle hit and ends the walk.

use thiserror::Error;

use super::{Angle, OccupancyField, Position, SensorOverlay};

pub const RAY_COUNT: usize = 10;
pub const RAY_STEPS: usize = 100;

/// Obstacle hits of one sensing pass, in ray angle order. At most one hit per ray.
pub type PointCloud = heapless::Vec<ObstaclePoint, RAY_COUNT>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ObstaclePoint {
    pub x: i64,
    pub y: i64,
}

impl ObstaclePoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x as f64, self.y as f64)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum SensorError {
    #[error("sensor range must be finite and non-negative, got {0}")]
    InvalidRange(f64),
    #[error("half field of view must be finite and non-negative, got {0} rad")]
    InvalidFieldOfView(f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorConfig {
    pub max_range: f64,
    pub half_field_of_view: Angle,
}

impl SensorConfig {
    pub fn new(max_range: f64, half_field_of_view: Angle) -> Result<Self, SensorError> {
        if !max_range.is_finite() || max_range < 0.0 {
            return Err(SensorError::InvalidRange(max_range));
        }
        let fov: f64 = half_field_of_view.into();
        if !fov.is_finite() || fov < 0.0 {
            return Err(SensorError::InvalidFieldOfView(fov));
        }
        Ok(Self {
            max_range,
            half_field_of_view,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RangeSensor {
    config: SensorConfig,
}

impl RangeSensor {
    pub fn new(config: SensorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Ray angles evenly spaced over `[heading - fov, heading + fov)`.
    pub fn ray_angles(&self, heading: Angle) -> impl Iterator<Item = Angle> {
        let start: f64 = (heading - self.config.half_field_of_view).into();
        let finish: f64 = (heading + self.config.half_field_of_view).into();
        let step = (finish - start) / RAY_COUNT as f64;
        (0..RAY_COUNT).map(move |k| Angle::new(k as f64 * step + start))
    }

    pub fn sense_obstacles(
        &self,
        field: &impl OccupancyField,
        origin: Position,
        heading: Angle,
    ) -> PointCloud {
        self.sense_obstacles_traced(field, origin, heading, &mut ())
    }

    /// Like [`RangeSensor::sense_obstacles`], additionally marking every traversed in-bounds cell
    /// in `overlay`.
    pub fn sense_obstacles_traced(
        &self,
        field: &impl OccupancyField,
        origin: Position,
        heading: Angle,
        overlay: &mut impl SensorOverlay,
    ) -> PointCloud {
        let mut point_cloud = PointCloud::new();
        for angle in self.ray_angles(heading) {
            if let Some(hit) = self.cast_ray(field, origin, angle, overlay) {
                // One hit per ray, so the capacity is never exceeded.
                let _ = point_cloud.push(hit);
            }
        }
        log::trace!(
            "sensed {} obstacle(s) from ({:.1}, {:.1})",
            point_cloud.len(),
            origin.x(),
            origin.y()
        );
        point_cloud
    }

    fn cast_ray(
        &self,
        field: &impl OccupancyField,
        origin: Position,
        angle: Angle,
        overlay: &mut impl SensorOverlay,
    ) -> Option<ObstaclePoint> {
        let end = origin.project(angle, self.config.max_range);
        for i in 0..RAY_STEPS {
            let sample = origin.lerp(end, i as f64 / RAY_STEPS as f64);
            let (x, y) = (sample.x().floor() as i64, sample.y().floor() as i64);
            if !field.in_bounds(x, y) {
                continue;
            }
            overlay.mark(x, y);
            if field.is_occupied(x, y) {
                return Some(ObstaclePoint::new(x, y));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{
        domain::{OccupancyGrid, TraceOverlay},
        tests::{field_from_rows, sensor_cfg},
    };

    fn walled_field() -> OccupancyGrid {
        let mut field = OccupancyGrid::new(300, 200).unwrap();
        field.fill_rect(150, 0, 10, 200);
        field
    }

    #[test]
    fn test_ray_angles() {
        let sensor = RangeSensor::new(sensor_cfg());
        let angles = sensor.ray_angles(Angle::new(0.0)).collect::<Vec<_>>();
        let fov: f64 = sensor.config().half_field_of_view.into();

        assert_eq!(angles.len(), RAY_COUNT);
        assert_abs_diff_eq!(f64::from(angles[0]), -fov, epsilon = 1e-12);
        for pair in angles.windows(2) {
            assert_abs_diff_eq!(
                f64::from(pair[1]) - f64::from(pair[0]),
                2.0 * fov / RAY_COUNT as f64,
                epsilon = 1e-12
            );
        }
        assert!(f64::from(angles[RAY_COUNT - 1]) < fov);
    }

    #[test]
    fn test_sense_obstacles_in_empty_field() {
        let field = OccupancyGrid::new(300, 200).unwrap();
        let sensor = RangeSensor::new(sensor_cfg());
        let mut overlay = TraceOverlay::for_field(&field);

        let point_cloud = sensor.sense_obstacles_traced(
            &field,
            Position::new(100.0, 100.0),
            Angle::new(0.0),
            &mut overlay,
        );

        assert!(point_cloud.is_empty());
        assert!(overlay.is_marked(100, 100));
        assert!(overlay.marked_count() > RAY_STEPS);
    }

    #[test]
    fn test_sense_obstacles_wall_ahead() {
        let field = walled_field();
        let sensor = RangeSensor::new(sensor_cfg());
        let origin = Position::new(100.0, 100.0);

        let point_cloud = sensor.sense_obstacles(&field, origin, Angle::new(0.0));

        assert_eq!(point_cloud.len(), RAY_COUNT);
        for point in &point_cloud {
            assert!((150..160).contains(&point.x), "{point:?}");
            assert!(field.is_occupied(point.x, point.y));
            assert!(origin.distance(point.position()) < 100.0);
        }
    }

    #[test]
    fn test_sense_obstacles_hits_in_ray_order() {
        let field = walled_field();
        let sensor = RangeSensor::new(sensor_cfg());

        let point_cloud =
            sensor.sense_obstacles(&field, Position::new(100.0, 100.0), Angle::new(0.0));

        // The first ray points below the heading, which is towards larger y on screen.
        let ys = point_cloud.iter().map(|p| p.y).collect::<Vec<_>>();
        assert!(ys.windows(2).all(|w| w[0] >= w[1]), "{ys:?}");
        assert!(ys[0] > 100);
        assert!(ys[RAY_COUNT - 1] < 100);
    }

    #[test]
    fn test_sense_obstacles_first_hit_only() {
        let field = walled_field();
        let sensor = RangeSensor::new(sensor_cfg());
        let mut overlay = TraceOverlay::for_field(&field);

        sensor.sense_obstacles_traced(
            &field,
            Position::new(100.0, 100.0),
            Angle::new(0.0),
            &mut overlay,
        );

        for y in 0..200 {
            assert!(!overlay.is_marked(158, y));
        }
    }

    #[test]
    fn test_sense_obstacles_zero_field_of_view() {
        let field = field_from_rows(&[
            ".....#....", //
            ".....#....",
            ".....#....",
        ]);
        let sensor = RangeSensor::new(SensorConfig::new(8.0, Angle::new(0.0)).unwrap());

        let point_cloud = sensor.sense_obstacles(&field, Position::new(1.5, 1.5), Angle::new(0.0));

        assert_eq!(
            point_cloud.to_vec(),
            vec![ObstaclePoint::new(5, 1); RAY_COUNT]
        );
    }

    #[test]
    fn test_sense_obstacles_origin_in_obstacle() {
        let field = field_from_rows(&["###", "###", "###"]);
        let sensor = RangeSensor::new(SensorConfig::new(2.0, Angle::new(0.0)).unwrap());

        let point_cloud = sensor.sense_obstacles(&field, Position::new(1.5, 1.5), Angle::new(PI));

        assert!(point_cloud.iter().all(|p| *p == ObstaclePoint::new(1, 1)));
    }

    #[rstest]
    #[case::far_outside(Position::new(-500.0, -500.0), 0.0)]
    #[case::looking_away(Position::new(1.0, 1.0), PI)]
    fn test_sense_obstacles_out_of_bounds(#[case] origin: Position, #[case] heading: f64) {
        let field = field_from_rows(&["...#", "...#"]);
        let sensor = RangeSensor::new(SensorConfig::new(50.0, Angle::from_deg(10.0)).unwrap());
        let mut overlay = TraceOverlay::for_field(&field);

        let point_cloud =
            sensor.sense_obstacles_traced(&field, origin, Angle::new(heading), &mut overlay);

        assert!(point_cloud.is_empty());
    }

    // Samples in (-1, 0) belong to the cell left of or above the field, not to cell 0.
    #[test]
    fn test_sense_obstacles_origin_just_outside() {
        let field = field_from_rows(&["#..", "#.."]);
        let sensor = RangeSensor::new(SensorConfig::new(50.0, Angle::new(0.0)).unwrap());
        let mut overlay = TraceOverlay::for_field(&field);

        let point_cloud = sensor.sense_obstacles_traced(
            &field,
            Position::new(-0.9, 0.5),
            Angle::new(PI),
            &mut overlay,
        );

        assert!(point_cloud.is_empty());
        assert_eq!(overlay.marked_count(), 0);
    }

    #[rstest]
    #[case(Position::new(20.0, 20.0), 0.0)]
    #[case(Position::new(20.0, 20.0), 0.5 * PI)]
    #[case(Position::new(5.0, 35.0), 0.25 * PI)]
    #[case(Position::new(35.0, 5.0), 1.25 * PI)]
    fn test_sense_obstacles_bounded(#[case] origin: Position, #[case] heading: f64) {
        let mut field = OccupancyGrid::new(40, 40).unwrap();
        for i in (0..40).step_by(3) {
            field.fill_rect(i, (i * 7) % 40, 2, 2);
        }
        field.fill_rect(0, 0, 40, 1);
        field.fill_rect(0, 39, 40, 1);
        field.fill_rect(0, 0, 1, 40);
        field.fill_rect(39, 0, 1, 40);
        let sensor = RangeSensor::new(SensorConfig::new(100.0, Angle::from_deg(60.0)).unwrap());

        let point_cloud = sensor.sense_obstacles(&field, origin, Angle::new(heading));

        assert!(point_cloud.len() <= RAY_COUNT);
        assert!(point_cloud.iter().all(|p| field.in_bounds(p.x, p.y)));
        assert!(point_cloud.iter().all(|p| field.is_occupied(p.x, p.y)));
    }

    #[test]
    fn test_sensing_leaves_field_unchanged() {
        let field = walled_field();
        let before = field.clone();
        let sensor = RangeSensor::new(sensor_cfg());
        let mut overlay = TraceOverlay::for_field(&field);

        let origin = Position::new(100.0, 100.0);
        let first = sensor.sense_obstacles_traced(&field, origin, Angle::new(0.0), &mut overlay);
        let second = sensor.sense_obstacles_traced(&field, origin, Angle::new(0.0), &mut overlay);

        assert_eq!(field, before);
        assert_eq!(first, second);
        for point in &first {
            assert!(overlay.is_marked(point.x, point.y));
        }
    }

    #[rstest]
    #[case(-1.0, 0.5)]
    #[case(f64::NAN, 0.5)]
    #[case(10.0, -0.1)]
    #[case(10.0, f64::INFINITY)]
    fn test_sensor_config_rejects_invalid(#[case] range: f64, #[case] fov: f64) {
        assert!(SensorConfig::new(range, Angle::new(fov)).is_err());
    }
}
