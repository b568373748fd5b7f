//! Timed reactive obstacle avoidance.
//!
//! While an obstacle is closer than the configured threshold and the countdown budget lasts, the
//! controller commands a turning reverse maneuver and boosts the angular velocity. The boost is
//! held for a timeout after the last reverse command. Otherwise the robot cruises straight ahead.

use std::time::Duration;

use super::{ObstaclePoint, Position};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AvoidanceConfig {
    /// Obstacles closer than this distance trigger the reverse maneuver.
    pub min_obstacle_distance: f64,
    /// Time budget in seconds for reversing before cruising is forced again.
    pub countdown: f64,
    pub baseline_angular_velocity: f64,
    /// Boosted angular velocity is this multiple of the maximum wheel speed.
    pub angular_velocity_multiplier: f64,
    /// Seconds the boost is held after the last reverse command.
    pub angular_velocity_timeout: f64,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            min_obstacle_distance: 100.0,
            countdown: 5.0,
            baseline_angular_velocity: 0.01,
            angular_velocity_multiplier: 2.0,
            angular_velocity_timeout: 1.0,
        }
    }
}

/// Wheel command chosen by the controller for the current tick.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Maneuver {
    #[default]
    Cruise,
    Reverse,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AvoidanceState {
    countdown: f64,
    angular_velocity: f64,
    angular_velocity_timer: f64,
    maneuver: Maneuver,
}

impl AvoidanceState {
    pub fn countdown(&self) -> f64 {
        self.countdown
    }

    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    pub fn angular_velocity_timer(&self) -> f64 {
        self.angular_velocity_timer
    }

    pub fn maneuver(&self) -> Maneuver {
        self.maneuver
    }

    pub fn is_recovering(&self) -> bool {
        self.angular_velocity_timer > 0.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AvoidanceController {
    config: AvoidanceConfig,
    state: AvoidanceState,
}

impl AvoidanceController {
    pub fn new(config: AvoidanceConfig) -> Self {
        Self {
            state: AvoidanceState {
                countdown: config.countdown,
                angular_velocity: config.baseline_angular_velocity,
                angular_velocity_timer: 0.0,
                maneuver: Maneuver::Cruise,
            },
            config,
        }
    }

    pub fn config(&self) -> &AvoidanceConfig {
        &self.config
    }

    pub fn state(&self) -> &AvoidanceState {
        &self.state
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Advances the state machine by `dt` and returns the maneuver to command.
    ///
    /// At least two obstacle points are required before the nearest one is considered at all.
    pub fn update(
        &mut self,
        position: Position,
        point_cloud: &[ObstaclePoint],
        max_speed: f64,
        dt: Duration,
    ) -> Maneuver {
        let dt = dt.as_secs_f64();
        let boosted = self.config.angular_velocity_multiplier * max_speed;

        let obstacle_close = point_cloud.len() > 1
            && nearest_obstacle(position, point_cloud)
                .is_some_and(|(_, distance)| distance < self.config.min_obstacle_distance);

        let maneuver = if obstacle_close && self.state.countdown > 0.0 {
            self.state.countdown -= dt;
            self.state.angular_velocity_timer = self.config.angular_velocity_timeout;
            self.state.angular_velocity = boosted;
            Maneuver::Reverse
        } else {
            self.state.countdown = self.config.countdown;
            self.state.angular_velocity = self.config.baseline_angular_velocity;
            Maneuver::Cruise
        };

        if self.state.angular_velocity_timer > 0.0 {
            self.state.angular_velocity_timer -= dt;
            self.state.angular_velocity = boosted;
        }

        if maneuver != self.state.maneuver {
            log::debug!(
                "avoidance {:?} -> {:?} (countdown {:.2} s)",
                self.state.maneuver,
                maneuver,
                self.state.countdown
            );
        }
        self.state.maneuver = maneuver;

        maneuver
    }
}

/// Nearest point by Euclidean distance. The first of several equally near points wins.
pub fn nearest_obstacle(
    position: Position,
    point_cloud: &[ObstaclePoint],
) -> Option<(ObstaclePoint, f64)> {
    let mut nearest = None;
    let mut min_distance = f64::INFINITY;
    for point in point_cloud {
        let distance = position.distance(point.position());
        if distance < min_distance {
            min_distance = distance;
            nearest = Some((*point, distance));
        }
    }
    nearest
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const MAX_SPEED: f64 = 75.6;
    const DT: Duration = Duration::from_millis(100);

    fn near() -> [ObstaclePoint; 2] {
        [ObstaclePoint::new(50, 0), ObstaclePoint::new(60, 10)]
    }

    #[test]
    fn test_initial_state() {
        let controller = AvoidanceController::new(AvoidanceConfig::default());
        let state = controller.state();
        assert_abs_diff_eq!(state.countdown(), 5.0);
        assert_abs_diff_eq!(state.angular_velocity(), 0.01);
        assert_abs_diff_eq!(state.angular_velocity_timer(), 0.0);
        assert_eq!(state.maneuver(), Maneuver::Cruise);
    }

    #[test]
    fn test_reverse_when_obstacle_close() {
        let mut controller = AvoidanceController::new(AvoidanceConfig::default());

        let maneuver = controller.update(Position::default(), &near(), MAX_SPEED, DT);

        assert_eq!(maneuver, Maneuver::Reverse);
        let state = controller.state();
        assert_abs_diff_eq!(state.countdown(), 4.9, epsilon = 1e-12);
        assert_abs_diff_eq!(state.angular_velocity(), 2.0 * MAX_SPEED);
        // Armed to the full timeout, then already run down by this tick.
        assert_abs_diff_eq!(state.angular_velocity_timer(), 0.9, epsilon = 1e-12);
        assert!(state.is_recovering());
    }

    // A single close point is ignored; two are needed before the nearest one counts. It takes the
    // cruise branch and restores the countdown and baseline angular velocity.
    #[test]
    fn test_single_point_is_ignored() {
        let mut controller = AvoidanceController::new(AvoidanceConfig {
            angular_velocity_timeout: 0.05,
            ..AvoidanceConfig::default()
        });
        controller.update(Position::default(), &near(), MAX_SPEED, DT);
        assert_abs_diff_eq!(controller.state().countdown(), 4.9, epsilon = 1e-12);

        let maneuver = controller.update(
            Position::default(),
            &[ObstaclePoint::new(1, 1)],
            MAX_SPEED,
            DT,
        );

        assert_eq!(maneuver, Maneuver::Cruise);
        assert_abs_diff_eq!(controller.state().countdown(), 5.0);
        assert_abs_diff_eq!(controller.state().angular_velocity(), 0.01);
        assert!(!controller.state().is_recovering());
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::far(vec![ObstaclePoint::new(100, 0), ObstaclePoint::new(0, 150)])]
    fn test_cruise_resets_state(#[case] point_cloud: Vec<ObstaclePoint>) {
        let mut controller = AvoidanceController::new(AvoidanceConfig::default());
        controller.update(Position::default(), &near(), MAX_SPEED, DT);
        controller.state.angular_velocity_timer = 0.0;

        let maneuver = controller.update(Position::default(), &point_cloud, MAX_SPEED, DT);

        assert_eq!(maneuver, Maneuver::Cruise);
        assert_abs_diff_eq!(controller.state().countdown(), 5.0);
        assert_abs_diff_eq!(controller.state().angular_velocity(), 0.01);
    }

    #[test]
    fn test_boost_held_until_timeout() {
        let mut controller = AvoidanceController::new(AvoidanceConfig {
            angular_velocity_timeout: 0.25,
            ..AvoidanceConfig::default()
        });
        controller.update(Position::default(), &near(), MAX_SPEED, DT);

        let mut angular_velocities = vec![];
        for _ in 0..3 {
            controller.update(Position::default(), &[], MAX_SPEED, DT);
            angular_velocities.push(controller.state().angular_velocity());
        }

        assert_abs_diff_eq!(angular_velocities[0], 2.0 * MAX_SPEED);
        assert_abs_diff_eq!(angular_velocities[1], 2.0 * MAX_SPEED);
        assert_abs_diff_eq!(angular_velocities[2], 0.01);
        assert!(!controller.state().is_recovering());
    }

    #[test]
    fn test_countdown_exhaustion() {
        let mut controller = AvoidanceController::new(AvoidanceConfig {
            countdown: 0.25,
            ..AvoidanceConfig::default()
        });

        let maneuvers = (0..8)
            .map(|_| controller.update(Position::default(), &near(), MAX_SPEED, DT))
            .collect::<Vec<_>>();

        insta::assert_debug_snapshot!(maneuvers, @r"
        [
            Reverse,
            Reverse,
            Reverse,
            Cruise,
            Reverse,
            Reverse,
            Reverse,
            Cruise,
        ]
        ");
    }

    #[test]
    fn test_reset() {
        let mut controller = AvoidanceController::new(AvoidanceConfig::default());
        controller.update(Position::default(), &near(), MAX_SPEED, DT);

        controller.reset();

        assert_eq!(
            controller,
            AvoidanceController::new(AvoidanceConfig::default())
        );
    }

    #[rstest]
    #[case::empty(vec![], None)]
    #[case::single(
        vec![ObstaclePoint::new(3, 4)],
        Some((ObstaclePoint::new(3, 4), 5.0))
    )]
    #[case::nearest_last(
        vec![ObstaclePoint::new(6, 8), ObstaclePoint::new(0, 1)],
        Some((ObstaclePoint::new(0, 1), 1.0))
    )]
    #[case::tie_keeps_first(
        vec![ObstaclePoint::new(0, 2), ObstaclePoint::new(2, 0), ObstaclePoint::new(0, -2)],
        Some((ObstaclePoint::new(0, 2), 2.0))
    )]
    fn test_nearest_obstacle(
        #[case] point_cloud: Vec<ObstaclePoint>,
        #[case] expected: Option<(ObstaclePoint, f64)>,
    ) {
        assert_eq!(nearest_obstacle(Position::default(), &point_cloud), expected);
    }
}
