//! Simulation of the robot in an occupancy field.
//!
//! Every frame the robot senses obstacles from its current pose, the avoidance controller commands
//! the wheels and the pose is integrated over the elapsed time, in that order. The sensed point
//! cloud and the traced sensor cells are kept for visualization.

use bevy::prelude::*;

use crate::{
    config::Scenario,
    domain::TraceOverlay,
    resource::{FieldRes, OverlayRes, PointCloudRes, RobotRes, SensorRes, StartRes},
};

/// Systems reading the simulation state should run after this set.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimulationStep;

pub struct Simulator {
    scenario: Scenario,
}

impl Simulator {
    pub fn new(scenario: Scenario) -> Self {
        Self { scenario }
    }
}

impl Plugin for Simulator {
    fn build(&self, app: &mut App) {
        let scenario = self.scenario.clone();
        app.insert_resource(OverlayRes::from(TraceOverlay::for_field(&scenario.field)))
            .insert_resource(RobotRes::from(scenario.robot))
            .insert_resource(SensorRes::from(scenario.sensor))
            .insert_resource(FieldRes::from(scenario.field))
            .insert_resource(StartRes::from(scenario.start))
            .init_resource::<PointCloudRes>()
            .add_systems(Update, simulate.in_set(SimulationStep));
    }
}

fn simulate(
    time: Res<Time>,
    mut robot: ResMut<RobotRes>,
    sensor: Res<SensorRes>,
    field: Res<FieldRes>,
    mut overlay: ResMut<OverlayRes>,
    mut point_cloud: ResMut<PointCloudRes>,
) {
    // Paused
    if time.delta().is_zero() {
        return;
    }

    overlay.clear();
    let sensed = robot.tick(&sensor, &**field, &mut **overlay, time.delta());
    *point_cloud = sensed.into();
}
