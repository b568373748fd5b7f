use std::env;

use bevy::{prelude::*, window::WindowResolution};

use crate::config::{ConfigError, SimulationConfig};


mod config;
mod domain;
mod map;
mod resource;
mod simulator;
mod visualizer;

fn main() -> Result<(), ConfigError> {
    let config = match env::args().nth(1) {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let scenario = config.build()?;

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Obstacle Avoidance".into(),
                resolution: WindowResolution::new(
                    config.map.width as f32,
                    config.map.height as f32,
                ),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(simulator::Simulator::new(scenario))
        .add_plugins(visualizer::Visualizer)
        .run();

    Ok(())
}
