//! Procedural occupancy maps: a closed border wall with randomly placed rectangular obstacles.
//!
//! Generation is seeded, so the same settings always produce the same map.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{FieldError, OccupancyGrid, Position};

const MAX_ATTEMPTS_PER_OBSTACLE: usize = 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub width: usize,
    pub height: usize,
    pub seed: u64,
    /// Thickness of the surrounding wall in cells.
    pub border: i64,
    pub obstacle_count: usize,
    pub obstacle_min_size: i64,
    pub obstacle_max_size: i64,
    /// No obstacle is placed closer than this to the start position.
    pub start_clearance: f64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            seed: 19878367467712,
            border: 10,
            obstacle_count: 25,
            obstacle_min_size: 20,
            obstacle_max_size: 80,
            start_clearance: 120.0,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum MapError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("invalid obstacle size range {min}..={max}")]
    InvalidObstacleSize { min: i64, max: i64 },
    #[error("border of {border} cells does not fit a {width}x{height} map")]
    InvalidBorder {
        border: i64,
        width: usize,
        height: usize,
    },
}

pub fn generate_field(settings: &MapSettings, start: Position) -> Result<OccupancyGrid, MapError> {
    let mut field = OccupancyGrid::new(settings.width, settings.height)?;
    let (width, height) = (settings.width as i64, settings.height as i64);
    let border = settings.border;

    if border < 0 || 2 * border >= width.min(height) {
        return Err(MapError::InvalidBorder {
            border,
            width: settings.width,
            height: settings.height,
        });
    }
    if settings.obstacle_min_size <= 0 || settings.obstacle_min_size > settings.obstacle_max_size
    {
        return Err(MapError::InvalidObstacleSize {
            min: settings.obstacle_min_size,
            max: settings.obstacle_max_size,
        });
    }

    field.fill_rect(0, 0, width, border);
    field.fill_rect(0, height - border, width, border);
    field.fill_rect(0, 0, border, height);
    field.fill_rect(width - border, 0, border, height);

    let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
    let mut placed = 0;

    for _ in 0..settings.obstacle_count * MAX_ATTEMPTS_PER_OBSTACLE {
        if placed == settings.obstacle_count {
            break;
        }

        let size_x = rng.random_range(settings.obstacle_min_size..=settings.obstacle_max_size);
        let size_y = rng.random_range(settings.obstacle_min_size..=settings.obstacle_max_size);
        if width - border - size_x <= border || height - border - size_y <= border {
            continue;
        }
        let x = rng.random_range(border..width - border - size_x);
        let y = rng.random_range(border..height - border - size_y);

        if distance_to_rect(start, x, y, size_x, size_y) < settings.start_clearance {
            continue;
        }

        field.fill_rect(x, y, size_x, size_y);
        placed += 1;
    }

    if placed < settings.obstacle_count {
        log::warn!(
            "placed only {placed} of {} obstacles",
            settings.obstacle_count
        );
    }
    log::info!(
        "generated {}x{} map with {placed} obstacles (seed {})",
        settings.width,
        settings.height,
        settings.seed
    );

    Ok(field)
}

fn distance_to_rect(position: Position, x: i64, y: i64, size_x: i64, size_y: i64) -> f64 {
    let closest = Position::new(
        position.x().clamp(x as f64, (x + size_x) as f64),
        position.y().clamp(y as f64, (y + size_y) as f64),
    );
    position.distance(closest)
}
