//! Occupancy field the range sensor casts its rays against, and the debug overlay the sensor
//! marks traversed cells in.

use thiserror::Error;

/// Two-dimensional occupancy lookup on integer cell coordinates.
pub trait OccupancyField {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn is_occupied(&self, x: i64, y: i64) -> bool;

    fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as u64) < self.width() as u64 && (y as u64) < self.height() as u64
    }
}

/// Sink for cells traversed by sensor rays. Marking never changes occupancy.
pub trait SensorOverlay {
    fn mark(&mut self, x: i64, y: i64);
}

/// Headless overlay that discards every mark.
impl SensorOverlay for () {
    fn mark(&mut self, _x: i64, _y: i64) {}
}

#[derive(Error, Debug, PartialEq)]
pub enum FieldError {
    #[error("field dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: usize, height: usize },
    #[error("cell ({x}, {y}) is outside the {width}x{height} field")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },
}

/// Dense boolean grid stored row by row.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    pub fn new(width: usize, height: usize) -> Result<Self, FieldError> {
        if width == 0 || height == 0 {
            return Err(FieldError::EmptyDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: vec![false; width * height],
        })
    }

    pub fn set_occupied(&mut self, x: i64, y: i64, occupied: bool) -> Result<(), FieldError> {
        let idx = self.index(x, y)?;
        self.cells[idx] = occupied;
        Ok(())
    }

    /// Occupies the axis-aligned rectangle with its top-left corner at `(x, y)`. Cells falling
    /// outside the grid are ignored.
    pub fn fill_rect(&mut self, x: i64, y: i64, width: i64, height: i64) {
        for cy in y..y + height {
            for cx in x..x + width {
                if let Ok(idx) = self.index(cx, cy) {
                    self.cells[idx] = true;
                }
            }
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    fn index(&self, x: i64, y: i64) -> Result<usize, FieldError> {
        if self.in_bounds(x, y) {
            Ok(y as usize * self.width + x as usize)
        } else {
            Err(FieldError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }
}

impl OccupancyField for OccupancyGrid {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn is_occupied(&self, x: i64, y: i64) -> bool {
        self.index(x, y).map(|idx| self.cells[idx]).unwrap_or(false)
    }
}

/// Marker layer with the same dimensions as the field it overlays.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceOverlay {
    width: usize,
    height: usize,
    marked: Vec<bool>,
}

impl TraceOverlay {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            marked: vec![false; width * height],
        }
    }

    pub fn for_field(field: &impl OccupancyField) -> Self {
        Self::new(field.width(), field.height())
    }

    pub fn is_marked(&self, x: i64, y: i64) -> bool {
        self.index(x, y).map(|idx| self.marked[idx]).unwrap_or(false)
    }

    pub fn marked_count(&self) -> usize {
        self.marked.iter().filter(|m| **m).count()
    }

    pub fn clear(&mut self) {
        self.marked.fill(false);
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }
}

impl SensorOverlay for TraceOverlay {
    fn mark(&mut self, x: i64, y: i64) {
        if let Some(idx) = self.index(x, y) {
            self.marked[idx] = true;
        }
    }
}
