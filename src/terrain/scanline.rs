//! Rolling three-row cache used while generating cube-map faces.

use glam::Vec4;

use super::lanes::{Lanes3, LANES};

/// One row of displaced samples, stored per axis
#[derive(Debug, Clone, Default)]
pub struct CacheLine {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub height: Vec<f32>,
    pub latitude: Vec<f32>,
}

impl CacheLine {
    fn resize(&mut self, columns: usize) {
        for column in [&mut self.x, &mut self.y, &mut self.z, &mut self.height, &mut self.latitude] {
            column.resize(columns, 0.0);
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Writes a block of four samples starting at column `start`
    pub fn store(&mut self, start: usize, positions: &Lanes3, heights: Vec4, latitudes: Vec4) {
        let end = start + LANES;
        self.x[start..end].copy_from_slice(&positions.x.to_array());
        self.y[start..end].copy_from_slice(&positions.y.to_array());
        self.z[start..end].copy_from_slice(&positions.z.to_array());
        self.height[start..end].copy_from_slice(&heights.to_array());
        self.latitude[start..end].copy_from_slice(&latitudes.to_array());
    }

    pub fn positions(&self, start: usize) -> Lanes3 {
        Lanes3::load(&self.x, &self.y, &self.z, start)
    }

    pub fn heights(&self, start: usize) -> Vec4 {
        Vec4::from_slice(&self.height[start..start + LANES])
    }

    pub fn latitudes(&self, start: usize) -> Vec4 {
        Vec4::from_slice(&self.latitude[start..start + LANES])
    }
}

/// Three cache lines whose previous/current/next roles rotate by index
#[derive(Debug, Clone)]
pub struct ScanlineCache {
    lines: [CacheLine; 3],
    columns: usize,
    previous: usize,
    current: usize,
    next: usize,
}

impl Default for ScanlineCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanlineCache {
    pub fn new() -> Self {
        Self {
            lines: Default::default(),
            columns: 0,
            previous: 0,
            current: 1,
            next: 2,
        }
    }

    /// Column capacity of every line
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Grows the lines to hold `columns` samples and resets the roles.
    /// Lines never shrink.
    pub fn prepare(&mut self, columns: usize) {
        if columns > self.columns {
            for line in &mut self.lines {
                line.resize(columns);
            }
            self.columns = columns;
        }
        self.previous = 0;
        self.current = 1;
        self.next = 2;
    }

    pub fn previous(&self) -> &CacheLine {
        &self.lines[self.previous]
    }

    pub fn current(&self) -> &CacheLine {
        &self.lines[self.current]
    }

    pub fn next(&self) -> &CacheLine {
        &self.lines[self.next]
    }

    pub fn previous_mut(&mut self) -> &mut CacheLine {
        &mut self.lines[self.previous]
    }

    pub fn current_mut(&mut self) -> &mut CacheLine {
        &mut self.lines[self.current]
    }

    pub fn next_mut(&mut self) -> &mut CacheLine {
        &mut self.lines[self.next]
    }

    /// Advances one row: the oldest line becomes `next` and must be refilled
    pub fn rotate(&mut self) {
        self.previous = self.current;
        self.current = self.next;
        self.next = (self.next + 1) % 3;
    }
}
