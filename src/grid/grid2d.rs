use glam::{UVec2, Vec2};

use crate::types::{GridError, MapInfo};

/// Row-major 2-D grid backed by a single contiguous buffer.
///
/// Cell (x, y) lives at index `y * width + x`. Resizing is ordinary value
/// semantics: build a new grid and assign it.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2d<T> {
    info: MapInfo,
    data: Vec<T>,
}

impl<T> Grid2d<T> {
    pub fn new(info: MapInfo, data: Vec<T>) -> Result<Self, GridError> {
        let expected_len = (info.width as usize) * (info.height as usize);
        if data.len() != expected_len {
            return Err(GridError::InvalidMetadata(format!(
                "data length {} does not match map size {}",
                data.len(),
                expected_len
            )));
        }

        Ok(Self { info, data })
    }

    pub fn info(&self) -> &MapInfo {
        &self.info
    }

    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    pub fn get(&self, pos: UVec2) -> Option<&T> {
        if pos.x >= self.info.width || pos.y >= self.info.height {
            return None;
        }
        let idx = self.index(pos);
        Some(&self.data[idx])
    }

    pub fn set(&mut self, pos: UVec2, value: T) -> Result<(), GridError> {
        if pos.x >= self.info.width || pos.y >= self.info.height {
            return Err(GridError::OutOfBounds(format!(
                "cell ({}, {}) out of bounds for map {}x{}",
                pos.x, pos.y, self.info.width, self.info.height
            )));
        }
        let idx = self.index(pos);
        self.data[idx] = value;
        Ok(())
    }

    #[inline]
    pub fn index(&self, pos: UVec2) -> usize {
        (pos.y as usize) * (self.info.width as usize) + (pos.x as usize)
    }

    #[inline]
    pub fn cell_of_index(&self, index: usize) -> UVec2 {
        let w = self.info.width as usize;
        UVec2::new((index % w) as u32, (index / w) as u32)
    }

    /// World coordinate of a (fractional) map coordinate.
    pub fn map_to_world(&self, pos: Vec2) -> Vec2 {
        self.info.origin + pos * self.info.resolution
    }

    /// Cell containing a world point, or `None` if outside the grid.
    pub fn world_to_map(&self, pos: Vec2) -> Option<UVec2> {
        let mx = (pos.x - self.info.origin.x) / self.info.resolution;
        let my = (pos.y - self.info.origin.y) / self.info.resolution;
        if mx < 0.0 || my < 0.0 || mx >= self.info.width as f32 || my >= self.info.height as f32 {
            return None;
        }
        Some(UVec2::new(mx as u32, my as u32))
    }

    /// Cell for a world point, with out-of-range points clamped onto the
    /// nearest edge cell. Used for update windows that may extend past the
    /// grid (or be deliberately unbounded).
    pub fn world_to_map_clamped(&self, pos: Vec2) -> UVec2 {
        let mx = (pos.x - self.info.origin.x) / self.info.resolution;
        let my = (pos.y - self.info.origin.y) / self.info.resolution;
        UVec2::new(
            (mx.max(0.0) as u32).min(self.info.width.saturating_sub(1)),
            (my.max(0.0) as u32).min(self.info.height.saturating_sub(1)),
        )
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterate all cells with their coordinates, row by row.
    pub fn iter_cells(&self) -> impl Iterator<Item = (UVec2, &T)> {
        let w = self.info.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| (UVec2::new(i as u32 % w, i as u32 / w), v))
    }
}

impl<T: Copy> Grid2d<T> {
    /// Create a grid with every cell set to `value`.
    pub fn new_with_value(info: MapInfo, value: T) -> Self {
        let len = (info.width as usize) * (info.height as usize);
        Self {
            info,
            data: vec![value; len],
        }
    }

    /// Set every cell in [min, max) to `value`. The region is clamped to
    /// the grid.
    pub fn fill_region(&mut self, min: UVec2, max: UVec2, value: T) {
        let x0 = min.x.min(self.info.width) as usize;
        let x1 = max.x.min(self.info.width) as usize;
        let y0 = min.y.min(self.info.height) as usize;
        let y1 = max.y.min(self.info.height) as usize;
        let w = self.info.width as usize;
        for y in y0..y1 {
            let row = y * w;
            self.data[row + x0..row + x1].fill(value);
        }
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Move the grid origin, preserving cells that remain inside the new
    /// window and filling newly exposed cells with `fill`. The shift is
    /// snapped to whole cells so cell centers stay aligned.
    pub fn update_origin(&mut self, new_origin: Vec2, fill: T) {
        let res = self.info.resolution;
        let shift_x = ((new_origin.x - self.info.origin.x) / res).floor() as i64;
        let shift_y = ((new_origin.y - self.info.origin.y) / res).floor() as i64;
        if shift_x == 0 && shift_y == 0 {
            return;
        }

        let w = self.info.width as i64;
        let h = self.info.height as i64;
        let mut data = vec![fill; (w * h) as usize];
        for y in 0..h {
            let src_y = y + shift_y;
            if src_y < 0 || src_y >= h {
                continue;
            }
            for x in 0..w {
                let src_x = x + shift_x;
                if src_x < 0 || src_x >= w {
                    continue;
                }
                data[(y * w + x) as usize] = self.data[(src_y * w + src_x) as usize];
            }
        }

        self.data = data;
        self.info.origin += Vec2::new(shift_x as f32 * res, shift_y as f32 * res);
    }
}
