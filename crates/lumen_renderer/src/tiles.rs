//! Coarse tile grids for reduced-scale render passes.
//!
//! A pass at scale `s` shades one sample per `s x s` tile and splats it over
//! the whole tile. Tiles on the right and bottom edges are clipped to the
//! frame, so every pixel is covered exactly once per pass.

use lumen_core::Color;

/// A rectangular block of frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// X coordinate of the tile's top-left corner
    pub x: u32,
    /// Y coordinate of the tile's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// How a splatted sample combines with what the buffer already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Splat {
    Add,
    Assign,
}

/// Frame partitioned into `scale x scale` tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    pub columns: u32,
    pub rows: u32,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, scale: u32) -> Self {
        let scale = scale.max(1);
        Self {
            width,
            height,
            scale,
            columns: width.div_ceil(scale),
            rows: height.div_ceil(scale),
        }
    }

    /// Weight one pass contributes to every pixel (`1 / scale²`).
    pub fn sample_weight(&self) -> f32 {
        1.0 / (self.scale as f32).powi(2)
    }

    /// Number of buffer entries in one row of tiles.
    pub fn band_len(&self) -> usize {
        self.width as usize * self.scale as usize
    }

    pub fn tile(&self, column: u32, row: u32) -> Tile {
        let x = column * self.scale;
        let y = row * self.scale;
        Tile {
            x,
            y,
            width: self.scale.min(self.width - x),
            height: self.scale.min(self.height - y),
        }
    }

    /// Screen position sampled for a tile, spanning [0, 1] across the grid.
    pub fn screen_position(&self, column: u32, row: u32) -> (f32, f32) {
        (
            grid_fraction(column, self.columns),
            grid_fraction(row, self.rows),
        )
    }

    /// Shade and splat one row of tiles.
    ///
    /// `band` is the slice of a row-major frame buffer starting at the
    /// band's first pixel (the last band may be shorter). Each tile receives
    /// `shade(u, v) * sample_weight()`.
    pub fn splat_band(
        &self,
        band: &mut [Color],
        row: u32,
        mode: Splat,
        mut shade: impl FnMut(f32, f32) -> Color,
    ) {
        let weight = self.sample_weight();
        let stride = self.width as usize;

        for column in 0..self.columns {
            let (u, v) = self.screen_position(column, row);
            let sample = shade(u, v) * weight;
            let tile = self.tile(column, row);

            for ty in 0..tile.height as usize {
                let start = ty * stride + tile.x as usize;
                let pixels = &mut band[start..start + tile.width as usize];
                match mode {
                    Splat::Add => pixels.iter_mut().for_each(|p| *p += sample),
                    Splat::Assign => pixels.fill(sample),
                }
            }
        }
    }
}

fn grid_fraction(index: u32, count: u32) -> f32 {
    if count <= 1 {
        0.5
    } else {
        index as f32 / (count - 1) as f32
    }
}
