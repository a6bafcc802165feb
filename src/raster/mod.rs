//! Binary rasters, polygon scan conversion and multi-class compositing.

pub mod composite;
pub mod polygon;

pub use composite::{CompositeMask, CompositeStats, MaskCompositor, OverlapPriority};
pub use polygon::rasterize_polygon;

/// A row-major `width × height` grid of cells holding 0 or 1.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl Raster {
    /// Creates an all-zero raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Returns whether the cell at `(x, y)` is set. Out-of-range reads are unset.
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.cells[self.index(x, y)] != 0
    }

    /// Sets the cell at `(x, y)`. Out-of-range writes are ignored.
    pub fn set(&mut self, x: u32, y: u32) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.cells[idx] = 1;
        }
    }

    /// Cells in row-major order.
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    pub fn count_set(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    pub fn is_clear(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }

    /// `self |= other`.
    pub fn union_with(&mut self, other: &Raster) {
        debug_assert_eq!(self.dims(), other.dims());
        for (dst, &src) in self.cells.iter_mut().zip(&other.cells) {
            *dst |= src;
        }
    }

    /// `self &= !other`.
    pub fn subtract(&mut self, other: &Raster) {
        debug_assert_eq!(self.dims(), other.dims());
        for (dst, &src) in self.cells.iter_mut().zip(&other.cells) {
            if src != 0 {
                *dst = 0;
            }
        }
    }

    /// Returns whether any cell is set in both rasters.
    pub fn intersects(&self, other: &Raster) -> bool {
        self.cells
            .iter()
            .zip(&other.cells)
            .any(|(&a, &b)| a != 0 && b != 0)
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Raster {}x{} ({} set)", self.width, self.height, self.count_set())?;
        if self.width <= 64 && self.height <= 64 {
            for row in self.cells.chunks(self.width.max(1) as usize) {
                let line: String = row.iter().map(|&c| if c != 0 { '#' } else { '.' }).collect();
                writeln!(f, "{line}")?;
            }
        }
        Ok(())
    }
}
