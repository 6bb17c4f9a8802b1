//! ASCII preview for headless runs.
//!
//! Downsamples the surface onto a character grid: `#` for occupied mask
//! cells, the particle's first character for cells holding a glyph's
//! center, `.` elsewhere. Particles draw over the mask.

use glyphfall_core::{OccupancyMask, Particle, Surface};

const EMPTY: char = '.';
const MASK: char = '#';

/// Character grid sized to a surface.
#[derive(Clone, Debug)]
pub struct AsciiPreview {
    columns: usize,
    rows: usize,
    cell_width: f32,
    cell_height: f32,
    cells: Vec<char>,
}

impl AsciiPreview {
    /// Creates a preview `columns` wide. Rows follow from the surface aspect
    /// with cells twice as tall as wide, like a terminal font.
    #[must_use]
    pub fn new(surface: Surface, columns: usize) -> Self {
        let columns = columns.max(1);
        let cell_width = (surface.width / columns as f32).max(1.0);
        let cell_height = cell_width * 2.0;
        let rows = ((surface.height / cell_height).ceil() as usize).max(1);
        Self {
            columns,
            rows,
            cell_width,
            cell_height,
            cells: vec![EMPTY; columns * rows],
        }
    }

    /// Grid width in characters.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Grid height in characters.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    fn idx(&self, column: usize, row: usize) -> usize {
        row * self.columns + column
    }

    fn cell_of(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        if !(x.is_finite() && y.is_finite()) || x < 0.0 || y < 0.0 {
            return None;
        }
        let column = (x / self.cell_width) as usize;
        let row = (y / self.cell_height) as usize;
        (column < self.columns && row < self.rows).then_some((column, row))
    }

    /// Redraws the grid from a mask and the live particles.
    pub fn draw(&mut self, particles: &[Particle], mask: Option<&OccupancyMask>) {
        self.cells.fill(EMPTY);

        if let Some(mask) = mask {
            for row in 0..self.rows {
                for column in 0..self.columns {
                    let cx = ((column as f32 + 0.5) * self.cell_width) as i32;
                    let cy = ((row as f32 + 0.5) * self.cell_height) as i32;
                    if mask.is_occupied(cx, cy) {
                        let i = self.idx(column, row);
                        self.cells[i] = MASK;
                    }
                }
            }
        }

        for p in particles {
            // Glyph center: y is the top edge, the box is one cell tall.
            let Some((column, row)) = self.cell_of(p.x, p.y + self.cell_height / 2.0) else {
                continue;
            };
            if let Some(ch) = p.glyph.chars().next() {
                let i = self.idx(column, row);
                self.cells[i] = ch;
            }
        }
    }

    /// The grid as newline-separated rows.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity((self.columns + 1) * self.rows);
        for row in self.cells.chunks(self.columns) {
            out.extend(row);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyphfall_core::Rgba8;
    use std::time::Duration;

    #[test]
    fn test_grid_follows_surface_aspect() {
        let preview = AsciiPreview::new(Surface::new(200.0, 100.0), 20);
        assert_eq!(preview.columns(), 20);
        assert_eq!(preview.rows(), 5);
    }

    #[test]
    fn test_particles_draw_over_mask() {
        let mut preview = AsciiPreview::new(Surface::new(40.0, 40.0), 4);
        let mask = OccupancyMask::from_fn(40, 40, |_, y| y >= 20);
        let glyph = Particle::new("Q", 15.0, 20.0, 8.0, 1.0, Rgba8::WHITE, Duration::ZERO);
        let lost = Particle::new("Z", -5.0, 0.0, 8.0, 1.0, Rgba8::WHITE, Duration::ZERO);

        preview.draw(&[glyph, lost], Some(&mask));

        assert_eq!(preview.render(), "....\n#Q##\n");
    }
}
