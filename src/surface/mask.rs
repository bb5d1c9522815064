use glam::Vec2;

use crate::geometry::scanline_crossings;

/// Per-pixel coverage of a polygon over a rectangular window of a surface
///
/// A pixel is covered when its center lies inside the polygon (even-odd rule).
#[derive(Debug, Clone)]
pub struct PolygonMask {
    origin: (i32, i32),
    width: u32,
    height: u32,
    covered: Vec<bool>,
}

impl PolygonMask {
    /// Rasterize `points` into the window starting at `origin` with the given size
    pub fn rasterize(points: &[Vec2], origin: (i32, i32), width: u32, height: u32) -> Self {
        let mut covered = vec![false; width as usize * height as usize];
        let mut crossings = Vec::with_capacity(16);

        for row in 0..height {
            let y = (origin.1 + row as i32) as f32 + 0.5;
            scanline_crossings(points, y, &mut crossings);

            let row_start = row as usize * width as usize;
            for span in crossings.chunks_exact(2) {
                // Pixel centers in [span[0], span[1])
                let first = (span[0] - 0.5 - origin.0 as f32).ceil().max(0.0);
                let last = (span[1] - 0.5 - origin.0 as f32).ceil().min(width as f32);
                if first >= last {
                    continue;
                }
                covered[row_start + first as usize..row_start + last as usize].fill(true);
            }
        }

        Self {
            origin,
            width,
            height,
            covered,
        }
    }

    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Coverage of a surface pixel; pixels outside the window are uncovered
    #[inline]
    pub fn covers(&self, x: i32, y: i32) -> bool {
        let lx = x - self.origin.0;
        let ly = y - self.origin.1;
        if lx < 0 || ly < 0 || lx >= self.width as i32 || ly >= self.height as i32 {
            return false;
        }
        self.covered[ly as usize * self.width as usize + lx as usize]
    }

    pub fn covered_count(&self) -> usize {
        self.covered.iter().filter(|&&c| c).count()
    }
}
