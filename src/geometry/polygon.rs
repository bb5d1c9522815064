use glam::Vec2;

/// Even-odd point-in-polygon test
/// Pure function - points on the boundary may land on either side
pub fn polygon_contains_point(points: &[Vec2], p: Vec2) -> bool {
    if points.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// X coordinates where the horizontal line at `y` crosses the polygon outline
/// Pure function - writes sorted crossings into `out`
///
/// Uses the half-open rule on edge endpoints so a vertex lying exactly on the
/// scanline is counted once.
pub fn scanline_crossings(points: &[Vec2], y: f32, out: &mut Vec<f32>) {
    out.clear();
    if points.len() < 3 {
        return;
    }

    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (points[j], points[i]);
        if (a.y <= y) != (b.y <= y) {
            out.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
        }
        j = i;
    }
    out.sort_by(|l, r| l.total_cmp(r));
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec2;

    fn square() -> Vec<Vec2> {
        vec![vec2(0.0, 0.0), vec2(10.0, 0.0), vec2(10.0, 10.0), vec2(0.0, 10.0)]
    }

    #[test]
    fn test_contains() {
        let sq = square();
        assert!(polygon_contains_point(&sq, vec2(5.0, 5.0)));
        assert!(!polygon_contains_point(&sq, vec2(15.0, 5.0)));
        assert!(!polygon_contains_point(&sq[..2], vec2(5.0, 0.0)));
    }

    #[test]
    fn test_scanline_crossings() {
        let mut xs = Vec::new();
        scanline_crossings(&square(), 5.0, &mut xs);
        assert_eq!(xs, vec![0.0, 10.0]);

        scanline_crossings(&square(), 12.0, &mut xs);
        assert!(xs.is_empty());
    }
}
