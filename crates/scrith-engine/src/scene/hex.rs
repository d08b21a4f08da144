use std::ops::{Add, Mul, Sub};

use glam::Vec2;

const SQRT_3: f32 = 1.732_050_8;

/// Axial coordinate of a pointy-top hex cell.
///
/// World placement (x, z) for a cell of circumradius `size`:
/// `x = size * sqrt(3) * (q + r / 2)`, `z = size * 1.5 * r`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Axial {
    pub q: i32,
    pub r: i32,
}

impl Axial {
    pub const ORIGIN: Axial = Axial { q: 0, r: 0 };

    /// Unit steps to the six neighbours, counter-clockwise from +x (0°, 60°, … 300°).
    pub const DIRECTIONS: [Axial; 6] = [
        Axial { q: 1, r: 0 },
        Axial { q: 0, r: 1 },
        Axial { q: -1, r: 1 },
        Axial { q: -1, r: 0 },
        Axial { q: 0, r: -1 },
        Axial { q: 1, r: -1 },
    ];

    #[inline]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Third cube coordinate (`q + r + s == 0`).
    #[inline]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    /// Number of steps between two cells.
    pub fn distance(self, other: Axial) -> u32 {
        let d = self - other;
        (d.q.unsigned_abs() + d.r.unsigned_abs() + d.s().unsigned_abs()) / 2
    }

    pub fn neighbor(self, direction: usize) -> Axial {
        self + Self::DIRECTIONS[direction % 6]
    }

    /// Cell center on the xz plane.
    pub fn to_world(self, size: f32) -> Vec2 {
        let q = self.q as f32;
        let r = self.r as f32;
        Vec2::new(size * SQRT_3 * (q + r * 0.5), size * 1.5 * r)
    }

    /// Fractional axial coordinate of a point on the xz plane.
    pub fn fractional(p: Vec2, size: f32) -> Vec2 {
        let q = (SQRT_3 / 3.0 * p.x - p.y / 3.0) / size;
        let r = (2.0 / 3.0 * p.y) / size;
        Vec2::new(q, r)
    }

    /// Cell containing a point on the xz plane.
    pub fn from_world(p: Vec2, size: f32) -> Axial {
        let f = Self::fractional(p, size);
        cube_round(f.x, f.y)
    }
}

impl Add for Axial {
    type Output = Axial;
    #[inline]
    fn add(self, rhs: Axial) -> Axial {
        Axial::new(self.q + rhs.q, self.r + rhs.r)
    }
}

impl Sub for Axial {
    type Output = Axial;
    #[inline]
    fn sub(self, rhs: Axial) -> Axial {
        Axial::new(self.q - rhs.q, self.r - rhs.r)
    }
}

impl Mul<i32> for Axial {
    type Output = Axial;
    #[inline]
    fn mul(self, k: i32) -> Axial {
        Axial::new(self.q * k, self.r * k)
    }
}

/// Rounds a fractional axial coordinate to the nearest cell.
pub fn cube_round(qf: f32, rf: f32) -> Axial {
    let sf = -qf - rf;
    let (mut q, mut r, s) = (qf.round(), rf.round(), sf.round());

    let dq = (q - qf).abs();
    let dr = (r - rf).abs();
    let ds = (s - sf).abs();

    // Reset the component with the largest rounding error.
    if dq > dr && dq > ds {
        q = -r - s;
    } else if dr > ds {
        r = -q - s;
    }

    Axial::new(q as i32, r as i32)
}

/// Corner `i` of a pointy-top hexagon of circumradius `size`, at `60° * i - 30°`.
pub fn corner(size: f32, i: usize) -> Vec2 {
    let angle = (60.0 * (i % 6) as f32 - 30.0).to_radians();
    Vec2::new(size * angle.cos(), size * angle.sin())
}

/// Number of cells within `rings` steps of a center: `1 + 3R(R + 1)`.
pub const fn tile_count(rings: u32) -> usize {
    let r = rings as usize;
    1 + 3 * r * (r + 1)
}

/// Cells at exactly `k` steps from `center`, walking the ring counter-clockwise.
pub fn ring(center: Axial, k: u32) -> Vec<Axial> {
    if k == 0 {
        return vec![center];
    }

    let k = k as i32;
    let mut cells = Vec::with_capacity(6 * k as usize);
    let mut cell = center + Axial::DIRECTIONS[4] * k;
    for side in 0..6 {
        for _ in 0..k {
            cells.push(cell);
            cell = cell.neighbor(side);
        }
    }
    cells
}

/// Center plus rings `1..=rings`, ring by ring.
pub fn spiral(center: Axial, rings: u32) -> Vec<Axial> {
    let mut cells = Vec::with_capacity(tile_count(rings));
    for k in 0..=rings {
        cells.extend(ring(center, k));
    }
    cells
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    // ── counts ────────────────────────────────────────────────────────────

    #[test]
    fn tile_count_matches_known_values() {
        assert_eq!(tile_count(0), 1);
        assert_eq!(tile_count(1), 7);
        assert_eq!(tile_count(16), 817);
        assert_eq!(tile_count(48), 7057);
    }

    #[test]
    fn spiral_has_tile_count_unique_cells() {
        let cells = spiral(Axial::new(3, -2), 5);
        assert_eq!(cells.len(), tile_count(5));
        let unique: HashSet<_> = cells.iter().copied().collect();
        assert_eq!(unique.len(), cells.len());
    }

    #[test]
    fn ring_cells_are_at_exact_distance() {
        let c = Axial::new(-4, 7);
        for k in 0..6 {
            let cells = ring(c, k);
            assert_eq!(cells.len(), if k == 0 { 1 } else { 6 * k as usize });
            assert!(cells.iter().all(|p| p.distance(c) == k));
        }
    }

    // ── geometry ──────────────────────────────────────────────────────────

    #[test]
    fn neighbours_are_sqrt3_size_apart_at_60_degree_steps() {
        let size = 2.0;
        for (i, d) in Axial::DIRECTIONS.iter().enumerate() {
            let w = d.to_world(size);
            assert!((w.length() - SQRT_3 * size).abs() < 1e-5);
            let angle = w.y.atan2(w.x).to_degrees().rem_euclid(360.0);
            assert!((angle - 60.0 * i as f32).abs() < 1e-3, "direction {i}: {angle}");
        }
    }

    #[test]
    fn first_corner_is_at_minus_30_degrees() {
        let c = corner(1.0, 0);
        assert!((c.x - 30f32.to_radians().cos()).abs() < 1e-6);
        assert!((c.y + 0.5).abs() < 1e-6);
    }

    #[test]
    fn world_round_trip_lands_in_same_cell() {
        let size = 1.5;
        for cell in spiral(Axial::ORIGIN, 4) {
            let w = cell.to_world(size);
            assert_eq!(Axial::from_world(w, size), cell);
            // Slightly off-center still maps to the same cell.
            assert_eq!(Axial::from_world(w + Vec2::new(0.3, -0.2), size), cell);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Axial::new(2, -5);
        let b = Axial::new(-3, 1);
        assert_eq!(a.distance(b), b.distance(a));
        assert_eq!(a.distance(a), 0);
        assert_eq!(Axial::ORIGIN.distance(Axial::new(3, -3)), 3);
    }
}
