use glam::Vec2;

use super::hex::{self, Axial};

/// Per-instance offset uploaded to the GPU: world x, world z, ring, unused.
pub type TileOffset = [f32; 4];

/// A fixed population of hex tiles covering every cell within `rings` steps of
/// a moving center.
///
/// When the center moves, tiles that fall outside the disc are wrapped to the
/// opposite rim (point reflection through the midpoint of old and new center),
/// so the population stays constant and no two tiles share a cell. Instance 0
/// is the anchor and always sits on the current center.
#[derive(Debug, Clone)]
pub struct TileField {
    rings: u32,
    size: f32,
    center: Axial,
    tiles: Vec<Axial>,
}

impl TileField {
    pub fn new(rings: u32, size: f32) -> Self {
        Self {
            rings,
            size,
            center: Axial::ORIGIN,
            tiles: hex::spiral(Axial::ORIGIN, rings),
        }
    }

    pub fn rings(&self) -> u32 {
        self.rings
    }

    pub fn tile_size(&self) -> f32 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn center(&self) -> Axial {
        self.center
    }

    pub fn tiles(&self) -> &[Axial] {
        &self.tiles
    }

    /// Recenters on the cell under a world-space xz position.
    pub fn recenter_world(&mut self, p: Vec2) -> usize {
        self.recenter(Axial::from_world(p, self.size))
    }

    /// Moves the center to `new_center`; returns how many tiles were wrapped.
    pub fn recenter(&mut self, new_center: Axial) -> usize {
        let old_center = self.center;
        if new_center == old_center {
            return 0;
        }

        let rings = self.rings;
        let wrap = |p: Axial| -> Axial {
            if p.distance(new_center) > rings {
                old_center + new_center - p
            } else {
                p
            }
        };

        let mut wrapped = 0;
        for tile in self.tiles.iter_mut().skip(1) {
            let next = wrap(*tile);
            if next != *tile {
                *tile = next;
                wrapped += 1;
            }
        }

        // Pin the anchor to the new center; whoever holds that cell takes the
        // anchor's rule-image instead.
        let anchor_image = wrap(self.tiles[0]);
        if let Some(holder) = self.tiles.iter().skip(1).position(|t| *t == new_center) {
            self.tiles[holder + 1] = anchor_image;
        }
        self.tiles[0] = new_center;
        self.center = new_center;

        log::trace!(
            "tile field recentered {:?} -> {:?}, {wrapped} wrapped",
            old_center,
            new_center
        );
        wrapped
    }

    /// GPU offsets, one per instance, in instance order.
    pub fn offsets(&self) -> Vec<TileOffset> {
        self.tiles
            .iter()
            .map(|t| {
                let w = t.to_world(self.size);
                [w.x, w.y, t.distance(self.center) as f32, 0.0]
            })
            .collect()
    }

    /// Center in world space and axial form, as stored in the scene constants.
    pub fn center_uv(&self) -> [f32; 4] {
        let w = self.center.to_world(self.size);
        [w.x, w.y, self.center.q as f32, self.center.r as f32]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn assert_invariants(field: &TileField) {
        assert_eq!(field.len(), hex::tile_count(field.rings()));
        let unique: HashSet<_> = field.tiles().iter().copied().collect();
        assert_eq!(unique.len(), field.len(), "duplicate cells");
        assert!(
            field
                .tiles()
                .iter()
                .all(|t| t.distance(field.center()) <= field.rings()),
            "tile outside disc"
        );
        assert_eq!(field.tiles()[0], field.center());
    }

    // ── initial layout ────────────────────────────────────────────────────

    #[test]
    fn sixteen_rings_make_817_instances() {
        let field = TileField::new(16, 1.0);
        assert_eq!(field.len(), 817);
        assert_invariants(&field);
    }

    #[test]
    fn offsets_carry_ring_index() {
        let field = TileField::new(2, 1.0);
        let offsets = field.offsets();
        assert_eq!(offsets[0], [0.0, 0.0, 0.0, 0.0]);
        assert!(offsets[1..7].iter().all(|o| o[2] == 1.0));
        assert!(offsets[7..].iter().all(|o| o[2] == 2.0));
    }

    // ── rim wrap ──────────────────────────────────────────────────────────

    #[test]
    fn single_step_wraps_one_rim() {
        let mut field = TileField::new(3, 1.0);
        let wrapped = field.recenter(Axial::new(1, 0));
        // The crescent on the trailing side (2R + 1 cells) re-enters ahead.
        assert_eq!(wrapped, 2 * 3 + 1);
        assert_invariants(&field);
    }

    #[test]
    fn single_step_wraps_two_r_plus_one_in_every_direction() {
        for rings in 1..=6 {
            for dir in 0..6 {
                let mut field = TileField::new(rings, 1.0);
                let wrapped = field.recenter(Axial::ORIGIN.neighbor(dir));
                assert_eq!(
                    wrapped,
                    2 * rings as usize + 1,
                    "rings {rings}, direction {dir}"
                );
                assert_invariants(&field);
            }
        }
    }

    #[test]
    fn walk_preserves_invariants() {
        let mut field = TileField::new(4, 1.0);
        let mut c = Axial::ORIGIN;
        for step in 0..40 {
            c = c.neighbor(step * 7 % 6);
            field.recenter(c);
            assert_invariants(&field);
        }
    }

    #[test]
    fn large_jump_preserves_invariants() {
        let mut field = TileField::new(5, 1.0);
        field.recenter(Axial::new(40, -17));
        assert_invariants(&field);
        field.recenter(Axial::new(42, -15));
        assert_invariants(&field);
    }

    #[test]
    fn recenter_to_same_cell_is_noop() {
        let mut field = TileField::new(2, 1.0);
        let before = field.tiles().to_vec();
        assert_eq!(field.recenter(Axial::ORIGIN), 0);
        assert_eq!(field.tiles(), &before[..]);
    }

    #[test]
    fn recenter_world_uses_cell_under_position() {
        let mut field = TileField::new(2, 2.0);
        let target = Axial::new(1, 1);
        field.recenter_world(target.to_world(2.0));
        assert_eq!(field.center(), target);
        assert_eq!(&field.center_uv()[2..], &[1.0, 1.0]);
    }
}
