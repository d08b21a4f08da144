use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use super::hex;
use super::tiles::TileField;

/// Vertex of a tile as stored in the shared vertex buffer.
///
/// Written by the tile compute pass and read by the vertex shader (and the
/// acceleration structure build, which reads `position.xyz` with a 32-byte stride).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TileVertex {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

pub const TILE_VERTEX_STRIDE: u64 = std::mem::size_of::<TileVertex>() as u64;

/// One hexagonal tile: six fan triangles, each split recursively around its centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct HexGeometry {
    /// Positions on the xz plane (y = 0), deduplicated.
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl HexGeometry {
    pub fn build(size: f32, subdivision: u32) -> Self {
        let mut builder = Builder::default();
        let center = Vec2::ZERO;

        for i in 0..6 {
            let a = hex::corner(size, i);
            let b = hex::corner(size, i + 1);
            builder.subdivide([center, a, b], subdivision);
        }

        log::debug!(
            "hex geometry: {} vertices, {} triangles (subdivision {subdivision})",
            builder.positions.len(),
            builder.indices.len() / 3
        );

        Self {
            positions: builder.positions,
            indices: builder.indices,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Vertex block replicated once per tile and placed at its initial offset.
    pub fn instance_vertices(&self, field: &TileField) -> Vec<TileVertex> {
        let offsets = field.offsets();
        let mut out = Vec::with_capacity(offsets.len() * self.positions.len());
        for o in &offsets {
            let ring = o[2] / field.rings().max(1) as f32;
            for p in &self.positions {
                out.push(TileVertex {
                    position: [p.x + o[0], p.y, p.z + o[1], 1.0],
                    color: [0.2 + 0.6 * ring, 0.5, 0.9 - 0.6 * ring, 1.0],
                });
            }
        }
        out
    }

    /// Indices of all tiles expanded into one list (for acceleration structures).
    pub fn instance_indices(&self, instances: usize) -> Vec<u32> {
        let per = self.vertex_count();
        (0..instances as u32)
            .flat_map(|i| self.indices.iter().map(move |ix| ix + i * per))
            .collect()
    }
}

#[derive(Default)]
struct Builder {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    lookup: HashMap<[u32; 2], u32>,
}

impl Builder {
    fn subdivide(&mut self, tri: [Vec2; 3], depth: u32) {
        if depth == 0 {
            for p in tri {
                let ix = self.vertex(p);
                self.indices.push(ix);
            }
            return;
        }

        let [a, b, c] = tri;
        let m = (a + b + c) / 3.0;
        self.subdivide([a, b, m], depth - 1);
        self.subdivide([b, c, m], depth - 1);
        self.subdivide([c, a, m], depth - 1);
    }

    /// Deduplicates by exact bit pattern.
    fn vertex(&mut self, p: Vec2) -> u32 {
        let key = [p.x.to_bits(), p.y.to_bits()];
        if let Some(ix) = self.lookup.get(&key) {
            return *ix;
        }
        let ix = self.positions.len() as u32;
        self.positions.push(Vec3::new(p.x, 0.0, p.y));
        self.lookup.insert(key, ix);
        ix
    }
}
