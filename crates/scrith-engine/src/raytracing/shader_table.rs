use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::scene::Z_FAR;

/// Alignment of each record inside a table.
pub const RECORD_ALIGNMENT: u64 = 32;
/// Alignment of each table inside the buffer.
pub const TABLE_ALIGNMENT: u64 = 64;

/// One shader record: an identifier followed by its local parameters.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ShaderRecord {
    pub id: [u32; 4],
    pub params: [[f32; 4]; 3],
}

pub const RECORD_SIZE: u64 = std::mem::size_of::<ShaderRecord>() as u64;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderKind {
    RayGen = 0,
    Miss = 1,
    HitGroup = 2,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 3] = [ShaderKind::RayGen, ShaderKind::Miss, ShaderKind::HitGroup];
}

/// Placement of one table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Region {
    pub offset: u64,
    pub stride: u64,
    pub size: u64,
}

/// Three single-record tables (ray generation, miss, hit group) packed into one buffer.
#[derive(Debug, Clone)]
pub struct ShaderTables {
    records: [ShaderRecord; 3],
    regions: [Region; 3],
    size: u64,
}

fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

impl ShaderTables {
    pub fn new(raygen: ShaderRecord, miss: ShaderRecord, hit: ShaderRecord) -> Self {
        let stride = align_up(RECORD_SIZE, RECORD_ALIGNMENT);
        let mut offset = 0;
        let regions = ShaderKind::ALL.map(|_| {
            let size = align_up(stride, TABLE_ALIGNMENT);
            let region = Region {
                offset,
                stride,
                size,
            };
            offset += size;
            region
        });

        Self {
            records: [raygen, miss, hit],
            regions,
            size: offset,
        }
    }

    pub fn record(&self, kind: ShaderKind) -> &ShaderRecord {
        &self.records[kind as usize]
    }

    pub fn region(&self, kind: ShaderKind) -> Region {
        self.regions[kind as usize]
    }

    /// Total buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.size as usize];
        for kind in ShaderKind::ALL {
            let at = self.region(kind).offset as usize;
            let src = bytemuck::bytes_of(self.record(kind));
            bytes[at..at + src.len()].copy_from_slice(src);
        }
        bytes
    }

    pub fn upload(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scrith shader tables"),
            contents: &self.to_bytes(),
            usage: wgpu::BufferUsages::UNIFORM,
        })
    }
}

impl Default for ShaderTables {
    /// Ray range, sky color and floor albedo of the demo.
    fn default() -> Self {
        Self::new(
            ShaderRecord {
                id: [ShaderKind::RayGen as u32, 0, 0, 0],
                params: [[0.1, Z_FAR, 0.0, 0.0], [0.0; 4], [0.0; 4]],
            },
            ShaderRecord {
                id: [ShaderKind::Miss as u32, 0, 0, 0],
                params: [[0.0, 0.2, 0.4, 1.0], [0.55, 0.7, 0.9, 1.0], [0.0; 4]],
            },
            ShaderRecord {
                id: [ShaderKind::HitGroup as u32, 0, 0, 0],
                params: [[0.85, 0.75, 0.55, 1.0], [0.4, 1.0, 0.3, 0.0], [0.0; 4]],
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_are_aligned_and_disjoint() {
        let tables = ShaderTables::default();
        let mut end = 0;
        for kind in ShaderKind::ALL {
            let r = tables.region(kind);
            assert_eq!(r.offset % TABLE_ALIGNMENT, 0);
            assert_eq!(r.stride % RECORD_ALIGNMENT, 0);
            assert!(r.stride >= RECORD_SIZE);
            assert!(r.offset >= end);
            end = r.offset + r.size;
        }
        assert_eq!(tables.size(), end);
        assert_eq!(tables.size(), 192);
    }

    #[test]
    fn records_land_at_their_region_offsets() {
        let tables = ShaderTables::default();
        let bytes = tables.to_bytes();
        assert_eq!(bytes.len() as u64, tables.size());

        for kind in ShaderKind::ALL {
            let at = tables.region(kind).offset as usize;
            let rec: &ShaderRecord = bytemuck::from_bytes(&bytes[at..at + RECORD_SIZE as usize]);
            assert_eq!(rec.id[0], kind as u32);
        }
    }

    #[test]
    fn ray_range_spans_the_view_depth() {
        let tables = ShaderTables::default();
        let range = tables.record(ShaderKind::RayGen).params[0];
        assert!(range[0] > 0.0 && range[1] == Z_FAR);
    }
}
