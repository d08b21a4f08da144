//! CPU-side scene state.
//!
//! Responsibilities:
//! - hex cell math and the procedural tile geometry
//! - the tile field with rim wrapping around a moving center
//! - camera and per-frame scene constants

mod camera;
mod constants;
mod geometry;
pub mod hex;
mod tiles;

pub use camera::{CameraInput, FOV_Y, FlyCamera, Z_FAR, Z_NEAR};
pub use constants::{CONSTANT_BUFFER_ALIGNMENT, SceneConstants, align_constant_buffer};
pub use geometry::{HexGeometry, TILE_VERTEX_STRIDE, TileVertex};
pub use hex::{Axial, tile_count};
pub use tiles::{TileField, TileOffset};
