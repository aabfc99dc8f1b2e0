//! Resources
//!
//! Objects that own GPU state through the device handle:
//! - GpuBuffer: vertex layout plus its attribute and index buffers
//! - Geometry: vertex arrays and their upload
//! - ShaderProgram: compiled and linked WGSL program
//! - Material: shader sources, default uniforms and the program built from them
//! - Mesh: geometry + material + transform

pub mod buffer;
pub mod geometry;
pub mod material;
pub mod mesh;
pub mod primitives;
pub mod shader_program;

pub use buffer::{GpuBuffer, INDEX_KEY};
pub use geometry::{Geometry, NORMAL_LOCATION, POSITION_LOCATION, UV_LOCATION};
pub use material::{Material, MaterialDescriptor, basic_lit};
pub use mesh::Mesh;
pub use shader_program::ShaderProgram;
