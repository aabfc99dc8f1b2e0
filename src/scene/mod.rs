//! Scene components:
//! - Camera: perspective camera with derived view and projection matrices
//! - Transform: position, Euler rotation and scale

pub mod camera;
pub mod transform;

pub use camera::Camera;
pub use transform::Transform;
