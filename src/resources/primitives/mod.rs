pub mod box_shape;

pub use box_shape::create_box;
