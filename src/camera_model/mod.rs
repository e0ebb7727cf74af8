pub mod generic;
pub mod opencv5;
pub mod optimal;

pub use generic::*;
pub use opencv5::OpenCVModel5;
pub use optimal::{Roi, optimal_new_camera_matrix};
