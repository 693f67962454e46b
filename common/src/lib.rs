pub mod buffer2;
pub mod float_ext;

pub use buffer2::Buffer2;

pub const EPSILON: f64 = 1e-6;
