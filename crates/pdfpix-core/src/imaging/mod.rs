//! Turning embedded image payloads into pixels, then filtering and resizing.

mod decode;
mod transform;

pub use decode::decode;
pub use transform::{downsample, passes_min_dimension, resize_target};
