//! Image storage implementations.

mod local;

pub use local::{IMAGES_PREFIX, LocalImageStore};
