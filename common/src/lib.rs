pub mod types;
pub mod utils;

pub use types::{CanonicalImage, NamedImage, ResponseMetadata};
