pub mod analysis;
pub mod image;
