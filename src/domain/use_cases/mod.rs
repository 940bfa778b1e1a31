pub mod metadata;
pub mod upload;
