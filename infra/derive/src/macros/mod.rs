pub mod error;
pub mod extension;
