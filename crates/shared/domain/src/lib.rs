//! # Domain Models
//!
//! Pure types shared by every Ramverk crate, with minimal dependencies (`serde`, `bitflags`).
//! Keep it lean: no I/O, networking, or request handling here.

pub mod config;
pub mod constants;
pub mod methods;
pub mod registry;
