//! Data models for tado entities

mod home;

pub use home::*;
