//! Business logic shared by handlers

pub mod export;
pub mod resources;
