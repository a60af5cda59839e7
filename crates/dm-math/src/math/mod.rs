//! Core math modules.

pub mod describe;
pub mod integrate;
pub mod kde;
