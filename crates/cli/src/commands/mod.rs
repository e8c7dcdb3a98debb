//! CLI Commands

pub mod farm;
pub mod validate;
