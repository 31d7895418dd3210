//! CLI command handlers

pub mod benchmark;
pub mod doctor;
pub mod feedback;
pub mod search;
pub mod tune;
