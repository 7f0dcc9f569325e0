// src/models/mod.rs

pub mod challenge;
pub mod elaboration;
pub mod progress;
pub mod review;
pub mod stack;
