// src/handlers/mod.rs

pub mod admin;
pub mod elaboration;
pub mod progress;
pub mod review;
