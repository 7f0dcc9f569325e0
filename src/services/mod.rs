// src/services/mod.rs

//! Progression and peer-review rules. Handlers stay thin and call in here.

pub mod assignment;
pub mod chain;
pub mod elaboration;
pub mod feedback;
pub mod gating;
pub mod offset;
pub mod quorum;
