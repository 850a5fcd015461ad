// src/core/mod.rs — Quality-gated generation loop

pub mod feedback;
pub mod gate;
pub mod metrics;
pub mod orchestrator;
pub mod state;
pub mod types;
