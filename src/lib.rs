// src/lib.rs — Library root for codegate

pub mod cli;
pub mod core;
pub mod evaluator;
pub mod infra;
pub mod provider;
pub mod report;
