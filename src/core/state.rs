// src/core/state.rs — Workflow state machine
//
// Init -> Generating -> Checking -> Deciding -> {Retrying -> Generating | Finished}
//
// A producer failure skips Checking (Generating -> Deciding). Cancellation may
// finish the run from any non-terminal state. Finished is entered once.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Init,
    Generating,
    Checking,
    Deciding,
    Retrying,
    Finished,
}

impl WorkflowState {
    pub fn can_transition_to(self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        match (self, next) {
            (Init, Generating) => true,
            (Generating, Checking) | (Generating, Deciding) => true,
            (Checking, Deciding) => true,
            (Deciding, Retrying) => true,
            (Retrying, Generating) => true,
            (Finished, _) => false,
            (_, Finished) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowState::Init => "init",
            WorkflowState::Generating => "generating",
            WorkflowState::Checking => "checking",
            WorkflowState::Deciding => "deciding",
            WorkflowState::Retrying => "retrying",
            WorkflowState::Finished => "finished",
        };
        write!(f, "{}", s)
    }
}
