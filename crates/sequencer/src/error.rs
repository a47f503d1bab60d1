use shared::domain::CubeId;
use thiserror::Error;

use crate::state::{Phase, Step};

#[derive(Debug, Error)]
pub enum CubeError {
    #[error("light chaser already running on cube {cube}")]
    ChaserAlreadyRunning { cube: CubeId },
    #[error("cube {cube} rejected the light update: {source}")]
    Lights {
        cube: CubeId,
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("no transition from {from:?} on {step:?}")]
    InvalidTransition { from: Phase, step: Step },
    #[error("no active cube while {phase:?}")]
    NoActiveCube { phase: Phase },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("notifier outbox is closed")]
    Closed,
}
