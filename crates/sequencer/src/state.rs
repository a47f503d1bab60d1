use std::time::Duration;

use tokio::time::Instant;

use crate::error::SequencerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FindingCube,
    Approaching,
    WaitingForTap,
    Resolving,
    Done,
}

/// What happened while the sequencer was in a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CubeFound,
    CubeSearchTimedOut,
    RoundOutOfRange,
    ArrivedAtCube,
    TapAttemptFinished,
    TapMissed,
    CycleFinished { game_over: bool },
}

impl Phase {
    pub fn next(self, step: Step) -> Result<Phase, SequencerError> {
        use Phase::*;
        use Step::*;

        let next = match (self, step) {
            (FindingCube, CubeFound) => Approaching,
            (FindingCube, CubeSearchTimedOut) => FindingCube,
            (FindingCube, RoundOutOfRange) => Done,
            (Approaching, ArrivedAtCube) => WaitingForTap,
            (WaitingForTap, TapAttemptFinished) => Resolving,
            (Resolving, TapMissed) => FindingCube,
            (Resolving, CycleFinished { game_over: false }) => FindingCube,
            (Resolving, CycleFinished { game_over: true }) => Done,
            (from, step) => return Err(SequencerError::InvalidTransition { from, step }),
        };
        Ok(next)
    }
}

/// Stretch of time during which a tap event is taken to be the robot's own
/// tap landing on the cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfTapWindow {
    opens_at: Instant,
    closes_at: Instant,
}

impl SelfTapWindow {
    pub fn new(armed_at: Instant, delay: Duration, length: Duration) -> Self {
        let opens_at = armed_at + delay;
        Self {
            opens_at,
            closes_at: opens_at + length,
        }
    }

    pub fn contains(&self, at: Instant) -> bool {
        self.opens_at <= at && at < self.closes_at
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TapState {
    #[default]
    Idle,
    Armed(SelfTapWindow),
    Detected,
}

impl TapState {
    pub fn arm(&mut self, window: SelfTapWindow) {
        *self = TapState::Armed(window);
    }

    /// Records a tap seen at `at`. Only a tap inside the armed window counts;
    /// returns whether this one did.
    pub fn register_tap(&mut self, at: Instant) -> bool {
        match self {
            TapState::Armed(window) if window.contains(at) => {
                *self = TapState::Detected;
                true
            }
            _ => false,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, TapState::Detected)
    }

    pub fn reset(&mut self) {
        *self = TapState::Idle;
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
