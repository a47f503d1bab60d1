//! Fireworks tap game: find the cube, tap it, tell the AR companion which
//! firework to launch.

pub mod animations;
pub mod cube;
pub mod error;
pub mod notifier;
mod sequencer;
pub mod state;
pub mod supervisor;

pub use cube::{ChaserEffect, CubeController, CHASER_PERIOD};
pub use error::{CubeError, NotifyError, SequencerError};
pub use notifier::{LaunchNotifier, UdpNotifier};
pub use sequencer::{Sequencer, SequencerConfig, Timings};
pub use state::{Phase, SelfTapWindow, Step, TapState};
pub use supervisor::{Exit, Supervisor};
