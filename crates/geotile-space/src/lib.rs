//! Projection regimes ("spaces") and the state machine moving the viewer
//! between them.

mod controller;
mod error;
mod space;

pub use controller::{FrameReport, SpaceController, SpaceTransition};
pub use error::SpaceError;
pub use space::{Space, SpaceKind};
