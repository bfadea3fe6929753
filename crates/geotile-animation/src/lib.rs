//! Camera rig animation: eased path and rotation tracks driven by an
//! [`Animator`] that can hand its unfinished work to another animator.

mod animation;
mod animator;
mod interpolator;
mod rig;

pub use animation::{Animation, AnimationTarget, Remaining, Track};
pub use animator::{Animator, AnimatorKind};
pub use interpolator::TimeInterpolator;
pub use rig::{CameraRig, Transform};
