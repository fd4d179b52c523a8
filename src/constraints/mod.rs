//! Single-point and multi-point constraints

mod mp;
mod sp;

pub use mp::MpConstraint;
pub use sp::{Fixity, SpConstraint};
