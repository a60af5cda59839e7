//! Dimorph math utilities.

pub mod math;

pub use math::describe::*;
pub use math::integrate::*;
pub use math::kde::{BandwidthRule, GaussianKde, KdeError};
