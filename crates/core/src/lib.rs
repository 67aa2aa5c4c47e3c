#![forbid(unsafe_code)]

pub mod curve;
pub mod drip;
pub mod model;
pub mod time;

pub use curve::{DisplayProgress, ProgressCurve};
pub use drip::DripScheduler;
pub use time::Clock;
