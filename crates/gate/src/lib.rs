pub mod admission;
pub mod cooldown;

pub use admission::{meets_thresholds, Admission, SignalGate};
pub use cooldown::{CooldownGate, CooldownState};
