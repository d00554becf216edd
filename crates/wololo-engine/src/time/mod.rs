//! Time subsystem.
//!
//! `FixedStep` turns wall-clock progress into a whole number of fixed-length
//! logical update ticks; rendering happens once per displayed frame regardless.

mod fixed_step;

pub use fixed_step::FixedStep;
