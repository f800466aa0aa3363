pub mod fixed_interval;

pub use fixed_interval::FixedIntervalThrottle;
