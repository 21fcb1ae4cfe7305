#![forbid(unsafe_code)]

pub mod fixtures;
pub mod model;
pub mod progress;
pub mod session;
pub mod time;
pub mod timer;

pub use time::Clock;
