mod engine;

pub use engine::{Completion, CountdownTimer, TimerState};
