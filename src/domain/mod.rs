pub mod agent;
pub mod display;
pub mod lending;
pub mod step;
pub mod strategy;

pub use agent::*;
pub use lending::*;
pub use step::*;
pub use strategy::*;
