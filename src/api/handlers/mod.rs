pub mod agent;
pub mod lending;
pub mod strategies;
pub mod system;

pub use agent::*;
pub use lending::*;
pub use strategies::*;
pub use system::*;
