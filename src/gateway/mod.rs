mod dry_run;
pub mod factory;
mod traits;

pub use dry_run::DryRunGateway;
pub use factory::build_lending_gateway;
#[cfg(test)]
pub use traits::MockLendingGateway;
pub use traits::LendingGateway;
