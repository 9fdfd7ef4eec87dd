pub mod agent_api;
pub mod chat_ws;
pub mod lending_api;

pub use agent_api::AgentApiClient;
pub use chat_ws::ChatSocket;
pub use lending_api::LendingApiClient;
