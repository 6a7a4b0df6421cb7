pub mod api_server;
pub mod config;
pub mod desktop;
pub mod error;
pub mod interpreter;
pub mod llm_gateway;
pub mod prompts;
pub mod schema;
