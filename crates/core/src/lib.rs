pub mod combat;
pub mod error;
pub mod flows;
pub mod landmarks;
pub mod logger;
pub mod notify;
pub mod orchestrator;
pub mod platform;
pub mod poll;
pub mod probe;
pub mod session;
pub mod settings;
pub mod sleep;
pub mod supervisor;
pub mod targets;
pub mod types;
