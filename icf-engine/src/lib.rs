pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod pairs;
pub mod profiles;
pub mod protocol;
pub mod recommend;
pub mod server;
pub mod stream;
pub mod transport;
pub mod types;
