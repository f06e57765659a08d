pub mod auth;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod role;
pub mod sql;
pub mod tls;
pub mod wire;
