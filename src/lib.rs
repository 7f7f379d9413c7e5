pub mod abi;
pub mod chain;
pub mod cli;
pub mod config;
pub mod context;
pub mod deploy;
pub mod error;
pub mod flow;
pub mod logging;
pub mod model;
pub mod ops;
pub mod planner;
pub mod quote;
pub mod schema;
pub mod session;
pub mod validate;
