pub mod api;
pub mod cli;
pub mod clients;
pub mod core;
pub mod domain;
pub mod infra;
pub mod interpreter;
pub mod session;
pub mod tools;
