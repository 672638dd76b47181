//! HTTP relay in front of the Rippletide agent API, plus the provisioning
//! flows used to create and evaluate agents.

pub mod agent;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod provision;
pub mod routes;
pub mod service;
