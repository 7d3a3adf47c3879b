pub mod auth;
pub mod blob;
pub mod checklist;
pub mod clock;
pub mod config;
pub mod dtos;
pub mod error;
pub mod models;
pub mod openapi;
pub mod outcome;
pub mod routes;
pub mod services;
pub mod state;
pub mod status;
pub mod store;
pub mod telemetry;
