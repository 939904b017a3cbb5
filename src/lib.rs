//! Library crate for mafia-lobby-back, exposing modules for binaries and integration tests.

pub mod config;
/// Persistence layer.
pub mod dao;
/// HTTP payloads.
pub mod dto;
/// Service and HTTP errors.
pub mod error;
/// Axum routers and handlers.
pub mod routes;
/// Lobby operations and background workers.
pub mod services;
/// In-memory lobby state and its writer gate.
pub mod state;
