use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Payloads shared by every endpoint.
pub mod common;
/// Runtime settings and chat control.
pub mod config;
pub mod game;
/// Liveness.
pub mod health;
/// Registration log payloads.
pub mod logs;
pub mod player;
/// Role preset payloads.
pub mod preset;
/// Waiting queue payloads.
pub mod queue;
/// Server-sent event payloads.
pub mod sse;
/// Dashboard status.
pub mod status;
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
