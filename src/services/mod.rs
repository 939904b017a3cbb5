/// Admin operations on players, queue, presets, logs and settings.
pub mod admin_service;
/// Chat listener control.
pub mod chat_service;
/// Livestream chat listener and its connector seam.
pub mod chat_listener;
/// Role card delivery.
pub mod dispatch;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game session lifecycle.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Private messaging seam.
pub mod messenger;
/// Chat registration processing.
pub mod registration;
/// WebSocket relay implementation of the chat connector.
pub mod relay_connector;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Dashboard system status.
pub mod status_service;
/// Storage connection supervisor.
pub mod storage_supervisor;
/// Telegram Bot API client.
pub mod telegram;
/// Telegram self-service registration bot.
pub mod telegram_bot;
