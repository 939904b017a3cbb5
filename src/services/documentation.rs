use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the Mafia lobby backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::events_stream,
        crate::routes::players::list_players,
        crate::routes::players::create_player,
        crate::routes::players::update_player,
        crate::routes::players::delete_player,
        crate::routes::queue::list_queue,
        crate::routes::queue::enqueue,
        crate::routes::queue::dequeue,
        crate::routes::queue::clear_queue,
        crate::routes::presets::list_presets,
        crate::routes::presets::create_preset,
        crate::routes::presets::delete_preset,
        crate::routes::game::current_game,
        crate::routes::game::start_game,
        crate::routes::game::send_cards,
        crate::routes::game::end_game,
        crate::routes::logs::recent_logs,
        crate::routes::logs::registration_counts,
        crate::routes::settings::get_config,
        crate::routes::settings::set_config,
        crate::routes::settings::system_status,
        crate::routes::settings::chat_connect,
        crate::routes::settings::chat_disconnect,
    ),
    components(
        schemas(
            crate::dto::common::ActionResponse,
            crate::dto::common::ErrorResponse,
            crate::dto::health::HealthResponse,
            crate::dto::player::PlayerView,
            crate::dto::player::CreatePlayerRequest,
            crate::dto::player::UpdatePlayerRequest,
            crate::dto::queue::QueueEntryView,
            crate::dto::queue::EnqueueRequest,
            crate::dto::queue::EnqueueResponse,
            crate::dto::queue::ClearQueueResponse,
            crate::dto::preset::PresetView,
            crate::dto::preset::CreatePresetRequest,
            crate::dto::game::StartGameRequest,
            crate::dto::game::AssignmentView,
            crate::dto::game::SessionView,
            crate::dto::game::CurrentGameResponse,
            crate::dto::game::DispatchReport,
            crate::dto::logs::RegistrationLogView,
            crate::dto::logs::RegistrationCountResponse,
            crate::dto::config::ConfigValueResponse,
            crate::dto::config::SetConfigRequest,
            crate::dto::config::ChatConnectRequest,
            crate::dto::config::ChatStatusResponse,
            crate::dto::status::SystemStatusResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::QueueUpdatedEvent,
            crate::dto::sse::SessionUpdatedEvent,
            crate::dto::sse::ChatStatusEvent,
            crate::dao::models::SessionStatus,
            crate::dao::models::RegistrationStatus,
            crate::services::chat_listener::ChatStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events stream"),
        (name = "players", description = "Registered players"),
        (name = "queue", description = "Waiting queue"),
        (name = "presets", description = "Role presets"),
        (name = "game", description = "Game session lifecycle"),
        (name = "logs", description = "Registration audit log"),
        (name = "settings", description = "Configuration, status and chat control"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_the_lobby_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/users",
            "/api/queue",
            "/api/role-presets",
            "/api/game/start",
            "/api/game/send-cards",
            "/api/registration-logs/count",
            "/api/config/{key}",
            "/sse/events",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
