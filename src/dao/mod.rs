/// Lobby persistence backends.
pub mod lobby_store;
/// Persisted entity definitions.
pub mod models;
/// Backend-agnostic storage errors.
pub mod storage;
