use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DB: &str = "mafia_lobby";

/// Parsed client options plus the database to use.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options.
    pub options: ClientOptions,
    /// Target database.
    pub database_name: String,
}

impl MongoConfig {
    /// Parse `uri`, using `db_name` or the default database.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DB).to_owned();
        let options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;

        Ok(Self {
            options,
            database_name,
        })
    }
}
