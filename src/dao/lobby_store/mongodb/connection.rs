use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::debug;

use super::error::{MongoDaoError, MongoResult};

const APP_NAME: &str = "mafia-lobby-back";
const PING_ATTEMPTS: u32 = 8;
const FIRST_PING_DELAY: Duration = Duration::from_millis(200);
const MAX_PING_DELAY: Duration = Duration::from_secs(4);

/// Build a client for the lobby database and wait until the server answers a ping.
pub async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let mut options = options.clone();
    options.app_name.get_or_insert_with(|| APP_NAME.to_owned());

    let client =
        Client::with_options(options).map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);
    wait_for_ping(&database).await?;

    Ok((client, database))
}

async fn wait_for_ping(database: &Database) -> MongoResult<()> {
    let mut delay = FIRST_PING_DELAY;
    let mut attempt = 1;

    loop {
        let Err(err) = database.run_command(doc! { "ping": 1 }).await else {
            return Ok(());
        };
        if attempt >= PING_ATTEMPTS {
            return Err(MongoDaoError::InitialPing {
                attempts: attempt,
                source: err,
            });
        }
        debug!(
            attempt,
            database = %database.name(),
            error = %err,
            "lobby database not answering yet"
        );
        sleep(delay).await;
        delay = (delay * 2).min(MAX_PING_DELAY);
        attempt += 1;
    }
}
