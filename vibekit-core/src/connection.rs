//! Process-wide connection holder.
//!
//! The helper keeps at most one active [`Connection`]. Initialization installs it, later
//! operations fetch it with [`current`], and [`close_connection`] drops it. Callers clone the
//! `Arc` out of the lock before awaiting, so the lock is never held across a driver call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use mongodb::event::{sdam::SdamEvent, EventHandler};
use mongodb::{bson::doc, options::ClientOptions, Client, Database};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

static ACTIVE: RwLock<Option<Arc<Connection>>> = RwLock::new(None);
static STATUS: RwLock<String> = RwLock::new(String::new());

const CREDENTIAL_RETRY_DELAY: Duration = Duration::from_millis(200);

/// A driver client plus the working database it was opened for.
pub struct Connection {
    client: Client,
    database: Database,
    config: StoreConfig,
    connected: Arc<AtomicBool>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("database", &self.database.name())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Connection {
    fn new(
        client: Client,
        database_name: &str,
        config: StoreConfig,
        connected: Arc<AtomicBool>,
    ) -> Self {
        let database = client.database(database_name);
        Self {
            client,
            database,
            config,
            connected,
        }
    }

    /// The underlying driver client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// The working database.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.database
    }

    /// The settings this connection was created with.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Whether the last ping or driver heartbeat reached the server.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Sends `ping` to the working database and records the outcome.
    ///
    /// # Errors
    /// Returns the driver error if no server answered.
    pub async fn ping(&self) -> StoreResult<()> {
        let result = self.database.run_command(doc! { "ping": 1 }).await;
        self.connected.store(result.is_ok(), Ordering::Release);
        result.map(|_| ()).map_err(StoreError::from)
    }

    /// Polls the server every poll interval until it answers or `timeout` elapses.
    ///
    /// The first ping goes out immediately, so a stale connected flag is never trusted.
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let interval = self.config.poll_interval().max(Duration::from_millis(1));
        let attempts = usize::try_from(timeout.as_millis() / interval.as_millis())
            .unwrap_or(usize::MAX);
        let backoff = ConstantBuilder::default()
            .with_delay(interval)
            .with_max_times(attempts);

        let poll = (|| async {
            match tokio::time::timeout(interval, self.ping()).await {
                Ok(result) => result,
                Err(_) => {
                    self.connected.store(false, Ordering::Release);
                    Err(StoreError::Database("ping timed out".to_string()))
                }
            }
        })
        .retry(backoff)
        .notify(|err: &StoreError, _| log::debug!("server not reachable yet: {err}"));

        matches!(tokio::time::timeout(timeout, poll).await, Ok(Ok(())))
    }
}

/// Keeps `connected` in step with the driver's server heartbeats.
fn track_heartbeats(options: &mut ClientOptions) -> Arc<AtomicBool> {
    let connected = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&connected);
    options.sdam_event_handler = Some(EventHandler::callback(move |event: SdamEvent| {
        match event {
            SdamEvent::ServerHeartbeatSucceeded(_) => flag.store(true, Ordering::Release),
            SdamEvent::ServerHeartbeatFailed(failed) => {
                if flag.swap(false, Ordering::AcqRel) {
                    log::warn!("lost {}: {}", failed.server_address, failed.failure);
                }
            }
            _ => {}
        }
    }));
    connected
}

fn install(connection: Connection) {
    let mut active = ACTIVE.write().unwrap_or_else(PoisonError::into_inner);
    if active.replace(Arc::new(connection)).is_some() {
        log::info!("replaced the active connection");
    }
}

fn has_active() -> bool {
    ACTIVE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// Returns the active connection.
///
/// # Errors
/// Returns `StoreError::NotInitialized` if nothing was initialized or the connection was closed.
pub fn current() -> StoreResult<Arc<Connection>> {
    ACTIVE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(StoreError::NotInitialized)
}

/// Initializes the process-wide connection from a `mongodb://` or `mongodb+srv://` URL.
///
/// Without `force`, an existing connection is kept and the call does nothing. The working
/// database is the URL's default database, falling back to `config.database_name`.
///
/// # Errors
/// Returns `InvalidInput` for an empty URL and `Configuration` if the URL cannot be parsed.
#[uniffi::export(async_runtime = "tokio")]
pub async fn initialize(
    connection_string: &str,
    config: Option<StoreConfig>,
    force: bool,
) -> StoreResult<()> {
    if connection_string.trim().is_empty() {
        return Err(StoreError::invalid_input(
            "connection_string",
            "must not be empty",
        ));
    }
    if !force && has_active() {
        log::info!("connection already initialized, keeping it");
        return Ok(());
    }

    let config = config.unwrap_or_default();
    let mut options = ClientOptions::parse(connection_string).await?;
    config.apply_defaults(&mut options);
    let connected = track_heartbeats(&mut options);
    let database_name = config.working_database(&options);
    let client = Client::with_options(options)?;

    log::info!("initialized connection to database {database_name}");
    set_status_message(format!("Initialized ({database_name})"));
    install(Connection::new(client, &database_name, config, connected));
    Ok(())
}

/// Initializes the process-wide connection with a SCRAM-SHA-1 login against `auth_db`.
///
/// The server is `config.host:config.port`. Client construction is attempted
/// `config.credential_attempts` times and the last outcome is returned.
///
/// # Errors
/// Returns `InvalidInput` for an empty user name and the driver error if every attempt fails.
#[uniffi::export(async_runtime = "tokio")]
pub async fn initialize_with_credential(
    auth_db: &str,
    user: &str,
    password: &str,
    config: Option<StoreConfig>,
    force: bool,
) -> StoreResult<()> {
    if user.is_empty() {
        return Err(StoreError::invalid_input("user", "must not be empty"));
    }
    if !force && has_active() {
        log::info!("connection already initialized, keeping it");
        return Ok(());
    }

    let config = config.unwrap_or_default();
    let retries = config.credential_attempts.saturating_sub(1) as usize;
    let backoff = ConstantBuilder::default()
        .with_delay(CREDENTIAL_RETRY_DELAY)
        .with_max_times(retries);

    let (client, connected) = (|| async {
        let mut options = config.credential_client_options(auth_db, user, password);
        let connected = track_heartbeats(&mut options);
        Client::with_options(options).map(|client| (client, connected))
    })
    .retry(backoff)
    .notify(|err: &mongodb::error::Error, _| {
        log::warn!("client construction failed, retrying: {err}");
    })
    .await?;

    let database_name = config.database_name.clone();
    log::info!("initialized connection for {user} to database {database_name}");
    set_status_message(format!("Initialized ({database_name})"));
    install(Connection::new(client, &database_name, config, connected));
    Ok(())
}

/// Logs into the configured server, using the working database as the auth database.
///
/// # Errors
/// See [`initialize_with_credential`].
#[uniffi::export(async_runtime = "tokio")]
pub async fn init_remote(
    user: &str,
    password: &str,
    config: Option<StoreConfig>,
    force: bool,
) -> StoreResult<()> {
    let config = config.unwrap_or_default();
    let auth_db = config.database_name.clone();
    initialize_with_credential(&auth_db, user, password, Some(config), force).await
}

/// Waits until the active connection reaches the server.
///
/// `timeout_secs` defaults to the connection's `connect_wait_secs`. Returns `false` when
/// nothing is initialized or the timeout elapses.
#[uniffi::export(async_runtime = "tokio")]
pub async fn wait_connected(timeout_secs: Option<u64>) -> bool {
    let Ok(connection) = current() else {
        return false;
    };
    let timeout = timeout_secs.map_or_else(
        || connection.config().connect_wait(),
        Duration::from_secs,
    );

    let connected = connection.wait_connected(timeout).await;
    if connected {
        log::info!("connected to {}", connection.database().name());
        set_status_message("Connected".to_string());
    } else {
        log::warn!("no server reachable after {timeout:?}");
        set_status_message("Connection timed out".to_string());
    }
    connected
}

/// Whether the active connection last reached the server.
#[uniffi::export]
#[must_use]
pub fn is_connected() -> bool {
    current().is_ok_and(|connection| connection.is_connected())
}

/// Drops the active connection, if any.
///
/// Operations already holding the connection finish on it; new ones get `NotInitialized`.
#[uniffi::export]
pub fn close_connection() {
    let previous = ACTIVE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if previous.is_some() {
        log::info!("connection closed");
        set_status_message("Connection closed".to_string());
    }
}

/// The last status message set by the helper or the host.
#[uniffi::export]
#[must_use]
pub fn status_message() -> String {
    STATUS.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Replaces the status message.
#[uniffi::export]
pub fn set_status_message(message: String) {
    *STATUS.write().unwrap_or_else(PoisonError::into_inner) = message;
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn unreachable_connection() -> Connection {
        let config = StoreConfig {
            server_selection_timeout_secs: 1,
            poll_interval_millis: 100,
            ..StoreConfig::default()
        };
        let mut options = ClientOptions::parse("mongodb://127.0.0.1:1")
            .await
            .expect("valid url");
        config.apply_defaults(&mut options);
        let connected = track_heartbeats(&mut options);
        let client = Client::with_options(options).expect("client");
        Connection::new(client, "stale", config, connected)
    }

    #[tokio::test]
    async fn test_wait_connected_pings_despite_stale_flag() {
        let connection = unreachable_connection().await;
        // Reached once, then the server went away.
        connection.connected.store(true, Ordering::Release);

        assert!(!connection.wait_connected(Duration::from_millis(500)).await);
        assert!(!connection.is_connected());
    }

    #[tokio::test]
    async fn test_failed_ping_clears_flag() {
        let connection = unreachable_connection().await;
        connection.connected.store(true, Ordering::Release);

        assert!(connection.ping().await.is_err());
        assert!(!connection.is_connected());
    }
}
