//! Connection and storage settings.

use std::time::Duration;

use mongodb::options::{AuthMechanism, ClientOptions, Credential, ServerAddress};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// GridFS chunk size used when the caller does not pick one.
pub const DEFAULT_CHUNK_SIZE_BYTES: u32 = 64512;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 27017;
const DEFAULT_DATABASE: &str = "vibe";

/// Settings for the process-wide connection.
///
/// Every field has a default, so a partial JSON document such as
/// `{"host": "db.example.com", "database_name": "vibe"}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct StoreConfig {
    /// Server host used by credential-based initialization.
    pub host: String,
    /// Server port used by credential-based initialization.
    pub port: u16,
    /// Working database for collections, buckets and `usersInfo`.
    pub database_name: String,
    /// Application name reported to the server.
    pub app_name: Option<String>,
    /// How long the driver waits for a suitable server.
    pub server_selection_timeout_secs: u64,
    /// How long `wait_connected` polls before giving up.
    pub connect_wait_secs: u64,
    /// Delay between `wait_connected` polls.
    pub poll_interval_millis: u64,
    /// GridFS chunk size for uploads without an explicit size.
    pub chunk_size_bytes: u32,
    /// How many times credential-based client construction is attempted.
    pub credential_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_name: DEFAULT_DATABASE.to_string(),
            app_name: Some("vibekit".to_string()),
            server_selection_timeout_secs: 10,
            connect_wait_secs: 10,
            poll_interval_millis: 1000,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
            credential_attempts: 2,
        }
    }
}

impl StoreConfig {
    /// Parses a config from JSON, filling omitted fields with defaults.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the JSON is malformed or a field has the wrong type.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| StoreError::invalid_input("config", err.to_string()))
    }

    /// The server selection timeout as a `Duration`.
    #[must_use]
    pub const fn server_selection_timeout(&self) -> Duration {
        Duration::from_secs(self.server_selection_timeout_secs)
    }

    /// The total `wait_connected` budget as a `Duration`.
    #[must_use]
    pub const fn connect_wait(&self) -> Duration {
        Duration::from_secs(self.connect_wait_secs)
    }

    /// The `wait_connected` poll interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    /// Builds driver options for a SCRAM-SHA-1 login against `auth_db` on `host:port`.
    #[must_use]
    pub fn credential_client_options(
        &self,
        auth_db: &str,
        user: &str,
        password: &str,
    ) -> ClientOptions {
        let credential = Credential::builder()
            .username(user.to_string())
            .password(password.to_string())
            .source(auth_db.to_string())
            .mechanism(AuthMechanism::ScramSha1)
            .build();

        ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp {
                host: self.host.clone(),
                port: Some(self.port),
            }])
            .credential(credential)
            .server_selection_timeout(self.server_selection_timeout())
            .app_name(self.app_name.clone())
            .build()
    }

    /// Fills options parsed from a URL with the settings the URL did not set.
    pub(crate) fn apply_defaults(&self, options: &mut ClientOptions) {
        if options.server_selection_timeout.is_none() {
            options.server_selection_timeout = Some(self.server_selection_timeout());
        }
        if options.app_name.is_none() {
            options.app_name.clone_from(&self.app_name);
        }
    }

    /// The database to work in: the URL's default database when present.
    pub(crate) fn working_database(&self, options: &ClientOptions) -> String {
        options
            .default_database
            .clone()
            .unwrap_or_else(|| self.database_name.clone())
    }
}
