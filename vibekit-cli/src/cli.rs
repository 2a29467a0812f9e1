use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use vibekit_core::StoreConfig;

/// Drive the ONEsVIBE data-access helper against a live server.
#[derive(Debug, Parser)]
#[command(name = "vibekit", version)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// More logging: `-v` for debug, `-vv` for trace. `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// How to reach the server. `--uri` wins over `--user`; with neither, `--host`/`--port` are
/// used without authentication.
#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Full connection URL.
    #[arg(long, env = "VIBEKIT_MONGO_URI")]
    pub uri: Option<String>,

    /// User for SCRAM-SHA-1 login.
    #[arg(long, env = "VIBEKIT_MONGO_USER")]
    pub user: Option<String>,

    /// Password for SCRAM-SHA-1 login.
    #[arg(long, env = "VIBEKIT_MONGO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Database holding the user; defaults to `--database`.
    #[arg(long, env = "VIBEKIT_MONGO_AUTH_DB")]
    pub auth_db: Option<String>,

    #[arg(long, env = "VIBEKIT_MONGO_HOST", default_value = "localhost")]
    pub host: String,

    #[arg(long, env = "VIBEKIT_MONGO_PORT", default_value_t = 27017)]
    pub port: u16,

    /// Working database.
    #[arg(long, env = "VIBEKIT_DATABASE", default_value = "vibe")]
    pub database: String,

    /// Seconds to wait for the server before giving up.
    #[arg(long, default_value_t = 10)]
    pub connect_timeout: u64,
}

impl ConnectionArgs {
    pub fn config(&self) -> StoreConfig {
        StoreConfig {
            host: self.host.clone(),
            port: self.port,
            database_name: self.database.clone(),
            app_name: Some("vibekit-cli".to_string()),
            connect_wait_secs: self.connect_timeout,
            ..StoreConfig::default()
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the server answers.
    Ping,
    /// Documents in a collection.
    #[command(subcommand)]
    Posts(PostsCommand),
    /// Media in a GridFS bucket.
    #[command(subcommand)]
    Files(FilesCommand),
    /// Database user accounts.
    #[command(subcommand)]
    Users(UsersCommand),
    /// Local media paths (no server needed).
    #[command(subcommand)]
    Paths(PathsCommand),
}

#[derive(Debug, Subcommand)]
pub enum PostsCommand {
    /// Print every document, newest first by `--sort-by`.
    List {
        collection: String,
        #[arg(long, default_value = "created_at")]
        sort_by: String,
    },
    /// Print documents whose field equals a value.
    Find {
        collection: String,
        field: String,
        value: String,
    },
    /// Insert a JSON object.
    Insert { collection: String, json: String },
    /// Replace the first document whose field equals a value.
    Replace {
        collection: String,
        field: String,
        value: String,
        json: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum FilesCommand {
    /// Upload a local file; prints its id.
    Upload {
        path: PathBuf,
        #[arg(long, default_value = "media")]
        bucket: String,
        #[arg(long)]
        chunk_size: Option<u32>,
    },
    /// Download a file by id.
    Download {
        id: String,
        out: PathBuf,
        #[arg(long, default_value = "media")]
        bucket: String,
    },
    /// Print a file's metadata.
    Info {
        id: String,
        #[arg(long, default_value = "media")]
        bucket: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// Print a user's `usersInfo` entries.
    Find { username: String },
    /// Print whether a username is free.
    Check { username: String },
    /// Create a user with `readWrite` on `--db` (defaults to the working database).
    Create {
        username: String,
        #[arg(long, env = "VIBEKIT_NEW_USER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        gender: String,
        #[arg(long)]
        db: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum PathsCommand {
    /// Print a fresh temporary media file name.
    Temp {
        dirname: String,
        #[arg(long, default_value = "jpg")]
        ext: String,
        /// Documents directory; defaults to the platform's.
        #[arg(long)]
        documents: Option<PathBuf>,
    },
}
