use std::future::Future;
use std::path::{Path, PathBuf};

use eyre::{bail, eyre, WrapErr};
use vibekit_core::{
    connection::{self, close_connection, initialize, initialize_with_credential, wait_connected},
    DocumentStore, FileId, MediaPaths,
};

use crate::cli::{
    Cli, Command, ConnectionArgs, FilesCommand, PathsCommand, PostsCommand, UsersCommand,
};

pub async fn run(cli: Cli) -> eyre::Result<()> {
    let Cli {
        connection: args,
        command,
        ..
    } = cli;
    let store = DocumentStore::new();

    match command {
        Command::Paths(command) => paths(command),
        Command::Ping => session(&args, ping()).await,
        Command::Posts(command) => session(&args, posts(&store, command)).await,
        Command::Files(command) => session(&args, files(&store, command)).await,
        Command::Users(command) => session(&args, users(&store, &args, command)).await,
    }
}

/// Connects, runs `work` and closes the connection again.
async fn session(
    args: &ConnectionArgs,
    work: impl Future<Output = eyre::Result<()>>,
) -> eyre::Result<()> {
    connect(args).await?;
    let result = work.await;
    close_connection();
    result
}

async fn ping() -> eyre::Result<()> {
    connection::current()?.ping().await?;
    println!("ok");
    Ok(())
}

async fn connect(args: &ConnectionArgs) -> eyre::Result<()> {
    let config = args.config();

    if let Some(uri) = &args.uri {
        initialize(uri, Some(config), true).await?;
    } else if let Some(user) = &args.user {
        let auth_db = args.auth_db.as_deref().unwrap_or(&args.database);
        let password = args.password.as_deref().unwrap_or_default();
        initialize_with_credential(auth_db, user, password, Some(config), true).await?;
    } else {
        let uri = format!("mongodb://{}:{}", args.host, args.port);
        initialize(&uri, Some(config), true).await?;
    }

    if !wait_connected(Some(args.connect_timeout)).await {
        close_connection();
        bail!(
            "no server answered within {}s ({})",
            args.connect_timeout,
            connection::status_message()
        );
    }
    tracing::info!("connected to {}", args.database);
    Ok(())
}

async fn posts(store: &DocumentStore, command: PostsCommand) -> eyre::Result<()> {
    match command {
        PostsCommand::List {
            collection,
            sort_by,
        } => print_lines(store.get_posts_json(&collection, &sort_by).await?),
        PostsCommand::Find {
            collection,
            field,
            value,
        } => print_lines(store.find_by_property_json(&value, &field, &collection).await?),
        PostsCommand::Insert { collection, json } => {
            println!("{}", store.insert_json(&collection, &json).await?);
        }
        PostsCommand::Replace {
            collection,
            field,
            value,
            json,
        } => {
            let outcome = store
                .replace_one_by_property_json(&json, &value, &field, &collection)
                .await?;
            println!(
                "matched {} modified {}",
                outcome.matched_count, outcome.modified_count
            );
        }
    }
    Ok(())
}

async fn files(store: &DocumentStore, command: FilesCommand) -> eyre::Result<()> {
    match command {
        FilesCommand::Upload {
            path,
            bucket,
            chunk_size,
        } => {
            let id = store
                .upload_file(&path_str(&path)?, &bucket, chunk_size)
                .await
                .wrap_err_with(|| format!("uploading {}", path.display()))?;
            println!("{id}");
        }
        FilesCommand::Download { id, out, bucket } => {
            let id = FileId::from_hex(&id)?;
            if !store.download_to_path(&id, &path_str(&out)?, &bucket).await? {
                bail!("no file {id} in bucket {bucket}");
            }
            tracing::info!("wrote {}", out.display());
        }
        FilesCommand::Info { id, bucket } => {
            let id = FileId::from_hex(&id)?;
            let file = store
                .find_file(&id, &bucket)
                .await?
                .ok_or_else(|| eyre!("no file {id} in bucket {bucket}"))?;
            println!(
                "{}",
                serde_json::json!({
                    "id": file.id,
                    "filename": file.filename,
                    "length": file.length,
                    "chunkSize": file.chunk_size_bytes,
                    "uploadDateMillis": file.upload_date_millis,
                })
            );
        }
    }
    Ok(())
}

async fn users(
    store: &DocumentStore,
    args: &ConnectionArgs,
    command: UsersCommand,
) -> eyre::Result<()> {
    match command {
        UsersCommand::Find { username } => print_lines(store.find_user_json(&username).await?),
        UsersCommand::Check { username } => {
            let available = store.check_username_is_available(&username).await?;
            println!("{}", if available { "available" } else { "taken" });
        }
        UsersCommand::Create {
            username,
            password,
            email,
            gender,
            db,
        } => {
            let db = db.unwrap_or_else(|| args.database.clone());
            if !store
                .create_user_account(&db, &username, &password, &email, &gender)
                .await?
            {
                bail!("server refused to create {username} (see log for the reason)");
            }
            println!("created {username} on {db}");
        }
    }
    Ok(())
}

fn paths(command: PathsCommand) -> eyre::Result<()> {
    match command {
        PathsCommand::Temp {
            dirname,
            ext,
            documents,
        } => {
            let path = temp_media_path(documents, &dirname, &ext)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn temp_media_path(
    documents: Option<PathBuf>,
    dirname: &str,
    ext: &str,
) -> eyre::Result<PathBuf> {
    let documents = documents
        .or_else(dirs::document_dir)
        .ok_or_else(|| eyre!("no documents directory; pass --documents"))?;
    Ok(MediaPaths::new(documents).media_temp_path(dirname, Some(ext))?)
}

fn path_str(path: &Path) -> eyre::Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| eyre!("path is not valid UTF-8: {}", path.display()))
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
