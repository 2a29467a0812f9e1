//! User accounts, managed with the server's user-administration commands.

use mongodb::bson::{doc, Bson, Document};

use crate::collections::document_to_json;
use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;

/// Role granted to accounts created by the app.
const ACCOUNT_ROLE: &str = "readWrite";

fn create_user_command(
    db_name: &str,
    username: &str,
    password: &str,
    email: &str,
    gender: &str,
) -> Document {
    doc! {
        "createUser": username,
        "pwd": password,
        "customData": {
            "email": email,
            "gender": gender,
        },
        "roles": [
            { "role": ACCOUNT_ROLE, "db": db_name },
        ],
    }
}

fn users_info_command(username: &str, db_name: &str) -> Document {
    doc! {
        "usersInfo": { "user": username, "db": db_name },
    }
}

/// Extracts the `users` array of a `usersInfo` reply; anything else reads as no users.
fn users_from_reply(reply: &Document) -> Vec<Document> {
    reply
        .get_array("users")
        .map(|users| {
            users
                .iter()
                .filter_map(Bson::as_document)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

impl DocumentStore {
    /// Returns the `usersInfo` entries for `username` in the working database.
    ///
    /// A command rejected by the server reads as no users.
    ///
    /// # Errors
    /// Returns the driver error for failures other than a rejected command.
    pub async fn find_user(&self, username: &str) -> StoreResult<Vec<Document>> {
        let database = self.database()?;
        let command = users_info_command(username, database.name());

        match database.run_command(command).await.map_err(StoreError::from) {
            Ok(reply) => Ok(users_from_reply(&reply)),
            Err(err) if err.is_command() => {
                log::warn!("usersInfo for {username} rejected: {err}");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl DocumentStore {
    /// Creates a database user with `readWrite` on `db_name`, keeping `email` and `gender`
    /// as the user's custom data.
    ///
    /// Returns `false` if the server rejects the command, e.g. because the user exists or
    /// the current login may not create users.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty user name or password, and the driver error for
    /// failures other than a rejected command.
    pub async fn create_user_account(
        &self,
        db_name: &str,
        username: &str,
        password: &str,
        email: &str,
        gender: &str,
    ) -> StoreResult<bool> {
        if username.is_empty() {
            return Err(StoreError::invalid_input("username", "must not be empty"));
        }
        if password.is_empty() {
            return Err(StoreError::invalid_input("password", "must not be empty"));
        }

        let command = create_user_command(db_name, username, password, email, gender);
        match self.database()?.run_command(command).await.map_err(StoreError::from) {
            Ok(_) => {
                log::info!("created user {username} on {db_name}");
                Ok(true)
            }
            Err(err) if err.is_command() => {
                log::warn!("createUser {username} rejected: {err}");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Returns the `usersInfo` entries for `username` as JSON objects.
    ///
    /// # Errors
    /// See [`DocumentStore::find_user`].
    pub async fn find_user_json(&self, username: &str) -> StoreResult<Vec<String>> {
        let users = self.find_user(username).await?;
        Ok(users.into_iter().map(document_to_json).collect())
    }

    /// Whether no user named `username` exists in the working database.
    ///
    /// # Errors
    /// See [`DocumentStore::find_user`].
    pub async fn check_username_is_available(&self, username: &str) -> StoreResult<bool> {
        Ok(self.find_user(username).await?.is_empty())
    }
}
