//! Typed document passthroughs.

use futures_util::TryStreamExt;
use mongodb::{
    bson::{Bson, Document},
    results::UpdateResult,
    Collection,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;

/// Outcome of a replace-by-field operation.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ReplaceOutcome {
    /// Documents matching the filter (0 or 1).
    pub matched_count: u64,
    /// Documents actually changed.
    pub modified_count: u64,
    /// Id of an upserted document, as relaxed Extended JSON.
    pub upserted_id: Option<String>,
}

impl From<UpdateResult> for ReplaceOutcome {
    fn from(result: UpdateResult) -> Self {
        Self {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id.map(bson_to_json),
        }
    }
}

impl DocumentStore {
    /// Returns the typed collection `name` in the working database.
    ///
    /// # Errors
    /// Returns `NotInitialized` without an active connection.
    pub fn post_collection<T: Send + Sync>(&self, name: &str) -> StoreResult<Collection<T>> {
        Ok(self.database()?.collection(name))
    }

    /// Inserts `data` into `collection` and returns the inserted id.
    ///
    /// # Errors
    /// Returns the driver error if the insert fails.
    pub async fn insert_post<T: Serialize + Send + Sync>(
        &self,
        collection: &str,
        data: &T,
    ) -> StoreResult<Bson> {
        let result = self
            .post_collection::<T>(collection)?
            .insert_one(data)
            .await?;
        Ok(result.inserted_id)
    }

    /// Returns every document of `collection`, sorted descending by `sort_by`.
    ///
    /// # Errors
    /// Returns the driver error if the query fails or a document does not deserialize as `T`.
    pub async fn get_posts<T: DeserializeOwned + Send + Sync>(
        &self,
        collection: &str,
        sort_by: &str,
    ) -> StoreResult<Vec<T>> {
        let cursor = self
            .post_collection::<T>(collection)?
            .find(Document::new())
            .sort(descending(sort_by))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Returns the documents of `collection` whose field `name` equals `value`.
    ///
    /// # Errors
    /// Returns the driver error if the query fails or a document does not deserialize as `T`.
    pub async fn find_by_property<T: DeserializeOwned + Send + Sync>(
        &self,
        value: &str,
        name: &str,
        collection: &str,
    ) -> StoreResult<Vec<T>> {
        let cursor = self
            .post_collection::<T>(collection)?
            .find(equality_filter(name, value))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Replaces the first document of `collection` whose field `name` equals `value`.
    ///
    /// # Errors
    /// Returns the driver error if the replace fails.
    pub async fn replace_one_by_property<T: Serialize + Send + Sync>(
        &self,
        data: &T,
        value: &str,
        name: &str,
        collection: &str,
    ) -> StoreResult<ReplaceOutcome> {
        let result = self
            .post_collection::<T>(collection)?
            .replace_one(equality_filter(name, value), data)
            .await?;
        Ok(result.into())
    }
}

/// JSON variants of the document operations for the host app.
///
/// Documents travel as relaxed Extended JSON, e.g. `{"_id": {"$oid": "..."}, "likes": 3}`.
#[uniffi::export(async_runtime = "tokio")]
impl DocumentStore {
    /// Inserts a JSON object and returns the inserted id as JSON.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `json` is not an object, or the driver error.
    pub async fn insert_json(&self, collection: &str, json: &str) -> StoreResult<String> {
        let document = document_from_json(json)?;
        let id = self.insert_post(collection, &document).await?;
        Ok(bson_to_json(id))
    }

    /// Lists a collection sorted descending by `sort_by`, as JSON objects.
    ///
    /// # Errors
    /// Returns the driver error if the query fails.
    pub async fn get_posts_json(
        &self,
        collection: &str,
        sort_by: &str,
    ) -> StoreResult<Vec<String>> {
        let documents: Vec<Document> = self.get_posts(collection, sort_by).await?;
        Ok(documents.into_iter().map(document_to_json).collect())
    }

    /// Finds documents whose field `name` equals `value`, as JSON objects.
    ///
    /// # Errors
    /// Returns the driver error if the query fails.
    pub async fn find_by_property_json(
        &self,
        value: &str,
        name: &str,
        collection: &str,
    ) -> StoreResult<Vec<String>> {
        let documents: Vec<Document> =
            self.find_by_property(value, name, collection).await?;
        Ok(documents.into_iter().map(document_to_json).collect())
    }

    /// Replaces the first document whose field `name` equals `value` with a JSON object.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `json` is not an object, or the driver error.
    pub async fn replace_one_by_property_json(
        &self,
        json: &str,
        value: &str,
        name: &str,
        collection: &str,
    ) -> StoreResult<ReplaceOutcome> {
        let document = document_from_json(json)?;
        self.replace_one_by_property(&document, value, name, collection)
            .await
    }
}

fn equality_filter(name: &str, value: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(name, value);
    filter
}

fn descending(field: &str) -> Document {
    let mut sort = Document::new();
    sort.insert(field, -1);
    sort
}

fn document_from_json(json: &str) -> StoreResult<Document> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    match Bson::try_from(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(StoreError::invalid_input(
            "json",
            format!("expected an object, got {:?}", other.element_type()),
        )),
    }
}

pub(crate) fn document_to_json(document: Document) -> String {
    bson_to_json(Bson::Document(document))
}

fn bson_to_json(value: Bson) -> String {
    value.into_relaxed_extjson().to_string()
}
