use std::ops::Deref;

use mongodb::bson::{oid::ObjectId, Bson};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Identifier the server assigns to an uploaded file. Wrapper enables FFI interoperability.
///
/// Across the FFI boundary (and in JSON) the id travels as its 24-character hex string.
#[derive(uniffi::Object, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct FileId(pub ObjectId);

#[uniffi::export]
impl FileId {
    /// Outputs the lowercase 24-character hex representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Parses a 24-character hex string.
    ///
    /// # Errors
    /// Will return `StoreError::InvalidInput` if the input is not a valid object id.
    #[uniffi::constructor]
    pub fn from_hex(hex_string: &str) -> Result<Self, StoreError> {
        ObjectId::parse_str(hex_string.trim())
            .map(Self)
            .map_err(|err| StoreError::invalid_input("file_id", err.to_string()))
    }
}

impl From<ObjectId> for FileId {
    fn from(val: ObjectId) -> Self {
        Self(val)
    }
}

impl From<FileId> for ObjectId {
    fn from(val: FileId) -> Self {
        val.0
    }
}

impl From<FileId> for Bson {
    fn from(val: FileId) -> Self {
        Self::ObjectId(val.0)
    }
}

impl TryFrom<&Bson> for FileId {
    type Error = StoreError;

    fn try_from(value: &Bson) -> Result<Self, Self::Error> {
        value.as_object_id().map(Self).ok_or_else(|| {
            StoreError::invalid_input(
                "file_id",
                format!("expected an object id, got {:?}", value.element_type()),
            )
        })
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Deref for FileId {
    type Target = ObjectId;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Serialize for FileId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FileId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
