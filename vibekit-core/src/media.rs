//! Binary media in GridFS buckets.
//!
//! Content is streamed in both directions; only the byte-buffer variants meant for the host
//! app hold a whole file in memory.

use std::io;
use std::path::Path;

use mongodb::{
    bson::{doc, Bson},
    gridfs::{FilesCollectionDocument, GridFsBucket},
    options::GridFsBucketOptions,
};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::compat::{FuturesAsyncReadCompatExt, FuturesAsyncWriteCompatExt};

use crate::error::StoreResult;
use crate::object_id::FileId;
use crate::store::DocumentStore;

/// Metadata of a file stored in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct StoredFile {
    /// Hex form of the file id.
    pub id: String,
    /// Name the file was uploaded under.
    pub filename: Option<String>,
    /// Size in bytes.
    pub length: u64,
    /// Chunk size the file was split with.
    pub chunk_size_bytes: u32,
    /// Upload time in milliseconds since the Unix epoch.
    pub upload_date_millis: i64,
}

impl From<FilesCollectionDocument> for StoredFile {
    fn from(file: FilesCollectionDocument) -> Self {
        let id = match &file.id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        };
        Self {
            id,
            filename: file.filename,
            length: file.length,
            chunk_size_bytes: file.chunk_size_bytes,
            upload_date_millis: file.upload_date.timestamp_millis(),
        }
    }
}

impl DocumentStore {
    fn bucket(&self, bucket_name: &str, chunk_size: Option<u32>) -> StoreResult<GridFsBucket> {
        let connection = self.connection()?;
        let options = GridFsBucketOptions::builder()
            .bucket_name(bucket_name.to_string())
            .chunk_size_bytes(chunk_size.unwrap_or(connection.config().chunk_size_bytes))
            .build();
        Ok(connection.database().gridfs_bucket(options))
    }

    async fn stored(
        bucket: &GridFsBucket,
        id: &FileId,
    ) -> StoreResult<Option<FilesCollectionDocument>> {
        Ok(bucket.find_one(doc! { "_id": id.0 }).await?)
    }

    /// Copies `reader` into the local file `outpath`, then uploads that file.
    ///
    /// The local copy stays in place so the app can show the media without downloading it.
    ///
    /// # Errors
    /// Returns an IO error if the local copy fails, or the upload error.
    pub async fn upload_stream<R: AsyncRead + Unpin + Send>(
        &self,
        reader: &mut R,
        outpath: &str,
        bucket: &str,
        chunk_size: Option<u32>,
    ) -> StoreResult<FileId> {
        let copied = write_file(reader, outpath).await?;
        log::debug!("copied {copied} bytes to {outpath}");

        self.upload_file(outpath, bucket, chunk_size).await
    }

    /// Streams the file `id` into `writer`.
    ///
    /// Returns `false`, writing nothing, if the bucket has no such file.
    ///
    /// # Errors
    /// Returns the driver error if the lookup or download fails, or an IO error from `writer`.
    pub async fn download_to_writer<W: AsyncWrite + Unpin + Send>(
        &self,
        id: &FileId,
        writer: &mut W,
        bucket: &str,
    ) -> StoreResult<bool> {
        let bucket = self.bucket(bucket, None)?;
        if Self::stored(&bucket, id).await?.is_none() {
            log::debug!("no file {id} in bucket");
            return Ok(false);
        }

        let mut download = bucket
            .open_download_stream(Bson::from(*id))
            .await?
            .compat();
        let written = tokio::io::copy(&mut download, writer).await?;
        log::debug!("downloaded {written} bytes of {id}");
        Ok(true)
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl DocumentStore {
    /// Uploads the local file at `path` into `bucket`, named after the path.
    ///
    /// `chunk_size` defaults to the configured chunk size (64512 bytes).
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be read, or the driver error.
    pub async fn upload_file(
        &self,
        path: &str,
        bucket: &str,
        chunk_size: Option<u32>,
    ) -> StoreResult<FileId> {
        let gridfs = self.bucket(bucket, chunk_size)?;
        let mut source = tokio::fs::File::open(Path::new(path)).await?;
        let mut upload = gridfs.open_upload_stream(path).await?.compat_write();

        let copied = async {
            let length = tokio::io::copy(&mut source, &mut upload).await?;
            upload.shutdown().await?;
            Ok::<_, io::Error>(length)
        }
        .await;
        match copied {
            Ok(length) => {
                let id = FileId::try_from(upload.get_ref().id())?;
                log::info!("uploaded {path} ({length} bytes) to {bucket} as {id}");
                Ok(id)
            }
            Err(err) => {
                if let Err(abort_err) = upload.get_mut().abort().await {
                    log::warn!("could not abort upload of {path}: {abort_err}");
                }
                Err(err.into())
            }
        }
    }

    /// Writes `bytes` to the local file `outpath` and uploads it into `bucket`.
    ///
    /// # Errors
    /// See [`DocumentStore::upload_stream`].
    pub async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        outpath: &str,
        bucket: &str,
        chunk_size: Option<u32>,
    ) -> StoreResult<FileId> {
        self.upload_stream(&mut bytes.as_slice(), outpath, bucket, chunk_size)
            .await
    }

    /// Downloads the file `id` to `outpath`, replacing any existing content.
    ///
    /// Returns `false`, without touching `outpath`, if the bucket has no such file. A failed
    /// download leaves the previous content of `outpath` in place.
    ///
    /// # Errors
    /// See [`DocumentStore::download_to_writer`].
    pub async fn download_to_path(
        &self,
        id: &FileId,
        outpath: &str,
        bucket: &str,
    ) -> StoreResult<bool> {
        let gridfs = self.bucket(bucket, None)?;
        if Self::stored(&gridfs, id).await?.is_none() {
            return Ok(false);
        }

        let mut download = gridfs
            .open_download_stream(Bson::from(*id))
            .await?
            .compat();
        let written = replace_file(&mut download, outpath).await?;
        log::info!("downloaded {id} ({written} bytes) to {outpath}");
        Ok(true)
    }

    /// Downloads the file `id` into memory, or `None` if the bucket has no such file.
    ///
    /// # Errors
    /// See [`DocumentStore::download_to_writer`].
    pub async fn download_bytes(&self, id: &FileId, bucket: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut bytes = Vec::new();
        let found = self.download_to_writer(id, &mut bytes, bucket).await?;
        Ok(found.then_some(bytes))
    }

    /// Looks up the metadata of file `id`.
    ///
    /// # Errors
    /// Returns the driver error if the lookup fails.
    pub async fn find_file(&self, id: &FileId, bucket: &str) -> StoreResult<Option<StoredFile>> {
        let gridfs = self.bucket(bucket, None)?;
        Ok(Self::stored(&gridfs, id).await?.map(StoredFile::from))
    }
}

async fn write_file<R>(reader: &mut R, path: &str) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut file = tokio::fs::File::create(path).await?;
    let written = tokio::io::copy(reader, &mut file).await?;
    file.sync_all().await?;
    Ok(written)
}

/// Writes `reader` to `<path>.part` and renames it over `path` once complete.
async fn replace_file<R>(reader: &mut R, path: &str) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let partial = format!("{path}.part");
    match write_file(reader, &partial).await {
        Ok(written) => {
            tokio::fs::rename(&partial, path).await?;
            Ok(written)
        }
        Err(err) => {
            if let Err(cleanup_err) = tokio::fs::remove_file(&partial).await {
                log::debug!("could not remove {partial}: {cleanup_err}");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{oid::ObjectId, DateTime};

    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_stored_file_from_files_document() {
        let oid = ObjectId::new();
        let file: FilesCollectionDocument = mongodb::bson::from_document(doc! {
            "_id": oid,
            "length": 129_024_i64,
            "chunkSize": 64512,
            "uploadDate": DateTime::from_millis(1_700_000_000_000),
            "filename": "/tmp/media/cover.jpg",
        })
        .expect("files document");

        let stored = StoredFile::from(file);
        assert_eq!(stored.id, oid.to_hex());
        assert_eq!(stored.filename.as_deref(), Some("/tmp/media/cover.jpg"));
        assert_eq!(stored.length, 129_024);
        assert_eq!(stored.chunk_size_bytes, 64512);
        assert_eq!(stored.upload_date_millis, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_media_requires_initialization() {
        let store = DocumentStore::new();
        let id = FileId::from(ObjectId::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let outpath = dir.path().join("cover.jpg");
        let outpath = outpath.to_string_lossy();

        assert!(matches!(
            store.download_to_path(&id, &outpath, "media").await,
            Err(StoreError::NotInitialized)
        ));
        assert!(!Path::new(&*outpath).exists());
        assert!(matches!(
            store.find_file(&id, "media").await,
            Err(StoreError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_upload_stream_writes_local_copy_before_upload() {
        let store = DocumentStore::new();
        let dir = tempfile::tempdir().expect("tempdir");
        let outpath = dir.path().join("clip.mp4");
        let outpath = outpath.to_string_lossy();
        let payload = vec![7_u8; 200 * 1024 + 11];

        let result = store
            .upload_bytes(payload.clone(), &outpath, "media", None)
            .await;

        // The local copy is complete even though no connection exists to upload to.
        assert!(matches!(result, Err(StoreError::NotInitialized)));
        let written = std::fs::read(&*outpath).expect("local copy");
        assert_eq!(written, payload);
    }

    struct DroppedStream;

    impl AsyncRead for DroppedStream {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "stream dropped",
            )))
        }
    }

    #[tokio::test]
    async fn test_replace_file_keeps_old_content_on_failure() {
        use tokio::io::AsyncReadExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("cover.jpg");
        std::fs::write(&target, b"previous").expect("seed");
        let target_str = target.to_string_lossy();

        let mut failing = (&b"partial"[..]).chain(DroppedStream);
        assert!(replace_file(&mut failing, &target_str).await.is_err());
        assert_eq!(std::fs::read(&target).expect("target"), b"previous");
        assert!(!dir.path().join("cover.jpg.part").exists());

        let written = replace_file(&mut &b"fresh"[..], &target_str)
            .await
            .expect("replace");
        assert_eq!(written, 5);
        assert_eq!(std::fs::read(&target).expect("target"), b"fresh");
        assert!(!dir.path().join("cover.jpg.part").exists());
    }
}
