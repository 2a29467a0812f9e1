//! End-to-end tests against a real server.
//!
//! Set `VIBEKIT_TEST_MONGO_URI` (a URL without a database path, e.g. in `.env`) to run them;
//! they pass vacuously otherwise. Each run works in a fresh database that is dropped at the end.

use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vibekit_core::{
    connection::{close_connection, current, initialize, wait_connected},
    DocumentStore, FileId, MediaPaths, StoreConfig,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Post {
    author: String,
    caption: String,
    created_at: i64,
}

fn post(author: &str, caption: &str, created_at: i64) -> Post {
    Post {
        author: author.to_string(),
        caption: caption.to_string(),
        created_at,
    }
}

fn live_uri() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var("VIBEKIT_TEST_MONGO_URI").ok()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_live_store() {
    let Some(uri) = live_uri() else {
        eprintln!("VIBEKIT_TEST_MONGO_URI not set, skipping live tests");
        return;
    };

    let config = StoreConfig {
        database_name: format!("vibekit_test_{}", Uuid::new_v4().simple()),
        ..StoreConfig::default()
    };
    initialize(&uri, Some(config), true).await.expect("init");
    assert!(wait_connected(Some(10)).await, "server not reachable");

    let store = DocumentStore::new();
    documents(&store).await;
    json_documents(&store).await;
    media(&store).await;
    accounts(&store).await;

    current()
        .expect("active")
        .database()
        .drop()
        .await
        .expect("drop test database");
    close_connection();
}

async fn documents(store: &DocumentStore) {
    for p in [
        post("dom", "first light", 100),
        post("ana", "harbour", 300),
        post("dom", "night market", 200),
    ] {
        store.insert_post("posts", &p).await.expect("insert");
    }

    let posts: Vec<Post> = store.get_posts("posts", "created_at").await.expect("list");
    let order: Vec<i64> = posts.iter().map(|p| p.created_at).collect();
    assert_eq!(order, vec![300, 200, 100]);

    let by_dom: Vec<Post> = store
        .find_by_property("dom", "author", "posts")
        .await
        .expect("find");
    assert_eq!(by_dom.len(), 2);

    let outcome = store
        .replace_one_by_property(&post("ana", "harbour at dusk", 300), "harbour", "caption", "posts")
        .await
        .expect("replace");
    assert_eq!(outcome.matched_count, 1);
    assert_eq!(outcome.modified_count, 1);
    assert!(outcome.upserted_id.is_none());

    let missing = store
        .replace_one_by_property(&post("x", "y", 0), "nobody", "author", "posts")
        .await
        .expect("replace");
    assert_eq!(missing.matched_count, 0);

    let renamed: Vec<Post> = store
        .find_by_property("harbour at dusk", "caption", "posts")
        .await
        .expect("find");
    assert_eq!(renamed, vec![post("ana", "harbour at dusk", 300)]);
}

async fn json_documents(store: &DocumentStore) {
    let id = store
        .insert_json("profiles", r#"{"username": "dom", "followers": 12}"#)
        .await
        .expect("insert json");
    assert!(id.contains("$oid"));

    let found = store
        .find_by_property_json("dom", "username", "profiles")
        .await
        .expect("find json");
    assert_eq!(found.len(), 1);
    let value: serde_json::Value = serde_json::from_str(&found[0]).expect("json");
    assert_eq!(value["followers"], 12);

    let outcome = store
        .replace_one_by_property_json(
            r#"{"username": "dom", "followers": 13}"#,
            "dom",
            "username",
            "profiles",
        )
        .await
        .expect("replace json");
    assert_eq!(outcome.modified_count, 1);

    let listed = store
        .get_posts_json("profiles", "followers")
        .await
        .expect("list json");
    assert_eq!(listed.len(), 1);
    assert!(listed[0].contains("13"));

    let raw: Vec<Document> = store
        .find_by_property("dom", "username", "profiles")
        .await
        .expect("find raw");
    assert!(matches!(
        raw[0].get("followers"),
        Some(Bson::Int32(13) | Bson::Int64(13))
    ));
}

async fn media(store: &DocumentStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = MediaPaths::new(dir.path().join("Documents"));
    let outpath = paths
        .media_temp_path("uploads", Some("bin"))
        .expect("temp path");
    let outpath = outpath.to_string_lossy().to_string();

    // Spans several chunks with a small chunk size.
    let payload: Vec<u8> = (0..10_000_u32).map(|i| (i % 251) as u8).collect();
    let id = store
        .upload_bytes(payload.clone(), &outpath, "media", Some(1024))
        .await
        .expect("upload");
    assert_eq!(std::fs::read(&outpath).expect("local copy"), payload);

    let info = store
        .find_file(&id, "media")
        .await
        .expect("find file")
        .expect("stored");
    assert_eq!(info.id, id.to_hex());
    assert_eq!(info.length, payload.len() as u64);
    assert_eq!(info.chunk_size_bytes, 1024);
    assert_eq!(info.filename.as_deref(), Some(outpath.as_str()));

    let bytes = store
        .download_bytes(&id, "media")
        .await
        .expect("download")
        .expect("found");
    assert_eq!(bytes, payload);

    let downloaded = dir.path().join("downloaded.bin");
    let downloaded_str = downloaded.to_string_lossy().to_string();
    std::fs::write(&downloaded, vec![0xff; 20_000]).expect("stale file");
    assert!(store
        .download_to_path(&id, &downloaded_str, "media")
        .await
        .expect("download to path"));
    // Existing content is replaced, not overwritten in place.
    assert_eq!(std::fs::read(&downloaded).expect("downloaded"), payload);

    let direct = store
        .upload_file(&downloaded_str, "media", None)
        .await
        .expect("upload file");
    assert_ne!(direct, id);

    let unknown = FileId::from(ObjectId::new());
    assert!(store
        .download_bytes(&unknown, "media")
        .await
        .expect("lookup")
        .is_none());
    let untouched = dir.path().join("never.bin");
    assert!(!store
        .download_to_path(&unknown, &untouched.to_string_lossy(), "media")
        .await
        .expect("lookup"));
    assert!(!untouched.exists());

    // Another bucket does not see the file.
    assert!(store
        .find_file(&id, "avatars")
        .await
        .expect("find file")
        .is_none());
}

async fn accounts(store: &DocumentStore) {
    let username = format!("nobody_{}", Uuid::new_v4().simple());
    assert!(store
        .check_username_is_available(&username)
        .await
        .expect("usersInfo"));
    assert!(store.find_user_json(&username).await.expect("usersInfo").is_empty());

    let database = current().expect("active").database().clone();
    let created = store
        .create_user_account(database.name(), &username, "s3cret", "dom@vibe.app", "m")
        .await
        .expect("createUser");
    // Servers with access control may refuse; that reads as `false`, not an error.
    if created {
        assert!(!store
            .check_username_is_available(&username)
            .await
            .expect("usersInfo"));
        let users = store.find_user(&username).await.expect("usersInfo");
        let custom = users[0].get_document("customData").expect("customData");
        assert_eq!(custom.get_str("email").expect("email"), "dom@vibe.app");

        // A second attempt is rejected by the server.
        assert!(!store
            .create_user_account(database.name(), &username, "s3cret", "dom@vibe.app", "m")
            .await
            .expect("createUser"));

        database
            .run_command(doc! { "dropUser": username.as_str() })
            .await
            .expect("dropUser");
    }
}
