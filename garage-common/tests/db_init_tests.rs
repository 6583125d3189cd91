//! Tests for on-disk database initialization

use garage_common::db::init::init_database;
use garage_common::db::migrations::get_schema_version;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("sub").join("garage.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("garage.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO settings (key, value) VALUES ('vdg_api_key', 'abc')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let value: String = sqlx::query_scalar("SELECT value FROM settings WHERE key = 'vdg_api_key'")
        .fetch_one(&pool2)
        .await
        .unwrap();

    assert_eq!(value, "abc");
    assert_eq!(get_schema_version(&pool2).await.unwrap(), 2);
}
