use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

use crate::db::error::StorageError;
use crate::db::models::User;
use crate::db::normalize::normalize_rows;
use crate::db::pool::{Param, QueryExecutor, Row};

pub async fn create_user_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            username TEXT NOT NULL,
            bio TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("users table ready");
    Ok(())
}

const FIND_USERS: &str = "SELECT * FROM users";

const FIND_USER_BY_ID: &str = "SELECT * FROM users WHERE id = ?";

const INSERT_USER: &str = r#"
    INSERT INTO users (username, bio)
    VALUES (?, ?)
    RETURNING *
"#;

const UPDATE_USER: &str = r#"
    UPDATE users
    SET username = ?, bio = ?, updated_at = CURRENT_TIMESTAMP
    WHERE id = ?
    RETURNING *
"#;

const DELETE_USER: &str = "DELETE FROM users WHERE id = ? RETURNING *";

/// All storage access for users.
///
/// Every method runs exactly one statement; values only ever travel as bound
/// parameters. By-id methods return `None` when no row matched.
#[derive(Clone)]
pub struct UserRepo {
    db: Arc<dyn QueryExecutor>,
}

impl UserRepo {
    pub fn new(db: Arc<dyn QueryExecutor>) -> Self {
        Self { db }
    }

    pub async fn find(&self) -> Result<Vec<User>, StorageError> {
        let rows = self.db.query(FIND_USERS, Vec::new()).await?;
        normalize_rows(rows).into_iter().map(into_user).collect()
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        let rows = self.db.query(FIND_USER_BY_ID, vec![id.into()]).await?;
        first_user(rows)
    }

    pub async fn insert(&self, username: Option<&str>, bio: Option<&str>) -> Result<User, StorageError> {
        let rows = self
            .db
            .query(INSERT_USER, vec![username.into(), bio.into()])
            .await?;

        // RETURNING always yields the inserted row when the statement succeeds
        first_user(rows)?.ok_or(StorageError::Database(sqlx::Error::RowNotFound))
    }

    pub async fn update(
        &self,
        id: i64,
        username: Option<&str>,
        bio: Option<&str>,
    ) -> Result<Option<User>, StorageError> {
        let params: Vec<Param> = vec![username.into(), bio.into(), id.into()];
        let rows = self.db.query(UPDATE_USER, params).await?;
        first_user(rows)
    }

    pub async fn delete(&self, id: i64) -> Result<Option<User>, StorageError> {
        let rows = self.db.query(DELETE_USER, vec![id.into()]).await?;
        first_user(rows)
    }
}

fn first_user(rows: Vec<Row>) -> Result<Option<User>, StorageError> {
    normalize_rows(rows).into_iter().next().map(into_user).transpose()
}

fn into_user(row: Row) -> Result<User, StorageError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::pool::tests::memory_pool;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every statement and answers with canned rows.
    #[derive(Default)]
    pub(crate) struct FakeExecutor {
        pub calls: Mutex<Vec<(String, Vec<Param>)>>,
        pub rows: Mutex<Vec<Row>>,
        pub fail: bool,
    }

    impl FakeExecutor {
        pub fn returning(rows: Vec<Value>) -> Self {
            let rows = rows
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect();
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<(String, Vec<Param>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryExecutor for FakeExecutor {
        async fn query(&self, sql: &str, params: Vec<Param>) -> Result<Vec<Row>, StorageError> {
            self.calls.lock().unwrap().push((sql.to_string(), params));
            if self.fail {
                return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(self.rows.lock().unwrap().clone())
        }
    }

    pub(crate) fn user_row(id: i64, username: &str, bio: Option<&str>) -> Value {
        json!({
            "id": id,
            "created_at": "2024-01-01 00:00:00",
            "updated_at": "2024-01-01 00:00:00",
            "username": username,
            "bio": bio,
        })
    }

    async fn sqlite_repo() -> UserRepo {
        let pool = memory_pool().await;
        create_user_table(&pool).await.unwrap();
        UserRepo::new(Arc::new(pool))
    }

    #[tokio::test]
    async fn test_find_normalizes_rows() {
        let fake = Arc::new(FakeExecutor::returning(vec![
            user_row(1, "alice", Some("hi")),
            user_row(2, "bob", None),
        ]));
        let repo = UserRepo::new(fake.clone());

        let users = repo.find().await.unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "alice");
        assert_eq!(users[0].created_at, "2024-01-01 00:00:00");
        assert_eq!(users[1].bio, None);
        assert_eq!(fake.calls(), vec![(FIND_USERS.to_string(), Vec::new())]);
    }

    #[tokio::test]
    async fn test_queries_use_placeholders() {
        let fake = Arc::new(FakeExecutor::returning(vec![user_row(5, "carol", None)]));
        let repo = UserRepo::new(fake.clone());

        repo.find_by_id(5).await.unwrap();
        repo.insert(Some("carol'; DROP TABLE users; --"), None).await.unwrap();
        repo.update(5, Some("carol"), Some("bio")).await.unwrap();
        repo.delete(5).await.unwrap();

        let calls = fake.calls();
        assert_eq!(calls.len(), 4);
        for (sql, _) in &calls {
            assert!(sql.contains('?'), "missing placeholder in {sql}");
            assert!(!sql.contains("carol"));
            assert!(!sql.contains('5'));
        }

        assert_eq!(calls[0].1, vec![Param::Integer(5)]);
        assert_eq!(
            calls[1].1,
            vec![Param::Text("carol'; DROP TABLE users; --".into()), Param::Null]
        );
        assert_eq!(
            calls[2].1,
            vec![
                Param::Text("carol".into()),
                Param::Text("bio".into()),
                Param::Integer(5)
            ]
        );
        assert_eq!(calls[3].1, vec![Param::Integer(5)]);
    }

    #[tokio::test]
    async fn test_by_id_operations_return_none_without_rows() {
        let repo = UserRepo::new(Arc::new(FakeExecutor::default()));

        assert_eq!(repo.find_by_id(1).await.unwrap(), None);
        assert_eq!(repo.update(1, Some("x"), None).await.unwrap(), None);
        assert_eq!(repo.delete(1).await.unwrap(), None);
        assert!(repo.find().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_columns_fail_to_decode() {
        let fake = FakeExecutor::returning(vec![json!({ "id": 1, "username": "a", "secret_token": "x" })]);
        let repo = UserRepo::new(Arc::new(fake));

        let err = repo.find_by_id(1).await.unwrap_err();

        assert!(matches!(err, StorageError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_columns_fail_to_decode() {
        let fake = FakeExecutor::returning(vec![json!({
            "id": 1,
            "created_at": "2024-01-01 00:00:00",
            "updated_at": "2024-01-01 00:00:00",
            "username": "a",
        })]);
        let repo = UserRepo::new(Arc::new(fake));

        let err = repo.find_by_id(1).await.unwrap_err();

        assert!(matches!(err, StorageError::Decode(_)));
    }

    #[tokio::test]
    async fn test_null_bio_decodes() {
        let repo = UserRepo::new(Arc::new(FakeExecutor::returning(vec![user_row(1, "a", None)])));

        let user = repo.find_by_id(1).await.unwrap().unwrap();

        assert_eq!(user.bio, None);
    }

    #[tokio::test]
    async fn test_storage_errors_propagate() {
        let repo = UserRepo::new(Arc::new(FakeExecutor::failing()));

        assert!(matches!(repo.find().await, Err(StorageError::Database(_))));
        assert!(matches!(repo.insert(Some("a"), None).await, Err(StorageError::Database(_))));
    }

    #[tokio::test]
    async fn test_insert_then_find_by_id() {
        let repo = sqlite_repo().await;

        let created = repo.insert(Some("alice"), Some("hi")).await.unwrap();
        let found = repo.find_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(found.id, created.id);
        assert_eq!(found.username, "alice");
        assert_eq!(found.bio.as_deref(), Some("hi"));
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_insert_without_username_violates_not_null() {
        let repo = sqlite_repo().await;

        let err = repo.insert(None, Some("no name")).await.unwrap_err();

        assert!(matches!(err, StorageError::Database(_)));
        assert!(repo.find().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let repo = sqlite_repo().await;
        let created = repo.insert(Some("alice"), Some("hi")).await.unwrap();

        let updated = repo.update(created.id, Some("alicia"), None).await.unwrap().unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.username, "alicia");
        assert_eq!(updated.bio, None);
        assert_eq!(repo.find_by_id(created.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_update_missing_leaves_storage_untouched() {
        let repo = sqlite_repo().await;
        let created = repo.insert(Some("alice"), Some("hi")).await.unwrap();

        assert_eq!(repo.update(created.id + 100, Some("ghost"), None).await.unwrap(), None);
        assert_eq!(repo.find().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_delete_returns_previous_row() {
        let repo = sqlite_repo().await;
        let created = repo.insert(Some("alice"), Some("hi")).await.unwrap();
        let other = repo.insert(Some("bob"), None).await.unwrap();

        let deleted = repo.delete(created.id).await.unwrap();

        assert_eq!(deleted, Some(created.clone()));
        assert_eq!(repo.find_by_id(created.id).await.unwrap(), None);
        assert_eq!(repo.delete(created.id).await.unwrap(), None);
        assert_eq!(repo.find().await.unwrap(), vec![other]);
    }
}
