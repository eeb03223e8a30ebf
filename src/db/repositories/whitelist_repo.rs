//! Whitelist repository (closed-mode rosters)

use crate::{db::Store, error::AppResult, models::WhitelistEntry};

/// Repository for closed-contest roster rows
pub struct WhitelistRepository;

impl WhitelistRepository {
    /// Add one roster entry. The password arrives already hashed.
    pub async fn add(
        store: &Store,
        contest_id: &str,
        nickname: &str,
        organization: Option<&str>,
        password_hash: &str,
    ) -> AppResult<WhitelistEntry> {
        let _guard = store.write().await;
        let entry = sqlx::query_as::<_, WhitelistEntry>(
            r#"
            INSERT INTO whitelist (contest_id, nickname, organization, password_hash)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(contest_id)
        .bind(nickname)
        .bind(organization)
        .bind(password_hash)
        .fetch_one(store.pool())
        .await?;

        Ok(entry)
    }

    pub async fn remove(store: &Store, entry_id: i64) -> AppResult<()> {
        let _guard = store.write().await;
        sqlx::query(r#"DELETE FROM whitelist WHERE id = ?1"#)
            .bind(entry_id)
            .execute(store.pool())
            .await?;

        Ok(())
    }

    pub async fn list(store: &Store, contest_id: &str) -> AppResult<Vec<WhitelistEntry>> {
        let entries = sqlx::query_as::<_, WhitelistEntry>(
            r#"SELECT * FROM whitelist WHERE contest_id = ?1 ORDER BY nickname"#,
        )
        .bind(contest_id)
        .fetch_all(store.pool())
        .await?;

        Ok(entries)
    }

    pub async fn find(
        store: &Store,
        contest_id: &str,
        nickname: &str,
    ) -> AppResult<Option<WhitelistEntry>> {
        let entry = sqlx::query_as::<_, WhitelistEntry>(
            r#"SELECT * FROM whitelist WHERE contest_id = ?1 AND nickname = ?2"#,
        )
        .bind(contest_id)
        .bind(nickname)
        .fetch_optional(store.pool())
        .await?;

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn test_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.db"), 2).await.unwrap();
        db::init_schema(&store).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn duplicate_nickname_in_contest_is_rejected() {
        let (_dir, store) = test_store().await;

        WhitelistRepository::add(&store, "c1", "alice", Some("Org"), "hash")
            .await
            .unwrap();
        let dup = WhitelistRepository::add(&store, "c1", "alice", None, "hash2").await;
        assert!(dup.is_err());

        // same nickname in another contest is fine
        WhitelistRepository::add(&store, "c2", "alice", None, "hash3")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn find_returns_entry_with_hash() {
        let (_dir, store) = test_store().await;

        let added = WhitelistRepository::add(&store, "c1", "bob", None, "secret-hash")
            .await
            .unwrap();
        let found = WhitelistRepository::find(&store, "c1", "bob")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, added.id);
        assert_eq!(found.password_hash, "secret-hash");
        assert!(WhitelistRepository::find(&store, "c1", "nobody")
            .await
            .unwrap()
            .is_none());
    }
}
