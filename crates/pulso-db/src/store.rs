//! Fail-soft facade over [`Database`].
//!
//! The procedure layer talks to storage exclusively through [`Store`]:
//! reads degrade to empty defaults and writes to no-ops when storage is
//! unconfigured or failing, so callers only ever observe "nothing
//! happened". The one exception is [`Store::upsert_user`], which rejects
//! invalid input and propagates real storage failures to its caller (the
//! sign-in flow), where losing a write must not go unnoticed.

use std::sync::Arc;

use anyhow::anyhow;
use thiserror::Error;
use tracing::{error, warn};

use pulso_types::models::{
    ActivityHistory, Analytic, Comment, Favorite, Like, Role, User, UserStats, UserUpsert,
};

use crate::Database;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct Store {
    db: Option<Arc<Database>>,
    owner_open_id: Option<String>,
}

impl Store {
    pub fn connected(db: Database, owner_open_id: Option<String>) -> Self {
        Self {
            db: Some(Arc::new(db)),
            owner_open_id,
        }
    }

    /// A store with no backing database. Every read returns its empty
    /// default and every write is a no-op; this is also what tests use to
    /// assert storage-outage behavior distinctly from legitimate emptiness.
    pub fn disconnected(owner_open_id: Option<String>) -> Self {
        Self {
            db: None,
            owner_open_id,
        }
    }

    /// Runs a blocking query off the async runtime, absorbing
    /// unavailability and failure into `default`.
    async fn run<T, F>(&self, op: &'static str, default: T, f: F) -> T
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    {
        let Some(db) = &self.db else {
            warn!("store {op}: storage not configured");
            return default;
        };
        let db = db.clone();
        match tokio::task::spawn_blocking(move || f(&db)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                error!("store {op} failed: {e:#}");
                default
            }
            Err(e) => {
                error!("store {op} join error: {e}");
                default
            }
        }
    }

    // -- Users --

    pub async fn upsert_user(&self, mut user: UserUpsert) -> Result<(), StoreError> {
        if user.open_id.is_empty() {
            return Err(StoreError::InvalidInput("open_id is required for upsert"));
        }

        // The configured owner identity is auto-promoted unless the caller
        // supplied a role explicitly.
        if user.role.is_none() && self.owner_open_id.as_deref() == Some(user.open_id.as_str()) {
            user.role = Some(Role::Admin);
        }

        let Some(db) = &self.db else {
            warn!("store upsert_user: storage not configured");
            return Ok(());
        };
        let db = db.clone();
        tokio::task::spawn_blocking(move || db.upsert_user(&user))
            .await
            .map_err(|e| StoreError::Storage(anyhow!("join error: {e}")))?
            .map_err(StoreError::Storage)
    }

    pub async fn get_user_by_open_id(&self, open_id: &str) -> Option<User> {
        let open_id = open_id.to_string();
        self.run("get_user_by_open_id", None, move |db| {
            db.get_user_by_open_id(&open_id)
        })
        .await
    }

    pub async fn update_user_profile(
        &self,
        user_id: i64,
        name: Option<String>,
        image: Option<String>,
    ) -> Option<User> {
        self.run("update_user_profile", None, move |db| {
            db.update_user_profile(user_id, name.as_deref(), image.as_deref())
        })
        .await
    }

    // -- Comments --

    pub async fn add_comment(
        &self,
        article_id: i64,
        user_id: i64,
        content: &str,
    ) -> Option<Comment> {
        let content = content.to_string();
        self.run("add_comment", None, move |db| {
            db.insert_comment(article_id, user_id, &content)?;
            db.latest_comment_by_user(user_id)
        })
        .await
    }

    pub async fn get_comments_by_article(&self, article_id: i64) -> Vec<Comment> {
        self.run("get_comments_by_article", Vec::new(), move |db| {
            db.comments_by_article(article_id)
        })
        .await
    }

    /// Deletes by comment id only. The user id is accepted but not used to
    /// scope the delete, matching the shipped behavior.
    pub async fn delete_comment(&self, comment_id: i64, _user_id: i64) -> bool {
        self.run("delete_comment", false, move |db| {
            db.delete_comment(comment_id)?;
            Ok(true)
        })
        .await
    }

    // -- Likes --

    pub async fn add_like(&self, article_id: i64, user_id: i64) -> Option<Like> {
        self.run("add_like", None, move |db| {
            db.insert_like(article_id, user_id)?;
            db.latest_like_by_user(user_id)
        })
        .await
    }

    /// Deletes every like row for the article, not just the caller's,
    /// matching the shipped behavior.
    pub async fn remove_like(&self, article_id: i64, _user_id: i64) -> bool {
        self.run("remove_like", false, move |db| {
            db.delete_likes_for_article(article_id)?;
            Ok(true)
        })
        .await
    }

    pub async fn get_likes_by_article(&self, article_id: i64) -> i64 {
        self.run("get_likes_by_article", 0, move |db| {
            db.count_likes(article_id)
        })
        .await
    }

    pub async fn has_user_liked(&self, article_id: i64, user_id: i64) -> bool {
        self.run("has_user_liked", false, move |db| {
            db.has_user_liked(article_id, user_id)
        })
        .await
    }

    // -- Analytics --

    pub async fn record_article_view(&self, article_id: i64, user_id: Option<i64>) {
        self.run("record_article_view", (), move |db| {
            db.record_view(article_id, user_id)
        })
        .await
    }

    pub async fn get_top_articles(&self, limit: i64) -> Vec<Analytic> {
        self.run("get_top_articles", Vec::new(), move |db| {
            db.top_articles(limit)
        })
        .await
    }

    // -- Favorites --

    pub async fn add_favorite(&self, user_id: i64, article_id: i64) -> Option<Favorite> {
        self.run("add_favorite", None, move |db| {
            db.insert_favorite(user_id, article_id)?;
            db.latest_favorite_by_user(user_id)
        })
        .await
    }

    /// Deletes every favorite row for the article, not just the caller's,
    /// matching the shipped behavior.
    pub async fn remove_favorite(&self, _user_id: i64, article_id: i64) -> bool {
        self.run("remove_favorite", false, move |db| {
            db.delete_favorites_for_article(article_id)?;
            Ok(true)
        })
        .await
    }

    pub async fn get_user_favorites(&self, user_id: i64) -> Vec<Favorite> {
        self.run("get_user_favorites", Vec::new(), move |db| {
            db.favorites_by_user(user_id)
        })
        .await
    }

    pub async fn is_favorite(&self, user_id: i64, article_id: i64) -> bool {
        self.run("is_favorite", false, move |db| {
            db.is_favorite(user_id, article_id)
        })
        .await
    }

    // -- Activity history --

    pub async fn record_activity(&self, user_id: i64, article_id: i64, activity_type: &str) {
        let activity_type = activity_type.to_string();
        self.run("record_activity", (), move |db| {
            db.insert_activity(user_id, article_id, &activity_type)
        })
        .await
    }

    pub async fn get_user_activity_history(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Vec<ActivityHistory> {
        self.run("get_user_activity_history", Vec::new(), move |db| {
            db.activity_by_user(user_id, limit)
        })
        .await
    }

    pub async fn get_user_stats(&self, user_id: i64) -> UserStats {
        self.run("get_user_stats", UserStats::default(), move |db| {
            db.user_stats(user_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> Store {
        Store::connected(Database::open_in_memory().unwrap(), None)
    }

    async fn seed_user(store: &Store, open_id: &str) -> User {
        store.upsert_user(UserUpsert::new(open_id)).await.unwrap();
        store.get_user_by_open_id(open_id).await.unwrap()
    }

    #[tokio::test]
    async fn upsert_rejects_empty_open_id() {
        let store = connected();
        let err = store.upsert_user(UserUpsert::new("")).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn owner_open_id_is_promoted_to_admin() {
        let store = Store::connected(
            Database::open_in_memory().unwrap(),
            Some("owner-42".to_string()),
        );

        store.upsert_user(UserUpsert::new("owner-42")).await.unwrap();
        let owner = store.get_user_by_open_id("owner-42").await.unwrap();
        assert_eq!(owner.role, Role::Admin);

        store.upsert_user(UserUpsert::new("someone-else")).await.unwrap();
        let other = store.get_user_by_open_id("someone-else").await.unwrap();
        assert_eq!(other.role, Role::User);
    }

    #[tokio::test]
    async fn explicit_role_beats_owner_promotion() {
        let store = Store::connected(
            Database::open_in_memory().unwrap(),
            Some("owner-42".to_string()),
        );

        let mut upsert = UserUpsert::new("owner-42");
        upsert.role = Some(Role::User);
        store.upsert_user(upsert).await.unwrap();

        let owner = store.get_user_by_open_id("owner-42").await.unwrap();
        assert_eq!(owner.role, Role::User);
    }

    #[tokio::test]
    async fn comment_roundtrip_orders_newest_first() {
        let store = connected();
        let user = seed_user(&store, "commenter").await;

        let first = store.add_comment(1, user.id, "first").await.unwrap();
        let second = store.add_comment(1, user.id, "second").await.unwrap();
        assert_eq!(second.content, "second");
        assert!(second.id > first.id);

        let comments = store.get_comments_by_article(1).await;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "second");
        assert_eq!(comments[1].content, "first");

        assert!(store.get_comments_by_article(999).await.is_empty());
    }

    #[tokio::test]
    async fn delete_comment_ignores_user_scope() {
        let store = connected();
        let author = seed_user(&store, "author").await;

        let comment = store.add_comment(1, author.id, "mine").await.unwrap();

        // A different (even nonexistent) user id still deletes the row.
        assert!(store.delete_comment(comment.id, 0).await);
        assert!(store.get_comments_by_article(1).await.is_empty());
    }

    #[tokio::test]
    async fn like_add_then_remove_restores_counts() {
        let store = connected();
        let user = seed_user(&store, "liker").await;

        let before = store.get_likes_by_article(3).await;
        let like = store.add_like(3, user.id).await.unwrap();
        assert_eq!(like.article_id, 3);
        assert_eq!(store.get_likes_by_article(3).await, before + 1);
        assert!(store.has_user_liked(3, user.id).await);

        assert!(store.remove_like(3, user.id).await);
        assert!(!store.has_user_liked(3, user.id).await);
        assert_eq!(store.get_likes_by_article(3).await, before);
    }

    #[tokio::test]
    async fn remove_like_deletes_all_likes_for_article() {
        let store = connected();
        let alice = seed_user(&store, "alice").await;
        let bruno = seed_user(&store, "bruno").await;

        store.add_like(5, alice.id).await.unwrap();
        store.add_like(5, bruno.id).await.unwrap();
        assert_eq!(store.get_likes_by_article(5).await, 2);

        // Alice's remove also drops Bruno's like.
        assert!(store.remove_like(5, alice.id).await);
        assert_eq!(store.get_likes_by_article(5).await, 0);
        assert!(!store.has_user_liked(5, bruno.id).await);
    }

    #[tokio::test]
    async fn remove_favorite_deletes_all_rows_for_article() {
        let store = connected();
        let alice = seed_user(&store, "alice").await;
        let bruno = seed_user(&store, "bruno").await;

        store.add_favorite(alice.id, 8).await.unwrap();
        store.add_favorite(bruno.id, 8).await.unwrap();

        assert!(store.remove_favorite(alice.id, 8).await);
        assert!(!store.is_favorite(alice.id, 8).await);
        assert!(!store.is_favorite(bruno.id, 8).await);
    }

    #[tokio::test]
    async fn favorites_list_newest_first() {
        let store = connected();
        let user = seed_user(&store, "collector").await;

        store.add_favorite(user.id, 1).await.unwrap();
        store.add_favorite(user.id, 2).await.unwrap();

        let favorites = store.get_user_favorites(user.id).await;
        assert_eq!(favorites.len(), 2);
        assert_eq!(favorites[0].article_id, 2);
        assert_eq!(favorites[1].article_id, 1);

        assert!(store.is_favorite(user.id, 1).await);
        assert!(!store.is_favorite(user.id, 99).await);
    }

    #[tokio::test]
    async fn activity_history_is_capped_and_newest_first() {
        let store = connected();
        let user = seed_user(&store, "active").await;

        for article in 1..=5 {
            store.record_activity(user.id, article, "view").await;
        }

        let history = store.get_user_activity_history(user.id, 3).await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].article_id, 5);
        assert_eq!(history[2].article_id, 3);
    }

    #[tokio::test]
    async fn stats_views_count_every_activity_row() {
        let store = connected();
        let user = seed_user(&store, "counted").await;

        store.add_comment(1, user.id, "hi").await.unwrap();
        store.add_like(1, user.id).await.unwrap();
        store.record_activity(user.id, 1, "view").await;
        store.record_activity(user.id, 1, "comment").await;
        store.record_activity(user.id, 1, "like").await;

        let stats = store.get_user_stats(user.id).await;
        assert_eq!(stats.comments, 1);
        assert_eq!(stats.likes, 1);
        // Not just the 'view' row: all three activity rows are counted.
        assert_eq!(stats.views, 3);
    }

    #[tokio::test]
    async fn sequential_views_count_exactly() {
        let store = connected();

        for _ in 0..4 {
            store.record_article_view(11, None).await;
        }

        let top = store.get_top_articles(1).await;
        assert_eq!(top[0].article_id, 11);
        assert_eq!(top[0].view_count, 4);
    }

    #[tokio::test]
    async fn disconnected_store_degrades_to_defaults() {
        let store = Store::disconnected(None);

        // Writes are silent no-ops; the loud exception is invalid input.
        assert!(store.upsert_user(UserUpsert::new("anyone")).await.is_ok());
        assert!(store.upsert_user(UserUpsert::new("")).await.is_err());

        assert!(store.get_user_by_open_id("anyone").await.is_none());
        assert!(store.add_comment(1, 1, "hello").await.is_none());
        assert!(store.get_comments_by_article(1).await.is_empty());
        assert!(!store.delete_comment(1, 1).await);
        assert!(store.add_like(1, 1).await.is_none());
        assert!(!store.remove_like(1, 1).await);
        assert_eq!(store.get_likes_by_article(1).await, 0);
        assert!(!store.has_user_liked(1, 1).await);
        store.record_article_view(1, None).await;
        assert!(store.get_top_articles(10).await.is_empty());
        assert!(store.add_favorite(1, 1).await.is_none());
        assert!(!store.remove_favorite(1, 1).await);
        assert!(store.get_user_favorites(1).await.is_empty());
        assert!(!store.is_favorite(1, 1).await);
        store.record_activity(1, 1, "view").await;
        assert!(store.get_user_activity_history(1, 10).await.is_empty());
        assert_eq!(store.get_user_stats(1).await.comments, 0);
        assert!(store.update_user_profile(1, None, None).await.is_none());
    }
}
