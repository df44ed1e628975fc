use anyhow::Result;
use rusqlite::{OptionalExtension, Row};
use tracing::warn;

use pulso_types::models::{
    ActivityHistory, Analytic, Comment, Favorite, Like, Role, User, UserStats, UserUpsert,
};

use crate::{Database, now_timestamp};

const USER_COLUMNS: &str =
    "id, openId, name, email, loginMethod, image, role, createdAt, updatedAt, lastSignedIn";

const NOW_EXPR: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

impl Database {
    // -- Users --

    /// Insert-or-update keyed on openId. Tri-state text fields: absent
    /// fields are left untouched, explicit NULLs overwrite. The conflict
    /// clause is never empty — an otherwise-empty upsert still bumps
    /// lastSignedIn.
    pub fn upsert_user(&self, user: &UserUpsert) -> Result<()> {
        self.with_conn(|conn| {
            let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
            let mut columns: Vec<&str> = Vec::new();
            let mut update_set: Vec<String> = Vec::new();

            params.push(Box::new(user.open_id.clone()));
            columns.push("openId");

            let text_fields: [(&str, &Option<Option<String>>); 3] = [
                ("name", &user.name),
                ("email", &user.email),
                ("loginMethod", &user.login_method),
            ];
            for (column, value) in text_fields {
                if let Some(value) = value {
                    params.push(Box::new(value.clone()));
                    columns.push(column);
                    update_set.push(format!("{column} = ?{}", params.len()));
                }
            }

            params.push(Box::new(
                user.last_signed_in.clone().unwrap_or_else(now_timestamp),
            ));
            columns.push("lastSignedIn");
            let signed_idx = params.len();
            if user.last_signed_in.is_some() {
                update_set.push(format!("lastSignedIn = ?{signed_idx}"));
            }

            if let Some(role) = user.role {
                params.push(Box::new(role.as_str().to_string()));
                columns.push("role");
                update_set.push(format!("role = ?{}", params.len()));
            }

            if update_set.is_empty() {
                update_set.push(format!("lastSignedIn = ?{signed_idx}"));
            }
            update_set.push(format!("updatedAt = {NOW_EXPR}"));

            let placeholders: Vec<String> =
                (1..=params.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "INSERT INTO users ({}) VALUES ({}) ON CONFLICT(openId) DO UPDATE SET {}",
                columns.join(", "),
                placeholders.join(", "),
                update_set.join(", ")
            );

            let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, param_refs.as_slice())?;
            Ok(())
        })
    }

    pub fn get_user_by_open_id(&self, open_id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE openId = ?1"))?;
            Ok(stmt.query_row([open_id], map_user).optional()?)
        })
    }

    /// Partial profile update: only name and image are reachable from this
    /// path. Returns None without touching the row when no field is given.
    pub fn update_user_profile(
        &self,
        user_id: i64,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
            let mut update_set: Vec<String> = Vec::new();

            if let Some(name) = name {
                params.push(Box::new(name.to_string()));
                update_set.push(format!("name = ?{}", params.len()));
            }
            if let Some(image) = image {
                params.push(Box::new(image.to_string()));
                update_set.push(format!("image = ?{}", params.len()));
            }
            if update_set.is_empty() {
                return Ok(None);
            }
            update_set.push(format!("updatedAt = {NOW_EXPR}"));

            params.push(Box::new(user_id));
            let sql = format!(
                "UPDATE users SET {} WHERE id = ?{}",
                update_set.join(", "),
                params.len()
            );
            let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, param_refs.as_slice())?;

            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
            Ok(stmt.query_row([user_id], map_user).optional()?)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, article_id: i64, user_id: i64, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (articleId, userId, content) VALUES (?1, ?2, ?3)",
                rusqlite::params![article_id, user_id, content],
            )?;
            Ok(())
        })
    }

    /// Callers treat this as "the row just inserted": the user's newest
    /// comment, with an id tiebreak for equal timestamps.
    pub fn latest_comment_by_user(&self, user_id: i64) -> Result<Option<Comment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, articleId, userId, content, createdAt, updatedAt
                 FROM comments
                 WHERE userId = ?1
                 ORDER BY createdAt DESC, id DESC
                 LIMIT 1",
            )?;
            Ok(stmt.query_row([user_id], map_comment).optional()?)
        })
    }

    pub fn comments_by_article(&self, article_id: i64) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, articleId, userId, content, createdAt, updatedAt
                 FROM comments
                 WHERE articleId = ?1
                 ORDER BY createdAt DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([article_id], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Deletes by id alone; author scoping happens (or doesn't) upstream.
    pub fn delete_comment(&self, comment_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM comments WHERE id = ?1", [comment_id])?;
            Ok(())
        })
    }

    // -- Likes --

    pub fn insert_like(&self, article_id: i64, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO likes (articleId, userId) VALUES (?1, ?2)",
                rusqlite::params![article_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn latest_like_by_user(&self, user_id: i64) -> Result<Option<Like>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, articleId, userId, createdAt
                 FROM likes
                 WHERE userId = ?1
                 ORDER BY createdAt DESC, id DESC
                 LIMIT 1",
            )?;
            Ok(stmt.query_row([user_id], map_like).optional()?)
        })
    }

    /// Removes every like row for the article, regardless of author.
    pub fn delete_likes_for_article(&self, article_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM likes WHERE articleId = ?1", [article_id])?;
            Ok(())
        })
    }

    pub fn count_likes(&self, article_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE articleId = ?1",
                [article_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn has_user_liked(&self, article_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM likes WHERE articleId = ?1 AND userId = ?2)",
                rusqlite::params![article_id, user_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    // -- Analytics --

    /// Atomic upsert-increment: the aggregate row is created lazily on the
    /// first view and concurrent increments cannot lose updates.
    pub fn record_view(&self, article_id: i64, user_id: Option<i64>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO analytics (articleId, userId, viewCount, commentCount, likeCount)
                     VALUES (?1, ?2, 1, 0, 0)
                     ON CONFLICT(articleId) DO UPDATE SET
                         viewCount = viewCount + 1,
                         updatedAt = {NOW_EXPR}"
                ),
                rusqlite::params![article_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn top_articles(&self, limit: i64) -> Result<Vec<Analytic>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, articleId, userId, viewCount, commentCount, likeCount, createdAt, updatedAt
                 FROM analytics
                 ORDER BY viewCount DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], map_analytic)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Favorites --

    pub fn insert_favorite(&self, user_id: i64, article_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO favorites (userId, articleId) VALUES (?1, ?2)",
                rusqlite::params![user_id, article_id],
            )?;
            Ok(())
        })
    }

    pub fn latest_favorite_by_user(&self, user_id: i64) -> Result<Option<Favorite>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, userId, articleId, createdAt
                 FROM favorites
                 WHERE userId = ?1
                 ORDER BY createdAt DESC, id DESC
                 LIMIT 1",
            )?;
            Ok(stmt.query_row([user_id], map_favorite).optional()?)
        })
    }

    /// Removes every favorite row for the article, regardless of owner.
    pub fn delete_favorites_for_article(&self, article_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM favorites WHERE articleId = ?1", [article_id])?;
            Ok(())
        })
    }

    pub fn favorites_by_user(&self, user_id: i64) -> Result<Vec<Favorite>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, userId, articleId, createdAt
                 FROM favorites
                 WHERE userId = ?1
                 ORDER BY createdAt DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_favorite)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn is_favorite(&self, user_id: i64, article_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM favorites WHERE userId = ?1 AND articleId = ?2)",
                rusqlite::params![user_id, article_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    // -- Activity history --

    pub fn insert_activity(&self, user_id: i64, article_id: i64, activity_type: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO activityHistory (userId, articleId, activityType) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, article_id, activity_type],
            )?;
            Ok(())
        })
    }

    pub fn activity_by_user(&self, user_id: i64, limit: i64) -> Result<Vec<ActivityHistory>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, userId, articleId, activityType, createdAt
                 FROM activityHistory
                 WHERE userId = ?1
                 ORDER BY createdAt DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_activity)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// `views` counts every activity row for the user, not just the
    /// `view`-typed ones.
    pub fn user_stats(&self, user_id: i64) -> Result<UserStats> {
        self.with_conn(|conn| {
            let comments: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE userId = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            let likes: i64 = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE userId = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            let views: i64 = conn.query_row(
                "SELECT COUNT(*) FROM activityHistory WHERE userId = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(UserStats {
                comments,
                likes,
                views,
            })
        })
    }
}

fn map_user(row: &Row) -> rusqlite::Result<User> {
    let role_text: String = row.get(6)?;
    let role = role_text.parse::<Role>().unwrap_or_else(|_| {
        warn!("Unknown role '{}' on user row, defaulting to user", role_text);
        Role::User
    });

    Ok(User {
        id: row.get(0)?,
        open_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        login_method: row.get(4)?,
        image: row.get(5)?,
        role,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        last_signed_in: row.get(9)?,
    })
}

fn map_comment(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        article_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn map_like(row: &Row) -> rusqlite::Result<Like> {
    Ok(Like {
        id: row.get(0)?,
        article_id: row.get(1)?,
        user_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_analytic(row: &Row) -> rusqlite::Result<Analytic> {
    Ok(Analytic {
        id: row.get(0)?,
        article_id: row.get(1)?,
        user_id: row.get(2)?,
        view_count: row.get(3)?,
        comment_count: row.get(4)?,
        like_count: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn map_favorite(row: &Row) -> rusqlite::Result<Favorite> {
    Ok(Favorite {
        id: row.get(0)?,
        user_id: row.get(1)?,
        article_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_activity(row: &Row) -> rusqlite::Result<ActivityHistory> {
    Ok(ActivityHistory {
        id: row.get(0)?,
        user_id: row.get(1)?,
        article_id: row.get(2)?,
        activity_type: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn upsert_inserts_then_partially_updates() {
        let db = db();

        let mut first = UserUpsert::new("open-1");
        first.name = Some(Some("Ana".into()));
        first.email = Some(Some("ana@example.com".into()));
        first.login_method = Some(Some("manus".into()));
        db.upsert_user(&first).unwrap();

        // Absent fields stay untouched, explicit NULL overwrites.
        let mut second = UserUpsert::new("open-1");
        second.email = Some(None);
        db.upsert_user(&second).unwrap();

        let user = db.get_user_by_open_id("open-1").unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("Ana"));
        assert_eq!(user.email, None);
        assert_eq!(user.login_method.as_deref(), Some("manus"));
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn empty_upsert_still_bumps_last_signed_in() {
        let db = db();

        let mut first = UserUpsert::new("open-2");
        first.last_signed_in = Some("2020-01-01T00:00:00.000Z".into());
        db.upsert_user(&first).unwrap();

        db.upsert_user(&UserUpsert::new("open-2")).unwrap();

        let user = db.get_user_by_open_id("open-2").unwrap().unwrap();
        assert_ne!(user.last_signed_in, "2020-01-01T00:00:00.000Z");
    }

    #[test]
    fn explicit_role_survives_later_upserts() {
        let db = db();

        let mut first = UserUpsert::new("open-3");
        first.role = Some(Role::Admin);
        db.upsert_user(&first).unwrap();

        db.upsert_user(&UserUpsert::new("open-3")).unwrap();

        let user = db.get_user_by_open_id("open-3").unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn profile_update_without_fields_is_a_noop() {
        let db = db();

        let mut user = UserUpsert::new("open-4");
        user.name = Some(Some("Bruno".into()));
        db.upsert_user(&user).unwrap();
        let id = db.get_user_by_open_id("open-4").unwrap().unwrap().id;

        assert!(db.update_user_profile(id, None, None).unwrap().is_none());
        let unchanged = db.get_user_by_open_id("open-4").unwrap().unwrap();
        assert_eq!(unchanged.name.as_deref(), Some("Bruno"));
    }

    #[test]
    fn profile_update_sets_provided_fields() {
        let db = db();

        db.upsert_user(&UserUpsert::new("open-5")).unwrap();
        let id = db.get_user_by_open_id("open-5").unwrap().unwrap().id;

        let updated = db
            .update_user_profile(id, Some("Carla"), None)
            .unwrap()
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Carla"));
        assert_eq!(updated.image, None);

        let updated = db
            .update_user_profile(id, None, Some("https://img.example/a.png"))
            .unwrap()
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Carla"));
        assert_eq!(updated.image.as_deref(), Some("https://img.example/a.png"));
    }

    #[test]
    fn record_view_counts_sequential_views() {
        let db = db();

        for _ in 0..5 {
            db.record_view(7, None).unwrap();
        }

        let top = db.top_articles(10).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].article_id, 7);
        assert_eq!(top[0].view_count, 5);
    }

    #[test]
    fn top_articles_orders_by_views_and_caps() {
        let db = db();

        for _ in 0..3 {
            db.record_view(1, None).unwrap();
        }
        db.record_view(2, None).unwrap();
        db.record_view(3, Some(9)).unwrap();
        db.record_view(3, None).unwrap();

        let top = db.top_articles(2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].article_id, 1);
        assert_eq!(top[0].view_count, 3);
        assert_eq!(top[1].article_id, 3);
        assert_eq!(top[1].view_count, 2);
    }
}
