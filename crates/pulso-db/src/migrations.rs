use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            openId          TEXT NOT NULL UNIQUE,
            name            TEXT,
            email           TEXT,
            loginMethod     TEXT,
            image           TEXT,
            role            TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
            createdAt       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updatedAt       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            lastSignedIn    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        -- Articles come from an external feed; this table is schema surface
        -- for persisted articles and is not written by the query layer.
        CREATE TABLE IF NOT EXISTS newsArticles (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            title           TEXT NOT NULL,
            description     TEXT,
            url             TEXT NOT NULL,
            urlToImage      TEXT,
            author          TEXT,
            source          TEXT,
            publishedAt     TEXT NOT NULL,
            createdAt       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updatedAt       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS comments (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            articleId       INTEGER NOT NULL,
            userId          INTEGER NOT NULL,
            content         TEXT NOT NULL,
            createdAt       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updatedAt       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_article
            ON comments(articleId, createdAt);

        CREATE TABLE IF NOT EXISTS likes (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            articleId       INTEGER NOT NULL,
            userId          INTEGER NOT NULL,
            createdAt       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_likes_article
            ON likes(articleId);

        CREATE INDEX IF NOT EXISTS idx_likes_user
            ON likes(userId);

        -- UNIQUE(articleId) backs the atomic view-count upsert; there is at
        -- most one aggregate row per article.
        CREATE TABLE IF NOT EXISTS analytics (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            articleId       INTEGER NOT NULL UNIQUE,
            userId          INTEGER,
            viewCount       INTEGER NOT NULL DEFAULT 0,
            commentCount    INTEGER NOT NULL DEFAULT 0,
            likeCount       INTEGER NOT NULL DEFAULT 0,
            createdAt       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updatedAt       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS favorites (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            userId          INTEGER NOT NULL,
            articleId       INTEGER NOT NULL,
            createdAt       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_favorites_user
            ON favorites(userId);

        CREATE TABLE IF NOT EXISTS activityHistory (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            userId          INTEGER NOT NULL,
            articleId       INTEGER NOT NULL,
            activityType    TEXT NOT NULL,
            createdAt       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_activity_user
            ON activityHistory(userId, createdAt);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
