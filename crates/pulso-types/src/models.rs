/// Domain models shared between the store and the procedure layer.
/// Rows are returned to API callers as-is, so these serialize with the
/// camelCase field names the database columns use.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub image: Option<String>,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
    pub last_signed_in: String,
}

/// Insert-or-update payload for the users table, keyed on `open_id`.
///
/// The three text fields are tri-state: `None` leaves the stored value
/// untouched, `Some(None)` overwrites with NULL, `Some(Some(v))` overwrites
/// with `v`. `last_signed_in` defaults to now when absent; `role` is
/// preserved unless supplied.
#[derive(Debug, Clone, Default)]
pub struct UserUpsert {
    pub open_id: String,
    pub name: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub login_method: Option<Option<String>>,
    pub last_signed_in: Option<String>,
    pub role: Option<Role>,
}

impl UserUpsert {
    pub fn new(open_id: impl Into<String>) -> Self {
        Self {
            open_id: open_id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: i64,
    pub article_id: i64,
    pub user_id: i64,
    pub created_at: String,
}

/// Per-article aggregate row. `viewCount` only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytic {
    pub id: i64,
    pub article_id: i64,
    pub user_id: Option<i64>,
    pub view_count: i64,
    pub comment_count: i64,
    pub like_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub article_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityHistory {
    pub id: i64,
    pub user_id: i64,
    pub article_id: i64,
    pub activity_type: String,
    pub created_at: String,
}

/// `views` counts every activity row for the user, not just `view`-typed
/// ones — kept to match the shipped behavior.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub comments: i64,
    pub likes: i64,
    pub views: i64,
}
