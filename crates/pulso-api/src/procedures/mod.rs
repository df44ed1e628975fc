pub mod analytics;
pub mod auth;
pub mod chatbot;
pub mod comments;
pub mod likes;
pub mod profile;

use crate::registry::Access::{Protected, Public};
use crate::registry::{Procedure, ProcedureRegistry};

/// The full operation tree. Names are the wire interface; the registry
/// rejects duplicates at startup.
pub fn registry() -> anyhow::Result<ProcedureRegistry> {
    ProcedureRegistry::new(vec![
        Procedure::query("auth.me", Public, auth::me),
        Procedure::mutation("auth.logout", Protected, auth::logout),
        Procedure::mutation("comments.add", Protected, comments::add),
        Procedure::query("comments.getByArticle", Public, comments::get_by_article),
        Procedure::mutation("comments.delete", Protected, comments::delete),
        Procedure::mutation("likes.add", Protected, likes::add),
        Procedure::mutation("likes.remove", Protected, likes::remove),
        Procedure::query("likes.count", Public, likes::count),
        Procedure::query("likes.hasUserLiked", Protected, likes::has_user_liked),
        Procedure::mutation("analytics.recordView", Public, analytics::record_view),
        Procedure::query("analytics.getTopArticles", Public, analytics::get_top_articles),
        Procedure::mutation("chatbot.ask", Public, chatbot::ask),
        Procedure::query("profile.getProfile", Protected, profile::get_profile),
        Procedure::query(
            "profile.getActivityHistory",
            Protected,
            profile::get_activity_history,
        ),
        Procedure::query("profile.getFavorites", Protected, profile::get_favorites),
        Procedure::mutation("profile.addFavorite", Protected, profile::add_favorite),
        Procedure::mutation("profile.removeFavorite", Protected, profile::remove_favorite),
        Procedure::query("profile.isFavorite", Protected, profile::is_favorite),
        Procedure::mutation("profile.recordActivity", Protected, profile::record_activity),
        Procedure::mutation("profile.updateProfile", Protected, profile::update_profile),
    ])
}
