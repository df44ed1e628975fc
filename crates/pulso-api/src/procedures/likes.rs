use pulso_types::api::ArticleInput;
use pulso_types::models::Like;

use crate::context::RequestCtx;
use crate::error::RpcError;

pub async fn add(ctx: RequestCtx, input: ArticleInput) -> Result<Option<Like>, RpcError> {
    let user = ctx.user()?;
    Ok(ctx.state.store.add_like(input.article_id, user.id).await)
}

pub async fn remove(ctx: RequestCtx, input: ArticleInput) -> Result<bool, RpcError> {
    let user = ctx.user()?;
    Ok(ctx.state.store.remove_like(input.article_id, user.id).await)
}

pub async fn count(ctx: RequestCtx, input: ArticleInput) -> Result<i64, RpcError> {
    Ok(ctx.state.store.get_likes_by_article(input.article_id).await)
}

pub async fn has_user_liked(ctx: RequestCtx, input: ArticleInput) -> Result<bool, RpcError> {
    let user = ctx.user()?;
    Ok(ctx
        .state
        .store
        .has_user_liked(input.article_id, user.id)
        .await)
}
