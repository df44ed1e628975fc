use pulso_types::api::{AddCommentInput, ArticleInput, DeleteCommentInput};
use pulso_types::models::Comment;

use crate::context::RequestCtx;
use crate::error::RpcError;

pub async fn add(ctx: RequestCtx, input: AddCommentInput) -> Result<Option<Comment>, RpcError> {
    let user = ctx.user()?;
    Ok(ctx
        .state
        .store
        .add_comment(input.article_id, user.id, &input.content)
        .await)
}

pub async fn get_by_article(
    ctx: RequestCtx,
    input: ArticleInput,
) -> Result<Vec<Comment>, RpcError> {
    Ok(ctx.state.store.get_comments_by_article(input.article_id).await)
}

/// Deletes by comment id; the caller's ownership of the comment is not
/// verified.
pub async fn delete(ctx: RequestCtx, input: DeleteCommentInput) -> Result<bool, RpcError> {
    Ok(ctx.state.store.delete_comment(input.comment_id, 0).await)
}
