use pulso_types::api::{ArticleInput, SuccessResponse, TopArticlesInput};
use pulso_types::models::Analytic;

use crate::context::RequestCtx;
use crate::error::RpcError;

const DEFAULT_TOP_LIMIT: i64 = 10;

/// Fire-and-forget view tracking; callable anonymously.
pub async fn record_view(
    ctx: RequestCtx,
    input: ArticleInput,
) -> Result<SuccessResponse, RpcError> {
    ctx.state.store.record_article_view(input.article_id, None).await;
    Ok(SuccessResponse::ok())
}

pub async fn get_top_articles(
    ctx: RequestCtx,
    input: TopArticlesInput,
) -> Result<Vec<Analytic>, RpcError> {
    let limit = input.limit.unwrap_or(DEFAULT_TOP_LIMIT);
    Ok(ctx.state.store.get_top_articles(limit).await)
}
