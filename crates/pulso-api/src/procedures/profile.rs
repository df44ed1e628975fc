use pulso_types::api::{
    ActivityHistoryInput, ArticleInput, EmptyInput, ProfileResponse, RecordActivityInput,
    SuccessResponse, UpdateProfileInput, UpdateProfileResponse,
};
use pulso_types::models::{ActivityHistory, Favorite};

use crate::context::RequestCtx;
use crate::error::RpcError;

const DEFAULT_HISTORY_LIMIT: i64 = 20;

pub async fn get_profile(
    ctx: RequestCtx,
    _input: EmptyInput,
) -> Result<ProfileResponse, RpcError> {
    let user = ctx.user()?.clone();
    let stats = ctx.state.store.get_user_stats(user.id).await;
    Ok(ProfileResponse { user, stats })
}

pub async fn get_activity_history(
    ctx: RequestCtx,
    input: ActivityHistoryInput,
) -> Result<Vec<ActivityHistory>, RpcError> {
    let user = ctx.user()?;
    let limit = input.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(ctx
        .state
        .store
        .get_user_activity_history(user.id, limit)
        .await)
}

pub async fn get_favorites(
    ctx: RequestCtx,
    _input: EmptyInput,
) -> Result<Vec<Favorite>, RpcError> {
    let user = ctx.user()?;
    Ok(ctx.state.store.get_user_favorites(user.id).await)
}

pub async fn add_favorite(
    ctx: RequestCtx,
    input: ArticleInput,
) -> Result<Option<Favorite>, RpcError> {
    let user = ctx.user()?;
    Ok(ctx
        .state
        .store
        .add_favorite(user.id, input.article_id)
        .await)
}

pub async fn remove_favorite(ctx: RequestCtx, input: ArticleInput) -> Result<bool, RpcError> {
    let user = ctx.user()?;
    Ok(ctx
        .state
        .store
        .remove_favorite(user.id, input.article_id)
        .await)
}

pub async fn is_favorite(ctx: RequestCtx, input: ArticleInput) -> Result<bool, RpcError> {
    let user = ctx.user()?;
    Ok(ctx.state.store.is_favorite(user.id, input.article_id).await)
}

pub async fn record_activity(
    ctx: RequestCtx,
    input: RecordActivityInput,
) -> Result<SuccessResponse, RpcError> {
    let user = ctx.user()?;
    ctx.state
        .store
        .record_activity(user.id, input.article_id, &input.activity_type)
        .await;
    Ok(SuccessResponse::ok())
}

pub async fn update_profile(
    ctx: RequestCtx,
    input: UpdateProfileInput,
) -> Result<UpdateProfileResponse, RpcError> {
    let user = ctx.user()?;
    let updated = ctx
        .state
        .store
        .update_user_profile(user.id, input.name, input.image)
        .await;

    Ok(match updated {
        Some(user) => UpdateProfileResponse {
            success: true,
            user: Some(user),
        },
        None => UpdateProfileResponse {
            success: false,
            user: None,
        },
    })
}
