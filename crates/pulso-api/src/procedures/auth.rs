use pulso_types::api::{EmptyInput, SuccessResponse};
use pulso_types::models::User;

use crate::context::RequestCtx;
use crate::error::RpcError;

pub async fn me(ctx: RequestCtx, _input: EmptyInput) -> Result<Option<User>, RpcError> {
    Ok(ctx.user)
}

pub async fn logout(ctx: RequestCtx, _input: EmptyInput) -> Result<SuccessResponse, RpcError> {
    ctx.session.clear();
    Ok(SuccessResponse::ok())
}
