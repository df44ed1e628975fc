use pulso_types::api::{ChatInput, ChatResponse};

use crate::context::RequestCtx;
use crate::error::RpcError;

/// Never fails the caller: gateway errors surface as a fixed fallback
/// string inside a successful response.
pub async fn ask(ctx: RequestCtx, input: ChatInput) -> Result<ChatResponse, RpcError> {
    let response = ctx.state.chatbot.ask(&input.message).await;
    Ok(ChatResponse { response })
}
