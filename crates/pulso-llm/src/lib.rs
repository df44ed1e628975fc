//! Chatbot gateway: one wrapped call to an OpenAI-compatible
//! chat-completions endpoint with a fixed technology-assistant persona.
//!
//! [`Chatbot::ask`] never fails the caller. Empty choice lists, non-text
//! content and transport errors each map to a fixed, user-safe fallback
//! string — the user always gets *a* response.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

const SYSTEM_PROMPT: &str = "Você é um assistente especializado em tecnologia. Responda perguntas sobre tecnologia, inovação, IA, computação quântica, energia renovável e outros tópicos tech de forma clara, concisa e informativa. Mantenha as respostas em português brasileiro.";

const FALLBACK_NO_TEXT: &str = "Desculpe, não consegui processar sua pergunta.";
const FALLBACK_NO_CHOICES: &str = "Desculpe, não consegui gerar uma resposta.";
const FALLBACK_ERROR: &str =
    "Desculpe, ocorreu um erro ao processar sua pergunta. Tente novamente mais tarde.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Clone)]
pub struct ChatbotConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct Chatbot {
    client: Client,
    config: ChatbotConfig,
}

impl Chatbot {
    pub fn new(config: ChatbotConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self { client, config }
    }

    /// Answers a user message. Always returns a non-empty response; any
    /// upstream failure is logged and downgraded to a fallback string.
    pub async fn ask(&self, message: &str) -> String {
        match self.complete(message).await {
            Ok(completion) => reply_from(completion),
            Err(e) => {
                error!("chatbot gateway error: {e}");
                FALLBACK_ERROR.to_string()
            }
        }
    }

    async fn complete(&self, message: &str) -> Result<ChatCompletion, GatewayError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
        };

        let mut builder = self.client.post(&self.config.api_url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status()));
        }

        Ok(response.json::<ChatCompletion>().await?)
    }
}

fn reply_from(completion: ChatCompletion) -> String {
    match completion.choices.into_iter().next() {
        Some(choice) => choice
            .message
            .content
            .unwrap_or_else(|| FALLBACK_NO_TEXT.to_string()),
        None => FALLBACK_NO_CHOICES.to_string(),
    }
}
