use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http_client::openrouter_client;
use super::oracle::{CategorizationOracle, OracleRequest};
use super::prompts::build_categorization_prompt;
use crate::error::{Result, SorterError};

/// Suffix that turns on OpenRouter's web-search plugin for a model
const ONLINE_SUFFIX: &str = ":online";

/// Message in conversation
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Web search tuning sent alongside `:online` models
#[derive(Serialize)]
struct WebSearchOptions {
    search_context_size: String,
    max_results: u32,
}

/// API request body
#[derive(Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    web_search_options: Option<WebSearchOptions>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

/// API response body
#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

/// API error response
#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// OpenRouter chat-completions client
pub struct OpenRouterClient {
    client: Client,
    api_url: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: openrouter_client().clone(),
            api_url: api_url.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: String, use_web_search: bool) -> ApiRequest {
        let (model, web_search_options) = if use_web_search {
            (
                format!("{}{}", self.model, ONLINE_SUFFIX),
                Some(WebSearchOptions {
                    search_context_size: "medium".to_string(),
                    max_results: 5,
                }),
            )
        } else {
            (self.model.clone(), None)
        };

        ApiRequest {
            model,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
            web_search_options,
        }
    }

    /// Send a single user message and return the reply text
    async fn send_message(&self, api_key: &str, request: &ApiRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_text) {
                return Err(SorterError::Oracle(format!(
                    "API error ({}): {}",
                    status, api_error.error.message
                )));
            }
            return Err(SorterError::Oracle(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        extract_reply(&body)
    }
}

/// Pull `choices[0].message.content` out of a completion body
fn extract_reply(body: &str) -> Result<String> {
    let api_response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| SorterError::Oracle(format!("Failed to parse response: {}", e)))?;

    api_response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| SorterError::Oracle("Response contained no message".to_string()))
}

#[async_trait]
impl CategorizationOracle for OpenRouterClient {
    async fn categorize(&self, api_key: &str, request: &OracleRequest) -> Result<String> {
        let prompt = build_categorization_prompt(request);
        let api_request = self.build_request(prompt, request.use_web_search);

        tracing::info!(
            model = %api_request.model,
            files = request.files.len(),
            folders = request.folders.len(),
            web_search = request.use_web_search,
            "Requesting categorization"
        );

        let reply = self.send_message(api_key, &api_request).await?;

        tracing::info!(chars = reply.len(), "Categorization received");
        Ok(reply)
    }
}
