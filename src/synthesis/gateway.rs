//! OpenAI-compatible chat-completions client for SQL synthesis.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SynthesisConfig;
use crate::error::{Result, SynthesisError};
use crate::query::QueryContext;

use super::SqlSynthesizer;

/// System prompt fixing the analytics schema and the SQL-only output rules.
const SYSTEM_PROMPT: &str = r#"You are an expert in SQL and data analytics.
Convert natural-language questions about video metrics (asked in Russian)
into SQL queries.

Database structure:
1. Table videos:
   - id (TEXT) - unique video identifier
   - creator_id (TEXT) - creator identifier
   - video_created_at (TIMESTAMP) - when the video was published
   - views_count (INTEGER) - cumulative view count
   - likes_count (INTEGER) - cumulative like count
   - comments_count (INTEGER) - cumulative comment count
   - reports_count (INTEGER) - cumulative report count
   - created_at (TIMESTAMP) - when the row was created
   - updated_at (TIMESTAMP) - when the row was updated

2. Table video_snapshots:
   - id (TEXT) - unique snapshot identifier
   - video_id (TEXT) - reference to the video
   - views_count, likes_count, comments_count, reports_count (INTEGER) -
     counters at snapshot time
   - delta_views_count, delta_likes_count, delta_comments_count,
     delta_reports_count (INTEGER) - change since the previous snapshot
   - created_at (TIMESTAMP) - when the snapshot was taken
   - updated_at (TIMESTAMP) - when the snapshot was updated

Rules:
1. Always use the exact table and column names above
2. Use COUNT(*) for counting and SUM() for totals
3. Filter by date with WHERE DATE(created_at) BETWEEN ...
4. Return ONLY the SQL query, with no explanations

Examples:
Question: "Сколько всего видео есть в системе?"
SQL: SELECT COUNT(*) FROM videos;

Question: "Сколько видео у креатора с id abc вышло с 1 по 5 ноября 2025?"
SQL: SELECT COUNT(*) FROM videos WHERE creator_id = 'abc' AND DATE(video_created_at) BETWEEN '2025-11-01' AND '2025-11-05';

Question: "Сколько видео набрало больше 100000 просмотров?"
SQL: SELECT COUNT(*) FROM videos WHERE views_count > 100000;

Question: "На сколько просмотров выросли все видео 28 ноября 2025?"
SQL: SELECT SUM(delta_views_count) FROM video_snapshots WHERE DATE(created_at) = '2025-11-28';

Question: "Сколько разных видео получали новые просмотры 27 ноября 2025?"
SQL: SELECT COUNT(DISTINCT video_id) FROM video_snapshots WHERE DATE(created_at) = '2025-11-27' AND delta_views_count > 0;"#;

/// Chat-completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Statement synthesizer backed by an OpenAI-compatible chat-completions
/// endpoint.
pub struct LlmSynthesizer {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmSynthesizer {
    /// Build a synthesizer from configuration. The API key comes from the
    /// config or the `LLM_API_KEY` environment variable.
    pub fn from_config(config: &SynthesisConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("LLM_API_KEY").ok())
            .ok_or(SynthesisError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn messages(&self, context: &QueryContext) -> Vec<ChatMessage<'_>> {
        let mut messages = vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: context.question.clone(),
            },
        ];
        if context.range_sql.is_some() {
            let rendered = serde_json::to_string(context).unwrap_or_default();
            messages.push(ChatMessage {
                role: "system",
                content: format!("Context: {rendered}"),
            });
        }
        messages
    }

    async fn request_statement(&self, context: &QueryContext) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: self.messages(context),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout
                } else if e.is_connect() {
                    SynthesisError::Request(format!("connection failed: {e}"))
                } else {
                    SynthesisError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(SynthesisError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::MalformedResponse(e.to_string()))?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SynthesisError::MalformedResponse("no choices in response".into()))?;
        Ok(choice.message.content)
    }
}

/// Synthesized statements may arrive wrapped in markdown code fences.
fn strip_statement_fences(raw: &str) -> String {
    raw.replace("```sql", "").replace("```", "").trim().to_string()
}

#[async_trait]
impl SqlSynthesizer for LlmSynthesizer {
    async fn synthesize(&self, context: &QueryContext) -> Result<Option<String>> {
        let content = self.request_statement(context).await?;
        let statement = strip_statement_fences(&content);
        if statement.is_empty() {
            return Ok(None);
        }
        debug!(statement = %statement, "synthesized SQL statement");
        Ok(Some(statement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SynthesisConfig {
        SynthesisConfig {
            api_key: Some("test-key".to_string()),
            ..SynthesisConfig::default()
        }
    }

    #[test]
    fn test_strip_statement_fences() {
        assert_eq!(
            strip_statement_fences("```sql\nSELECT COUNT(*) FROM videos;\n```"),
            "SELECT COUNT(*) FROM videos;"
        );
        assert_eq!(
            strip_statement_fences("SELECT COUNT(*) FROM videos;"),
            "SELECT COUNT(*) FROM videos;"
        );
        assert_eq!(strip_statement_fences("```\n```"), "");
    }

    #[test]
    fn test_from_config_missing_api_key() {
        std::env::remove_var("LLM_API_KEY");
        let config = SynthesisConfig {
            api_key: None,
            ..SynthesisConfig::default()
        };
        assert!(LlmSynthesizer::from_config(&config).is_err());
    }

    #[test]
    fn test_base_url_normalization() {
        let config = SynthesisConfig {
            base_url: "https://api.example.com/v1/".to_string(),
            ..test_config()
        };
        let synthesizer = LlmSynthesizer::from_config(&config).unwrap();
        assert!(!synthesizer.base_url.ends_with('/'));
    }

    #[test]
    fn test_context_message_only_with_range() {
        let synthesizer = LlmSynthesizer::from_config(&test_config()).unwrap();

        let bare = QueryContext::new("Сколько всего видео?", None);
        assert_eq!(synthesizer.messages(&bare).len(), 2);

        let range = crate::temporal::TemporalRange::single_day(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        );
        let dated = QueryContext::new("Сколько видео вышло 15 января 2024?", Some(range));
        let messages = synthesizer.messages(&dated);
        assert_eq!(messages.len(), 3);
        assert!(messages[2].content.contains("BETWEEN"));
    }

    #[test]
    fn test_request_serialization() {
        let synthesizer = LlmSynthesizer::from_config(&test_config()).unwrap();
        let context = QueryContext::new("вопрос", None);
        let request = ChatRequest {
            model: &synthesizer.model,
            messages: synthesizer.messages(&context),
            temperature: synthesizer.temperature,
            max_tokens: synthesizer.max_tokens,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "вопрос");
    }
}
