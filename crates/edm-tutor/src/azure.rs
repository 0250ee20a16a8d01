use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ChatRequest, LlmClient, TutorError};

/// Connection settings for one Azure OpenAI deployment.
#[derive(Clone)]
pub struct AzureSettings {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for AzureSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<REDACTED>")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Chat-completions client for an Azure OpenAI deployment.
#[derive(Debug, Clone)]
pub struct AzureOpenAi {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl AzureOpenAi {
    pub fn new(settings: AzureSettings) -> Result<Self, TutorError> {
        let endpoint = settings.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(TutorError::Config("endpoint is empty".into()));
        }
        if settings.api_key.trim().is_empty() {
            return Err(TutorError::Config("api key is empty".into()));
        }
        if settings.deployment.trim().is_empty() {
            return Err(TutorError::Config("deployment is empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| TutorError::Config(e.to_string()))?;
        Ok(Self {
            http,
            url: format!(
                "{endpoint}/openai/deployments/{}/chat/completions?api-version={}",
                settings.deployment.trim(),
                settings.api_version.trim()
            ),
            api_key: settings.api_key,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    messages: [WireMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for AzureOpenAi {
    fn name(&self) -> &'static str {
        "Azure OpenAI"
    }

    async fn complete(&self, req: ChatRequest) -> Result<String, TutorError> {
        let body = CompletionBody {
            messages: [
                WireMessage {
                    role: "system",
                    content: &req.system,
                },
                WireMessage {
                    role: "user",
                    content: &req.user,
                },
            ],
            max_tokens: req.max_tokens,
            temperature: req.temperature,
        };

        let resp = self
            .http
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TutorError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(TutorError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| TutorError::Decode(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| TutorError::Decode("response has no message content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: &str) -> AzureSettings {
        AzureSettings {
            endpoint: endpoint.into(),
            api_key: "key".into(),
            deployment: "gpt-4".into(),
            api_version: "2024-10-21".into(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn url_is_built_from_endpoint_and_deployment() {
        let c = AzureOpenAi::new(settings("https://res.openai.azure.com/")).unwrap();
        assert_eq!(
            c.url(),
            "https://res.openai.azure.com/openai/deployments/gpt-4/chat/completions?api-version=2024-10-21"
        );
    }

    #[test]
    fn empty_endpoint_is_a_config_error() {
        let err = AzureOpenAi::new(settings("  ")).unwrap_err();
        assert!(matches!(err, TutorError::Config(_)));
    }

    #[test]
    fn debug_redacts_key() {
        let s = format!("{:?}", settings("https://x"));
        assert!(s.contains("<REDACTED>"));
        assert!(!s.contains("\"key\""));
    }
}
