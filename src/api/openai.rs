use super::{ScriptProposer, snippet};
use crate::config::Config;
use crate::error::{ConfigError, ProviderError};
use crate::lang::Language;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{info, warn};

const RESPONSES_URL: &str = "https://api.openai.com/v1/responses";
const MAX_REQUEST_CHARS: usize = 8_000;

const SCRIPT_SHAPE: &str = r#"{
  "title": "Training title",
  "description": "What the training covers",
  "objectives": ["Objective 1", "Objective 2", "Objective 3"],
  "estimated_duration": "15 minutes",
  "level": "beginner",
  "scenes": [
    {
      "index": 1,
      "title": "Scene title",
      "narration": "Full voice-over text (180-250 words)",
      "visual_descriptor": "descriptive keywords for an image search",
      "key_points": ["Point 1", "Point 2", "Point 3"]
    }
  ]
}"#;

fn system_prompt(lang: Language) -> String {
    match lang {
        Language::English => format!(
            "You write professional training video scripts.\n\
             Produce 8 to 12 scenes: an introduction, fundamentals, intermediate and advanced \
             concepts, practical applications, then a conclusion.\n\
             Each scene has a title, a 180-250 word voice-over, 3-4 key points, and a few \
             descriptive keywords for its visual (never a URL).\n\
             Write the content in English. Reply with ONE JSON object shaped exactly like:\n{SCRIPT_SHAPE}"
        ),
        Language::French => format!(
            "Tu rédiges des scripts de vidéos de formation professionnelle.\n\
             Produis 8 à 12 scènes : introduction, fondamentaux, concepts intermédiaires puis \
             avancés, applications pratiques, puis conclusion.\n\
             Chaque scène a un titre, une voix off de 180 à 250 mots, 3 ou 4 points clés et \
             quelques mots-clés descriptifs pour son visuel (jamais une URL).\n\
             Rédige le contenu en français mais garde les noms de champs anglais. \
             Réponds avec UN SEUL objet JSON de cette forme exacte :\n{SCRIPT_SHAPE}"
        ),
    }
}

fn trim_copy_utf8_safe(input: &str, max_bytes: usize) -> &str {
    if input.len() <= max_bytes {
        return input;
    }
    let mut cut = max_bytes;
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    &input[..cut]
}

/// First `output_text` entry of a Responses API reply.
pub fn extract_output_text(root: &Value) -> Option<String> {
    if let Some(err) = root.get("error").filter(|e| !e.is_null()) {
        let msg = err.get("message").and_then(Value::as_str).unwrap_or("?");
        let code = err.get("code").and_then(Value::as_str).unwrap_or("?");
        warn!("OpenAI error ({}): {}", code, msg);
        return None;
    }

    root.get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .find(|entry| entry.get("type").and_then(Value::as_str) == Some("output_text"))
        .and_then(|entry| entry.get("text").and_then(Value::as_str))
        .map(str::to_string)
}

pub struct OpenAiProposer {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiProposer {
    pub fn new(client: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: RESPONSES_URL.to_string(),
        }
    }

    pub fn from_config(cfg: &Config, client: Client) -> Result<Self, ConfigError> {
        let key = cfg.openai_key()?;
        Ok(Self::new(client, key, cfg.openai_model.clone()))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request_body(&self, request: &str) -> Value {
        let lang = Language::detect(request);
        json!({
            "model": self.model,
            "input": [
                {"role": "system", "content": system_prompt(lang)},
                {"role": "user", "content": trim_copy_utf8_safe(request, MAX_REQUEST_CHARS)},
            ],
            "text": {"format": {"type": "json_object"}},
        })
    }
}

#[async_trait]
impl ScriptProposer for OpenAiProposer {
    async fn propose(&self, request: &str) -> Result<String, ProviderError> {
        info!("requesting training script from {}", self.model);
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .timeout(Duration::from_secs(600))
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            warn!("OpenAI HTTP {}", status.as_u16());
            return Err(ProviderError::Remote {
                provider: "openai",
                status: status.as_u16(),
                body: snippet(&raw),
            });
        }

        let root: Value = serde_json::from_str(&raw)?;
        match extract_output_text(&root) {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => {
                warn!("OpenAI raw body: {}", snippet(&raw));
                Err(ProviderError::EmptyResponse { provider: "openai" })
            }
        }
    }
}
