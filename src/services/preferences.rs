use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{PreferenceProfile, SpiceLevel, Vocabulary};
use crate::services::vocabulary::VocabularyService;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Turns one free-text message into a structured preference profile.
///
/// A single attempt per request; any retry policy belongs to the provider,
/// not here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferenceAnalyzer: Send + Sync {
    async fn analyze(&self, message: &str, vocabulary: &Vocabulary)
        -> AppResult<PreferenceProfile>;
}

/// Preference analyzer backed by an OpenAI-compatible chat-completions API.
pub struct OpenAiAnalyzer {
    http_client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAiAnalyzer {
    pub fn new(api_key: String, api_url: String, model: String) -> AppResult<Self> {
        let http_client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http_client,
            api_key,
            api_url,
            model,
        })
    }
}

/// Raw model output before validation.
///
/// Missing fields default; a wrong-typed field fails the whole parse, which
/// the extractor resolves to the fallback profile.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPreferences {
    spice_level: Option<String>,
    genres: Vec<String>,
    content_warnings: Vec<String>,
    excluded_warnings: Vec<String>,
    minimum_rating: Option<f64>,
    keywords: Vec<String>,
}

impl From<RawPreferences> for PreferenceProfile {
    fn from(raw: RawPreferences) -> Self {
        PreferenceProfile {
            // An unrecognized spice word degrades to "no preference".
            spice_level: raw.spice_level.as_deref().and_then(SpiceLevel::parse_lenient),
            genres: raw.genres,
            content_warnings: raw.content_warnings,
            excluded_warnings: raw.excluded_warnings,
            minimum_rating: raw.minimum_rating.map(|r| r.clamp(0.0, 5.0)),
            keywords: raw.keywords,
        }
    }
}

/// System instruction: output schema, the spice scale, and the catalog's
/// current vocabulary so the model answers in labels that actually exist.
fn system_prompt(vocabulary: &Vocabulary) -> String {
    let mut prompt = String::from(
        "You are a romance book recommendation assistant. Analyze the user's message \
         and extract their preferences in a structured format.\n\n\
         For content warnings, distinguish between warnings they want to include and \
         warnings they want to exclude.\n\n\
         Spice levels, from tamest to most explicit:\n\
         - Sweet: clean, closed door, fade to black, no explicit content\n\
         - Mild: kissing, touching, mild intimacy\n\
         - Medium: moderate intimacy, some explicit content\n\
         - Hot: explicit content, steamy scenes\n\
         - Scorching: very explicit content, frequent steamy scenes\n\
         - Inferno: extremely explicit content, very frequent steamy scenes\n",
    );

    if !vocabulary.tags.is_empty() {
        prompt.push_str("\nAvailable tags in the catalog (comma-separated):\n");
        prompt.push_str(&vocabulary.tags.join(", "));
        prompt.push('\n');
    }

    if !vocabulary.warnings.is_empty() {
        prompt.push_str("\nAvailable content warnings in the catalog (comma-separated):\n");
        prompt.push_str(&vocabulary.warnings.join(", "));
        prompt.push('\n');
    }

    prompt.push_str(
        "\nOnly use tags and content warnings that exist in the catalog; map anything \
         else the user mentions to the closest available option.\n\n\
         Respond with a JSON object only:\n\
         {\n\
         \u{20}   \"spiceLevel\": \"Sweet\" | \"Mild\" | \"Medium\" | \"Hot\" | \"Scorching\" | \"Inferno\",\n\
         \u{20}   \"genres\": [\"tag1\", \"tag2\"],\n\
         \u{20}   \"contentWarnings\": [\"warning1\"],\n\
         \u{20}   \"excludedWarnings\": [\"warning2\"],\n\
         \u{20}   \"minimumRating\": 0.0 to 5.0 or null,\n\
         \u{20}   \"keywords\": [\"free text\"]\n\
         }",
    );

    prompt
}

#[async_trait]
impl PreferenceAnalyzer for OpenAiAnalyzer {
    async fn analyze(
        &self,
        message: &str,
        vocabulary: &Vocabulary,
    ) -> AppResult<PreferenceProfile> {
        let url = format!("{}/chat/completions", self.api_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt(vocabulary) },
                { "role": "user", "content": message },
            ],
            "response_format": { "type": "json_object" },
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "language model returned status {}: {}",
                status, body
            )));
        }

        let payload: serde_json::Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AppError::Internal("language model response has no content".to_string()))?;

        let raw: RawPreferences = serde_json::from_str(content).map_err(|e| {
            AppError::Internal(format!("language model returned invalid preferences: {}", e))
        })?;

        Ok(PreferenceProfile::from(raw))
    }
}

/// Owns preference extraction end to end: vocabulary lookup, the analyzer
/// call, validation, and the fallback profile.
///
/// Extraction is total. A broken language model degrades the profile; it
/// never fails the request.
pub struct PreferenceExtractor {
    analyzer: Arc<dyn PreferenceAnalyzer>,
    vocabulary: VocabularyService,
    fallback_genres: Vec<String>,
}

impl PreferenceExtractor {
    pub fn new(
        analyzer: Arc<dyn PreferenceAnalyzer>,
        vocabulary: VocabularyService,
        fallback_genres: Vec<String>,
    ) -> Self {
        Self {
            analyzer,
            vocabulary,
            fallback_genres,
        }
    }

    pub async fn extract(&self, message: &str) -> PreferenceProfile {
        let vocabulary = self.vocabulary.get().await;

        match self.analyzer.analyze(message, &vocabulary).await {
            Ok(profile) => {
                tracing::debug!(
                    genres = profile.genres.len(),
                    excluded_warnings = profile.excluded_warnings.len(),
                    spice = ?profile.spice_level,
                    "preferences extracted"
                );
                profile
            }
            Err(error) => {
                tracing::warn!(%error, "preference extraction failed, using default profile");
                self.default_profile()
            }
        }
    }

    /// The availability-over-precision fallback: a mid-band spice ceiling
    /// and a couple of broadly popular genres.
    pub fn default_profile(&self) -> PreferenceProfile {
        PreferenceProfile {
            spice_level: Some(SpiceLevel::Medium),
            genres: self.fallback_genres.clone(),
            ..PreferenceProfile::default()
        }
    }
}
