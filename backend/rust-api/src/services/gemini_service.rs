use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::metrics::track_ai_operation;
use crate::models::generation::{ChapterContent, CourseLayoutEnvelope};
use crate::utils::json::{extract_json_array, extract_json_object};

// Prompt text is product copy; treat it as opaque.
const LAYOUT_PROMPT: &str = r#"Generate Learning Course depends on following details. In which Make sure to add Course Name, Description, Course Banner Image Prompt (Create a modern, flat-style 2D digital illustration representing user Topic. Include UI/UX elements such as mockup screens, text blocks, icons, buttons, and creative workspace tools. Add symbolic elements related to user Course, like sticky notes, design components, and visual aids. Use a vibrant color palette (blues, purples, oranges) with a clean, professional look. The illustration should feel creative, tech-savvy, and educational, ideal for visualizing concepts in user Course) for Course Banner in 3d format Chapter Name, Topic under each chapters, Duration for each chapters etc, in JSON format only.

Schema:
{
  "course": {
    "name": "string",
    "description": "string",
    "category": "string",
    "level": "string",
    "includeVideo": "boolean",
    "noOfChapters": "number",
    "bannerImagePrompt": "string",
    "chapters": [
      {
        "chapterName": "string",
        "duration": "string",
        "topics": [
          "string"
        ]
      }
    ]
  }
}"#;

const LAYOUT_PROMPT_FOOTER: &str = "Please generate a comprehensive course layout based on the user input. Make sure the response is valid JSON that follows the exact schema provided. Include realistic chapter durations, relevant topics for each chapter, and a detailed banner image prompt that matches the course content.";

const CONTENT_PROMPT: &str = r#"Depends on Chapter name and Topic Generate content for each topic in HTML and give response in JSON format.

Schema:
[
  {
    "chapterName": "string",
    "topics": [
      {
        "topic": "string",
        "content": "HTML content"
      }
    ]
  }
]"#;

/// Client for the Gemini generateContent API. Constructed once at startup
/// from Config and injected through AppState.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            api_url: config.gemini_api_url.clone(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a course outline from free-text user input. Returns the raw
    /// JSON layout after a structural sanity check.
    pub async fn generate_course_layout(&self, user_input: &str) -> Result<serde_json::Value> {
        track_ai_operation("generate_layout", async {
            let prompt = format!(
                "{}\n\nUser Input: {}\n\n{}",
                LAYOUT_PROMPT, user_input, LAYOUT_PROMPT_FOOTER
            );

            let text = self.generate_text(&prompt).await?;

            let layout = extract_json_object(&text)
                .context("Failed to extract course layout from AI response")?;

            // Shape check before handing the blob to callers
            serde_json::from_value::<CourseLayoutEnvelope>(layout.clone())
                .map_err(|_| anyhow!("Invalid course structure in AI response"))?;
            if layout["course"]["chapters"]
                .as_array()
                .map_or(true, |chapters| chapters.is_empty())
            {
                return Err(anyhow!("Invalid course structure in AI response"));
            }

            Ok(layout)
        })
        .await
    }

    /// Generate per-topic HTML content for a previously generated outline.
    pub async fn generate_course_content(
        &self,
        layout: &serde_json::Value,
    ) -> Result<Vec<ChapterContent>> {
        track_ai_operation("generate_content", async {
            let layout_json = serde_json::to_string_pretty(layout)
                .context("Failed to serialize course layout")?;
            let prompt = format!("{}\n\nUser Input:\n{}\n", CONTENT_PROMPT, layout_json);

            let text = self.generate_text(&prompt).await?;

            let value = extract_json_array(&text)
                .context("Failed to extract chapter content from AI response")?;

            let chapters: Vec<ChapterContent> = serde_json::from_value(value)
                .map_err(|_| anyhow!("Invalid chapter content structure in AI response"))?;

            Ok(chapters)
        })
        .await
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Gemini API key is not configured"))?;

        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);

        let payload = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await
            .context("Failed to call Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Gemini API returned error {}: {}", status, error_text));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        let text: String = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(anyhow!("Gemini API returned an empty response"));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_key: Option<&str>) -> GeminiClient {
        GeminiClient {
            http: Client::new(),
            api_url: "https://example.invalid/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: api_key.map(str::to_string),
        }
    }

    #[test]
    fn is_configured_requires_api_key() {
        assert!(client(Some("key")).is_configured());
        assert!(!client(None).is_configured());
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_network_call() {
        let err = client(None)
            .generate_text("hello")
            .await
            .expect_err("must fail without a key");
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn candidate_response_text_is_joined_from_parts() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"course\""}, {"text": ": {}}"}]}
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap();
        assert_eq!(text, "{\"course\": {}}");
    }
}
