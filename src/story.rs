//! Vendor generation: story text (Gemini) and illustrations (Stability).
//!
//! API keys come from the environment (`GEMINI_API_KEY`, `STABILITY_API_KEY`)
//! and are sent as a query parameter / bearer header respectively — never
//! baked into source or config files.
//!
//! [`generate_story`] never fails: any vendor error resolves to a canned
//! narrator line so the `/chat` path always has an answer. Image generation
//! does fail, and its callers treat that as "no illustration".

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::{ImageConfig, StoryConfig};

/// Answer text used whenever the text vendor is unreachable or misbehaves.
pub const FALLBACK_ANSWER: &str = "Oops! I tripped over my own feet while trying to be funny!";

/// Instruction prefix that sets the storytelling register.
const STORY_INSTRUCTION: &str = "Tell this story in a very funny, silly tone for kids: ";

/// Positive prompt wrapper for illustrations.
const IMAGE_STYLE_PREFIX: &str =
    "Create a vibrant, detailed, and engaging illustration for children: ";
const IMAGE_STYLE_SUFFIX: &str = ". Style: colorful, whimsical, and child-friendly";

/// Negative prompt keeping output quality and tone in bounds.
const IMAGE_NEGATIVE_PROMPT: &str =
    "ugly, blurry, poor quality, distorted, scary, inappropriate";

/// Generate a child-friendly story continuation for `prompt`.
///
/// On any failure (missing key, transport, unexpected response shape) the
/// error is logged to stderr and [`FALLBACK_ANSWER`] is returned instead.
pub async fn generate_story(config: &StoryConfig, prompt: &str) -> String {
    match try_generate_story(config, prompt).await {
        Ok(text) => text,
        Err(e) => {
            eprintln!("story generation failed, using fallback: {:#}", e);
            FALLBACK_ANSWER.to_string()
        }
    }
}

async fn try_generate_story(config: &StoryConfig, prompt: &str) -> Result<String> {
    let api_key = std::env::var("GEMINI_API_KEY")
        .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY not set"))?;

    let url = format!(
        "{}/models/{}:generateContent?key={}",
        config.url.trim_end_matches('/'),
        config.model,
        api_key
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "contents": [
            {
                "parts": [
                    { "text": format!("{}{}", STORY_INSTRUCTION, prompt) }
                ]
            }
        ]
    });

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body_text = resp.text().await.unwrap_or_default();
        bail!("generation API error {}: {}", status, body_text);
    }

    let json: serde_json::Value = resp.json().await?;
    parse_story_response(&json)
}

fn parse_story_response(json: &serde_json::Value) -> Result<String> {
    json.pointer("/candidates/0/content/parts/0/text")
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid generation response: missing candidate text"))
}

/// Generate an illustration for `prompt`, returned as base64 PNG.
///
/// # Errors
///
/// Missing `STABILITY_API_KEY`, transport failures, non-2xx statuses, and
/// responses without artifacts all error; callers map this to "no
/// illustration" per the soft-failure contract.
pub async fn generate_image(config: &ImageConfig, prompt: &str) -> Result<String> {
    let api_key = std::env::var("STABILITY_API_KEY")
        .map_err(|_| anyhow::anyhow!("STABILITY_API_KEY not set"))?;

    let url = format!(
        "{}/{}/text-to-image",
        config.url.trim_end_matches('/'),
        config.engine
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "text_prompts": [
            {
                "text": format!("{}{}{}", IMAGE_STYLE_PREFIX, prompt, IMAGE_STYLE_SUFFIX),
                "weight": 1
            },
            {
                "text": IMAGE_NEGATIVE_PROMPT,
                "weight": -1
            }
        ],
        "cfg_scale": config.cfg_scale,
        "height": config.height,
        "width": config.width,
        "samples": 1,
        "steps": config.steps,
        "style_preset": config.style_preset
    });

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .header("Accept", "application/json")
        .json(&body)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body_text = resp.text().await.unwrap_or_default();
        bail!("image API error {}: {}", status, body_text);
    }

    let json: serde_json::Value = resp.json().await?;
    parse_image_response(&json)
}

fn parse_image_response(json: &serde_json::Value) -> Result<String> {
    json.pointer("/artifacts/0/base64")
        .and_then(|b| b.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("No image generated"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_story_candidate_text() {
        let json = serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": "Once upon a time..." } ] } }
            ]
        });
        assert_eq!(parse_story_response(&json).unwrap(), "Once upon a time...");
    }

    #[test]
    fn parse_story_missing_candidates_errors() {
        let json = serde_json::json!({ "candidates": [] });
        assert!(parse_story_response(&json).is_err());
    }

    #[test]
    fn parse_image_first_artifact() {
        let json = serde_json::json!({
            "artifacts": [ { "base64": "aGVsbG8=" }, { "base64": "ignored" } ]
        });
        assert_eq!(parse_image_response(&json).unwrap(), "aGVsbG8=");
    }

    #[test]
    fn parse_image_empty_artifacts_errors() {
        let json = serde_json::json!({ "artifacts": [] });
        let err = parse_image_response(&json).unwrap_err();
        assert!(err.to_string().contains("No image generated"));
    }

    #[test]
    fn parse_image_blank_base64_errors() {
        let json = serde_json::json!({ "artifacts": [ { "base64": "" } ] });
        assert!(parse_image_response(&json).is_err());
    }
}
