use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::models::{Employee, Post, StoredPage};

// --- Provider trait ---

pub trait AIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
    #[allow(dead_code)]
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub enum ProviderKind {
    Gemini,
    Anthropic,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
    pub short_name: String,
}

pub fn resolve_model(name: &str) -> Result<ModelSpec> {
    match name {
        // Gemini (requires GEMINI_API_KEY)
        "gemini" | "flash" => Ok(ModelSpec {
            provider: ProviderKind::Gemini,
            model_id: "gemini-2.0-flash".to_string(),
            short_name: "gemini".to_string(),
        }),
        "gemini-pro" | "pro" => Ok(ModelSpec {
            provider: ProviderKind::Gemini,
            model_id: "gemini-1.5-pro".to_string(),
            short_name: "gemini-pro".to_string(),
        }),
        // Anthropic (requires ANTHROPIC_API_KEY)
        "claude" | "sonnet" => Ok(ModelSpec {
            provider: ProviderKind::Anthropic,
            model_id: "claude-sonnet-4-5-20250929".to_string(),
            short_name: "claude".to_string(),
        }),
        "haiku" => Ok(ModelSpec {
            provider: ProviderKind::Anthropic,
            model_id: "claude-haiku-4-5-20251001".to_string(),
            short_name: "haiku".to_string(),
        }),
        _ => Err(anyhow!(
            "Unknown model '{}'. Available: gemini (default), gemini-pro, claude, haiku",
            name
        )),
    }
}

pub fn create_provider(spec: &ModelSpec) -> Result<Box<dyn AIProvider>> {
    match spec.provider {
        ProviderKind::Gemini => Ok(Box::new(GeminiProvider::new(spec.model_id.clone())?)),
        ProviderKind::Anthropic => Ok(Box::new(AnthropicProvider::new(spec.model_id.clone())?)),
    }
}

// --- Gemini provider ---

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug)]
pub struct GeminiProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl GeminiProvider {
    pub fn new(model_id: String) -> Result<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .context("GEMINI_API_KEY environment variable not set. Set it with: export GEMINI_API_KEY=your-key-here")?;
        let client = reqwest::blocking::Client::new();
        Ok(Self {
            api_key,
            model_id,
            client,
        })
    }
}

impl AIProvider for GeminiProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: max_tokens,
            },
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_URL, self.model_id, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Gemini API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: GeminiResponse = response
            .json()
            .context("Failed to parse Gemini API response")?;

        api_response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.clone())
            .ok_or_else(|| anyhow!("No content in Gemini API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Anthropic provider ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[allow(dead_code)]
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(model_id: String) -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set. Set it with: export ANTHROPIC_API_KEY=your-key-here")?;
        let client = reqwest::blocking::Client::new();
        Ok(Self {
            api_key,
            model_id,
            client,
        })
    }
}

impl AIProvider for AnthropicProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model_id.clone(),
            max_tokens,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Anthropic API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: AnthropicResponse = response
            .json()
            .context("Failed to parse Anthropic API response")?;

        api_response
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| anyhow!("No content in Anthropic API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Summary generation ---

#[derive(Debug, Default)]
pub struct SummarySections {
    pub summary: String,
    pub follower_analysis: String,
    pub content_analysis: String,
    pub engagement_insights: String,
    pub page_type: String,
}

/// The plain-text context block handed to the model: canonical page
/// attributes plus aggregate post statistics and a few content excerpts.
pub fn build_context(page: &StoredPage, posts: &[Post], employees: &[Employee]) -> String {
    let mut context = format!(
        "Company: {}\n\
         Industry: {}\n\
         Followers: {}\n\
         Employees: {}\n\
         Description: {}\n",
        page.page.name,
        page.page.industry.as_deref().unwrap_or("Not specified"),
        page.page.followers_count,
        page.page.employees_count,
        page.page.description.as_deref().unwrap_or("No description"),
    );

    if !posts.is_empty() {
        let total_likes: i64 = posts.iter().map(|p| p.likes_count).sum();
        let total_comments: i64 = posts.iter().map(|p| p.comments_count).sum();
        let avg_likes = total_likes / posts.len() as i64;

        context.push_str(&format!(
            "\nPosts Analyzed: {}\n\
             Total Likes: {}\n\
             Total Comments: {}\n\
             Average Likes per Post: {}\n\
             \nRecent Post Samples:\n",
            posts.len(),
            total_likes,
            total_comments,
            avg_likes,
        ));
        for (i, post) in posts.iter().take(3).enumerate() {
            let excerpt: String = post
                .content
                .as_deref()
                .unwrap_or("")
                .chars()
                .take(100)
                .collect();
            context.push_str(&format!(
                "- Post {}: {}... (Likes: {}, Comments: {})\n",
                i + 1,
                excerpt,
                post.likes_count,
                post.comments_count,
            ));
        }
    }

    if !employees.is_empty() {
        context.push_str(&format!(
            "\nEmployee Profiles Analyzed: {}\n",
            employees.len()
        ));
    }

    context
}

pub fn generate_summary(
    provider: &dyn AIProvider,
    page: &StoredPage,
    posts: &[Post],
    employees: &[Employee],
) -> Result<SummarySections> {
    let context = build_context(page, posts, employees);
    let prompt = format!(
        "Analyze this LinkedIn company page and provide insights:\n\n\
        {}\n\n\
        Provide a comprehensive analysis with the following sections:\n\n\
        1. **Company Overview**: Brief summary of what the company does and its position\n\
        2. **Follower Analysis**: Insights about their follower base and reach\n\
        3. **Content Strategy**: Analysis of their posting patterns and content type\n\
        4. **Engagement Insights**: How well their content performs\n\
        5. **Page Type**: What type of LinkedIn presence they have (active, professional, engaging, etc.)\n\n\
        Keep it professional, concise, and data-driven.",
        context
    );

    let response = provider.complete(&prompt, 4096)?;
    Ok(split_sections(&response, page.page.followers_count))
}

/// Split the model's free-form prose into the labeled sections. Header lines
/// switch the current section and are consumed; everything else accumulates
/// under whichever section is current, starting with the overview.
pub fn split_sections(text: &str, followers_count: i64) -> SummarySections {
    let mut sections = SummarySections::default();
    let mut current = SectionKey::Summary;

    for line in text.lines() {
        let lower = line.to_lowercase();
        if lower.contains("follower") && (lower.contains("analysis") || lower.contains("insight")) {
            current = SectionKey::FollowerAnalysis;
        } else if lower.contains("content")
            && (lower.contains("strategy") || lower.contains("analysis"))
        {
            current = SectionKey::ContentAnalysis;
        } else if lower.contains("engagement") {
            current = SectionKey::EngagementInsights;
        } else if lower.contains("page type") {
            current = SectionKey::PageType;
        } else {
            let target = match current {
                SectionKey::Summary => &mut sections.summary,
                SectionKey::FollowerAnalysis => &mut sections.follower_analysis,
                SectionKey::ContentAnalysis => &mut sections.content_analysis,
                SectionKey::EngagementInsights => &mut sections.engagement_insights,
                SectionKey::PageType => &mut sections.page_type,
            };
            target.push_str(line);
            target.push('\n');
        }
    }

    for section in [
        &mut sections.summary,
        &mut sections.follower_analysis,
        &mut sections.content_analysis,
        &mut sections.engagement_insights,
        &mut sections.page_type,
    ] {
        *section = section.trim().to_string();
    }

    // Nothing recognizable at all: keep the raw text readable instead of
    // returning five empty sections.
    if sections.summary.is_empty()
        && sections.follower_analysis.is_empty()
        && sections.content_analysis.is_empty()
        && sections.engagement_insights.is_empty()
        && sections.page_type.is_empty()
    {
        sections.summary = text.trim().to_string();
        sections.follower_analysis = format!("Follower base: {}", followers_count);
    }

    sections
}

#[derive(Clone, Copy)]
enum SectionKey {
    Summary,
    FollowerAnalysis,
    ContentAnalysis,
    EngagementInsights,
    PageType,
}
