//! Anthropic-backed content engine.
//!
//! Market assessment and listing generation go through the Anthropic
//! Messages API. Replies are interpreted leniently: missing keys take
//! per-field defaults and an unparseable reply degrades to a known-good
//! fallback, so a successful HTTP round trip never fails the phase.
//! Asset planning is deterministic prompt construction and never leaves
//! the process.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use hk_core::types::{
    AssetPlan, CompetitionLevel, ContentSpec, ListingCategory, ListingKind, MarketAssessment,
    MarketSignal, PricingTier,
};

use crate::traits::{CapabilityError, ContentEngine};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ASSESS_MAX_TOKENS: u32 = 2000;
const SPEC_MAX_TOKENS: u32 = 1500;

// ---------------------------------------------------------------------------
// AnthropicContentEngine
// ---------------------------------------------------------------------------

/// Content engine for the Anthropic Messages API.
pub struct AnthropicContentEngine {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicContentEngine {
    /// Create a new engine. `api_key` is the Anthropic API key
    /// (x-api-key header).
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    /// Override the base URL (useful for testing with a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the market assessment prompt from raw demand signals.
    pub fn build_assessment_prompt(signals: &[MarketSignal]) -> String {
        let rows: Vec<String> = signals
            .iter()
            .map(|s| {
                format!(
                    "- {} (source {}): trend {:.2}, avg price ${:.0}",
                    s.niche, s.source, s.trend_score, s.avg_price_usd
                )
            })
            .collect();

        format!(
            "You are an expert digital product analyst. Analyze the following demand \
             signals and decide what to build next:\n\n\
             {}\n\n\
             Decide the best niche to enter (highest opportunity with manageable \
             competition), the listing format, and a target price corridor.\n\n\
             Return your decision as a JSON object with these fields:\n\
             - niche: chosen niche name\n\
             - trend_score: 0-1 score\n\
             - competition_level: low/medium/high\n\
             - recommended_price_range: [min, max] in USD\n\
             - market_gap: 3 opportunities competitors are missing\n\
             - template_type: notion_template/canva_template/pdf_guide/excel_tool/digital_planner/business_toolkit\n",
            rows.join("\n")
        )
    }

    /// Build the listing spec prompt for an assessed niche.
    pub fn build_spec_prompt(assessment: &MarketAssessment) -> String {
        format!(
            "Create a detailed listing specification for a {kind} in the {niche} niche.\n\n\
             Analysis summary:\n\
             - Trend score: {trend:.2}\n\
             - Competition: {competition}\n\
             - Price corridor: ${floor:.0}-${ceiling:.0}\n\
             - Market gaps: {gaps}\n\n\
             Create a listing that solves a specific problem clearly, differentiates \
             from competitors, and includes all essential features for the niche.\n\n\
             Return JSON with:\n\
             - name: creative listing name\n\
             - description: compelling description (150-200 chars)\n\
             - features: list of 5-7 key features\n\
             - target_audience: specific persona\n\
             - price_tier: low/mid/high/bundle_basic/bundle_premium/bundle_all_access\n\
             - seo_keywords: 5 short search keywords\n",
            kind = assessment.recommended_kind,
            niche = assessment.niche,
            trend = assessment.trend_score,
            competition = assessment.competition,
            floor = assessment.price_floor_usd,
            ceiling = assessment.price_ceiling_usd,
            gaps = assessment.gaps.join(", "),
        )
    }

    /// Interpret a model reply as a market assessment. Missing keys take
    /// per-field defaults; a reply without a JSON object falls back
    /// wholesale to a known productivity assessment.
    pub fn parse_assessment(text: &str) -> MarketAssessment {
        let raw: Option<RawAssessment> =
            extract_json(text).and_then(|j| serde_json::from_str(j).ok());
        let Some(raw) = raw else {
            warn!("unparseable assessment reply, using fallback analysis");
            return Self::fallback_assessment();
        };

        let (floor, ceiling) = match raw.recommended_price_range.as_deref() {
            Some([min, max, ..]) => (*min, *max),
            _ => (29.0, 79.0),
        };

        MarketAssessment {
            niche: raw.niche.unwrap_or_else(|| "Productivity".to_string()),
            trend_score: raw.trend_score.unwrap_or(0.7),
            competition: parse_competition(raw.competition_level.as_deref()),
            price_floor_usd: floor,
            price_ceiling_usd: ceiling,
            gaps: raw.market_gap.unwrap_or_default(),
            recommended_kind: parse_kind(raw.template_type.as_deref()),
        }
    }

    /// Interpret a model reply as a listing spec for the assessed niche.
    pub fn parse_spec(text: &str, assessment: &MarketAssessment) -> ContentSpec {
        let raw: Option<RawSpec> = extract_json(text).and_then(|j| serde_json::from_str(j).ok());
        let Some(raw) = raw else {
            warn!(niche = %assessment.niche, "unparseable spec reply, using fallback spec");
            return Self::fallback_spec(assessment);
        };

        let category = ListingCategory::from_niche(&assessment.niche);
        let kind = assessment.recommended_kind;

        ContentSpec {
            id: Uuid::new_v4(),
            name: raw
                .name
                .unwrap_or_else(|| format!("{} Template", assessment.niche)),
            description: raw.description.unwrap_or_default(),
            kind,
            category,
            features: raw.features.unwrap_or_default(),
            target_audience: raw
                .target_audience
                .unwrap_or_else(|| "Professionals".to_string()),
            tier: parse_tier(raw.price_tier.as_deref()),
            seo_keywords: raw
                .seo_keywords
                .unwrap_or_else(|| default_keywords(category, kind)),
            created_at: Utc::now(),
        }
    }

    fn fallback_assessment() -> MarketAssessment {
        MarketAssessment {
            niche: "Productivity System".to_string(),
            trend_score: 0.75,
            competition: CompetitionLevel::Medium,
            price_floor_usd: 29.0,
            price_ceiling_usd: 79.0,
            gaps: vec![
                "Beginner-friendly".to_string(),
                "Industry-specific".to_string(),
                "Integration-ready".to_string(),
            ],
            recommended_kind: ListingKind::NotionTemplate,
        }
    }

    fn fallback_spec(assessment: &MarketAssessment) -> ContentSpec {
        let category = ListingCategory::from_niche(&assessment.niche);
        let kind = assessment.recommended_kind;
        ContentSpec {
            id: Uuid::new_v4(),
            name: format!("{} Ultimate Template", assessment.niche),
            description: format!("Complete {} solution for professionals", assessment.niche),
            kind,
            category,
            features: vec![
                "Easy setup".to_string(),
                "Comprehensive features".to_string(),
                "Regular updates".to_string(),
                "Premium support".to_string(),
            ],
            target_audience: "Busy Professionals".to_string(),
            tier: PricingTier::Mid,
            seo_keywords: default_keywords(category, kind),
            created_at: Utc::now(),
        }
    }

    async fn chat(&self, prompt: &str, max_tokens: u32) -> Result<String, CapabilityError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });
        let url = format!("{}/v1/messages", self.base_url);

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();

        if status == 429 {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(CapabilityError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CapabilityError::ApiError {
                status,
                message: text,
            });
        }

        let api_resp: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| CapabilityError::ParseError(e.to_string()))?;

        api_resp
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| CapabilityError::ParseError("no text block in response".into()))
    }
}

#[async_trait]
impl ContentEngine for AnthropicContentEngine {
    async fn assess_market(
        &self,
        signals: &[MarketSignal],
    ) -> Result<MarketAssessment, CapabilityError> {
        let prompt = Self::build_assessment_prompt(signals);
        let reply = self.chat(&prompt, ASSESS_MAX_TOKENS).await?;
        Ok(Self::parse_assessment(&reply))
    }

    async fn generate(
        &self,
        assessment: &MarketAssessment,
    ) -> Result<ContentSpec, CapabilityError> {
        let prompt = Self::build_spec_prompt(assessment);
        let reply = self.chat(&prompt, SPEC_MAX_TOKENS).await?;
        Ok(Self::parse_spec(&reply, assessment))
    }

    async fn design_assets(&self, spec: &ContentSpec) -> Result<Vec<AssetPlan>, CapabilityError> {
        Ok(plan_assets(spec))
    }
}

// ---------------------------------------------------------------------------
// Asset planning
// ---------------------------------------------------------------------------

/// Deterministic prompt plans for a listing's promotional assets: one
/// cover design plus a thumbnail per short-form channel.
pub fn plan_assets(spec: &ContentSpec) -> Vec<AssetPlan> {
    let features = spec
        .features
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        AssetPlan::new(
            "cover",
            format!(
                "Professional {} template design for {}. Clean, modern aesthetic with clear sections for {}. Target: {}",
                spec.kind, spec.category, features, spec.target_audience
            ),
            "professional",
        ),
        AssetPlan::new(
            "tiktok_thumbnail",
            format!(
                "TikTok thumbnail for {}, features: {}, bright colors, eye-catching design",
                spec.name, features
            ),
            "vibrant",
        ),
        AssetPlan::new(
            "youtube_thumbnail",
            format!(
                "YouTube thumbnail for {}, features: {}, professional YouTube style, clear text area",
                spec.name, features
            ),
            "youtube_style",
        ),
        AssetPlan::new(
            "instagram_post",
            format!(
                "Instagram post for {}, features: {}, square format, modern aesthetic, clean design",
                spec.name, features
            ),
            "instagram_style",
        ),
    ]
}

// ---------------------------------------------------------------------------
// Reply parsing helpers
// ---------------------------------------------------------------------------

/// Deserialize helpers for the Messages API response.
#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<MessagesContentBlock>,
}

#[derive(Deserialize)]
struct MessagesContentBlock {
    #[serde(rename = "type")]
    _type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct RawAssessment {
    niche: Option<String>,
    trend_score: Option<f64>,
    competition_level: Option<String>,
    recommended_price_range: Option<Vec<f64>>,
    market_gap: Option<Vec<String>>,
    template_type: Option<String>,
}

#[derive(Deserialize)]
struct RawSpec {
    name: Option<String>,
    description: Option<String>,
    features: Option<Vec<String>>,
    target_audience: Option<String>,
    price_tier: Option<String>,
    seo_keywords: Option<Vec<String>>,
}

/// Pull the first balanced JSON object out of a model reply. Replies
/// often wrap the object in prose or a code fence.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_competition(s: Option<&str>) -> CompetitionLevel {
    match s.map(|s| s.to_lowercase()).as_deref() {
        Some("low") => CompetitionLevel::Low,
        Some("high") => CompetitionLevel::High,
        _ => CompetitionLevel::Medium,
    }
}

fn parse_kind(s: Option<&str>) -> ListingKind {
    match s.map(|s| s.to_lowercase()).as_deref() {
        Some("canva_template") | Some("canva") => ListingKind::CanvaTemplate,
        Some("pdf_guide") | Some("pdf") => ListingKind::PdfGuide,
        Some("excel_tool") | Some("excel") => ListingKind::ExcelTool,
        Some("digital_planner") => ListingKind::DigitalPlanner,
        Some("business_toolkit") => ListingKind::BusinessToolkit,
        _ => ListingKind::NotionTemplate,
    }
}

fn parse_tier(s: Option<&str>) -> PricingTier {
    match s.map(|s| s.to_lowercase()).as_deref() {
        Some("low") => PricingTier::Low,
        Some("high") => PricingTier::High,
        Some("bundle_basic") => PricingTier::BundleBasic,
        Some("bundle_premium") => PricingTier::BundlePremium,
        Some("bundle_all_access") => PricingTier::BundleAllAccess,
        _ => PricingTier::Mid,
    }
}

fn default_keywords(category: ListingCategory, kind: ListingKind) -> Vec<String> {
    vec![
        category.to_string(),
        kind.to_string(),
        "template".to_string(),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
