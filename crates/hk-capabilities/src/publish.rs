//! HTTP publishers for the sales targets.
//!
//! Each target is described by a [`PlatformProfile`]: endpoint, auth
//! style, create payload and response shape. [`HttpPublisher`] drives
//! one profile and enforces its daily publish cap; only successful
//! publishes count against the cap, and the counter resets when the
//! calendar day rolls over.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::info;

use hk_core::types::{DeploymentRecord, ListingDraft};

use crate::traits::{CapabilityError, Publisher};

const ETSY_TITLE_MAX: usize = 140;
const ETSY_TAG_MAX: usize = 13;
/// Etsy taxonomy node for digital downloads.
const ETSY_TAXONOMY_ID: u32 = 66;

// ---------------------------------------------------------------------------
// PlatformProfile
// ---------------------------------------------------------------------------

/// Wire-level description of one sales target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformProfile {
    Gumroad,
    LemonSqueezy,
    Etsy,
    Payhip,
}

impl PlatformProfile {
    /// Look up a profile by its config target name.
    pub fn named(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "gumroad" => Some(PlatformProfile::Gumroad),
            "lemonsqueezy" | "lemon_squeezy" => Some(PlatformProfile::LemonSqueezy),
            "etsy" => Some(PlatformProfile::Etsy),
            "payhip" => Some(PlatformProfile::Payhip),
            _ => None,
        }
    }

    pub fn target_name(&self) -> &'static str {
        match self {
            PlatformProfile::Gumroad => "gumroad",
            PlatformProfile::LemonSqueezy => "lemonsqueezy",
            PlatformProfile::Etsy => "etsy",
            PlatformProfile::Payhip => "payhip",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            PlatformProfile::Gumroad => "https://api.gumroad.com/v2",
            PlatformProfile::LemonSqueezy => "https://api.lemonsqueezy.com/v1",
            PlatformProfile::Etsy => "https://openapi.etsy.com/v3",
            PlatformProfile::Payhip => "https://api.payhip.com/v1",
        }
    }

    fn endpoint(&self, base_url: &str) -> String {
        match self {
            PlatformProfile::Gumroad | PlatformProfile::LemonSqueezy => {
                format!("{base_url}/products")
            }
            PlatformProfile::Etsy => format!("{base_url}/applications/listings"),
            PlatformProfile::Payhip => format!("{base_url}/product"),
        }
    }

    /// Build the JSON create payload for `draft`.
    pub fn build_request_body(&self, draft: &ListingDraft) -> serde_json::Value {
        match self {
            PlatformProfile::Gumroad => serde_json::json!({
                "name": draft.name,
                "description": draft.description,
                "price": draft.price_usd,
                "currency": "USD",
                "custom_permalink": "",
                "tags": draft.seo_keywords,
            }),
            PlatformProfile::LemonSqueezy => serde_json::json!({
                "data": {
                    "type": "products",
                    "attributes": {
                        "name": draft.name,
                        "description": draft.description,
                        "price": draft.price_usd,
                        "currency": "USD",
                        "status": "published",
                    }
                }
            }),
            PlatformProfile::Etsy => {
                let title: String = draft.name.chars().take(ETSY_TITLE_MAX).collect();
                let tags: Vec<&String> = draft.seo_keywords.iter().take(ETSY_TAG_MAX).collect();
                serde_json::json!({
                    "quantity": 1,
                    "title": title,
                    "description": draft.description,
                    "price": draft.price_usd,
                    "currency_code": "USD",
                    "taxonomy_id": ETSY_TAXONOMY_ID,
                    "tags": tags,
                    "who_made": "i_did",
                    "when_made": "2020_2024",
                    "is_supply": true,
                    "processing_time": "1-3 days",
                })
            }
            PlatformProfile::Payhip => serde_json::json!({
                "name": draft.name,
                "desc": draft.description,
                "price": draft.price_usd,
                "type": "digital",
            }),
        }
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        match self {
            PlatformProfile::LemonSqueezy => req
                .header("Authorization", format!("Bearer {api_key}"))
                .header("Content-Type", "application/vnd.api+json")
                .header("Accept", "application/vnd.api+json"),
            PlatformProfile::Etsy => req
                .header("Authorization", format!("Bearer {api_key}"))
                .header("x-api-key", api_key),
            _ => req.header("Authorization", format!("Bearer {api_key}")),
        }
    }

    /// Pull the listing reference (URL or id) out of a create response.
    pub fn parse_reference(&self, body: &serde_json::Value) -> Result<String, CapabilityError> {
        match self {
            PlatformProfile::Gumroad => body["product"]["url"]
                .as_str()
                .map(str::to_string)
                .or_else(|| body["product"]["id"].as_str().map(str::to_string))
                .ok_or_else(|| {
                    CapabilityError::ParseError("gumroad response missing product.url".into())
                }),
            PlatformProfile::LemonSqueezy => body["data"]["attributes"]["buy_url"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or_else(|| body["data"]["id"].as_str().map(str::to_string))
                .ok_or_else(|| {
                    CapabilityError::ParseError("lemonsqueezy response missing data.id".into())
                }),
            PlatformProfile::Etsy => {
                let id = body["listing_id"]
                    .as_u64()
                    .map(|v| v.to_string())
                    .or_else(|| body["listing_id"].as_str().map(str::to_string));
                id.map(|id| format!("https://www.etsy.com/listing/{id}"))
                    .ok_or_else(|| {
                        CapabilityError::ParseError("etsy response missing listing_id".into())
                    })
            }
            PlatformProfile::Payhip => body["url"]
                .as_str()
                .map(str::to_string)
                .or_else(|| body["id"].as_str().map(str::to_string))
                .ok_or_else(|| {
                    CapabilityError::ParseError("payhip response missing url".into())
                }),
        }
    }
}

// ---------------------------------------------------------------------------
// HttpPublisher
// ---------------------------------------------------------------------------

/// Publisher that drives one platform profile over HTTP.
pub struct HttpPublisher {
    profile: PlatformProfile,
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    daily_cap: u32,
    published: Mutex<(NaiveDate, u32)>,
}

impl HttpPublisher {
    pub fn new(
        profile: PlatformProfile,
        api_key: impl Into<String>,
        daily_cap: u32,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            profile,
            client,
            api_key: api_key.into(),
            base_url: profile.default_base_url().to_string(),
            daily_cap,
            published: Mutex::new((Utc::now().date_naive(), 0)),
        }
    }

    /// Override the base URL (useful for testing with a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Successful publishes recorded for the current calendar day.
    pub fn published_today(&self) -> u32 {
        let slot = self.published.lock().unwrap_or_else(|e| e.into_inner());
        if slot.0 == Utc::now().date_naive() {
            slot.1
        } else {
            0
        }
    }

    fn check_cap(&self) -> Result<(), CapabilityError> {
        let mut slot = self.published.lock().unwrap_or_else(|e| e.into_inner());
        let today = Utc::now().date_naive();
        if slot.0 != today {
            *slot = (today, 0);
        }
        if slot.1 >= self.daily_cap {
            return Err(CapabilityError::CapExhausted {
                target: self.profile.target_name().to_string(),
                cap: self.daily_cap,
            });
        }
        Ok(())
    }

    fn record_success(&self) {
        let mut slot = self.published.lock().unwrap_or_else(|e| e.into_inner());
        let today = Utc::now().date_naive();
        if slot.0 != today {
            *slot = (today, 0);
        }
        slot.1 += 1;
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    fn target(&self) -> &str {
        self.profile.target_name()
    }

    async fn publish(&self, draft: &ListingDraft) -> Result<DeploymentRecord, CapabilityError> {
        self.check_cap()?;

        let body = self.profile.build_request_body(draft);
        let url = self.profile.endpoint(&self.base_url);

        let resp = self
            .profile
            .apply_auth(self.client.post(&url), &self.api_key)
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

        let reply: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CapabilityError::ParseError(e.to_string()))?;

        let reference = self.profile.parse_reference(&reply)?;
        self.record_success();
        info!(
            target = self.profile.target_name(),
            reference = %reference,
            "listing published"
        );

        Ok(DeploymentRecord::success(
            self.profile.target_name(),
            reference,
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hk_core::types::{ContentSpec, ListingDraft};

    fn sample_draft() -> ListingDraft {
        let spec = ContentSpec::placeholder("AI Productivity");
        ListingDraft::from_spec(&spec, 49.0, vec!["en".to_string()])
    }

    #[test]
    fn profile_lookup_by_name() {
        assert_eq!(PlatformProfile::named("gumroad"), Some(PlatformProfile::Gumroad));
        assert_eq!(PlatformProfile::named("Lemon_Squeezy"), Some(PlatformProfile::LemonSqueezy));
        assert_eq!(PlatformProfile::named("ETSY"), Some(PlatformProfile::Etsy));
        assert_eq!(PlatformProfile::named("shopify"), None);
    }

    #[test]
    fn gumroad_payload_shape() {
        let body = PlatformProfile::Gumroad.build_request_body(&sample_draft());
        assert_eq!(body["name"], "AI Productivity Template");
        assert_eq!(body["price"], 49.0);
        assert_eq!(body["currency"], "USD");
        assert!(body["tags"].as_array().unwrap().len() >= 3);
    }

    #[test]
    fn lemonsqueezy_payload_is_json_api() {
        let body = PlatformProfile::LemonSqueezy.build_request_body(&sample_draft());
        assert_eq!(body["data"]["type"], "products");
        assert_eq!(body["data"]["attributes"]["status"], "published");
        assert_eq!(body["data"]["attributes"]["price"], 49.0);
    }

    #[test]
    fn etsy_payload_truncates_title_and_tags() {
        let mut draft = sample_draft();
        draft.name = "x".repeat(200);
        draft.seo_keywords = (0..20).map(|i| format!("tag{i}")).collect();

        let body = PlatformProfile::Etsy.build_request_body(&draft);
        assert_eq!(body["title"].as_str().unwrap().len(), 140);
        assert_eq!(body["tags"].as_array().unwrap().len(), 13);
        assert_eq!(body["taxonomy_id"], 66);
        assert_eq!(body["who_made"], "i_did");
        assert_eq!(body["quantity"], 1);
    }

    #[test]
    fn payhip_payload_is_digital() {
        let body = PlatformProfile::Payhip.build_request_body(&sample_draft());
        assert_eq!(body["type"], "digital");
        assert_eq!(body["desc"], sample_draft().description);
    }

    #[test]
    fn gumroad_reference_from_product_url() {
        let body = serde_json::json!({"product": {"id": "abc", "url": "https://gum.co/abc"}});
        let r = PlatformProfile::Gumroad.parse_reference(&body).unwrap();
        assert_eq!(r, "https://gum.co/abc");

        let body = serde_json::json!({"product": {"id": "abc"}});
        let r = PlatformProfile::Gumroad.parse_reference(&body).unwrap();
        assert_eq!(r, "abc");

        assert!(PlatformProfile::Gumroad
            .parse_reference(&serde_json::json!({}))
            .is_err());
    }

    #[test]
    fn lemonsqueezy_reference_prefers_buy_url() {
        let body = serde_json::json!({
            "data": {"id": "77", "attributes": {"buy_url": "https://store.lemonsqueezy.com/buy/x"}}
        });
        let r = PlatformProfile::LemonSqueezy.parse_reference(&body).unwrap();
        assert_eq!(r, "https://store.lemonsqueezy.com/buy/x");

        let body = serde_json::json!({"data": {"id": "77", "attributes": {"buy_url": ""}}});
        let r = PlatformProfile::LemonSqueezy.parse_reference(&body).unwrap();
        assert_eq!(r, "77");
    }

    #[test]
    fn etsy_reference_builds_listing_url() {
        let body = serde_json::json!({"listing_id": 12345});
        let r = PlatformProfile::Etsy.parse_reference(&body).unwrap();
        assert_eq!(r, "https://www.etsy.com/listing/12345");
    }

    #[test]
    fn payhip_reference_from_url() {
        let body = serde_json::json!({"id": "p1", "url": "https://payhip.com/b/p1"});
        let r = PlatformProfile::Payhip.parse_reference(&body).unwrap();
        assert_eq!(r, "https://payhip.com/b/p1");
    }

    #[test]
    fn cap_blocks_after_daily_limit() {
        let publisher = HttpPublisher::new(
            PlatformProfile::Gumroad,
            "key",
            2,
            Duration::from_secs(5),
        );
        assert!(publisher.check_cap().is_ok());
        publisher.record_success();
        publisher.record_success();
        assert_eq!(publisher.published_today(), 2);

        let err = publisher.check_cap().unwrap_err();
        assert!(matches!(err, CapabilityError::CapExhausted { cap: 2, .. }));
    }

    #[test]
    fn cap_resets_on_new_day() {
        let publisher = HttpPublisher::new(
            PlatformProfile::Etsy,
            "key",
            1,
            Duration::from_secs(5),
        );
        let yesterday = Utc::now().date_naive().pred_opt().unwrap();
        *publisher.published.lock().unwrap() = (yesterday, 5);

        assert_eq!(publisher.published_today(), 0);
        assert!(publisher.check_cap().is_ok());
    }
}
