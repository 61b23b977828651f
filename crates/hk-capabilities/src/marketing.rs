//! Launch campaigns across marketing channels.
//!
//! TikTok, YouTube and email campaigns are content-only: the copy is
//! rendered and returned as `Prepared` for manual posting. Telegram and
//! Discord deliver for real when their credentials are set; without
//! credentials they degrade to `Prepared` like the rest.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use hk_core::types::{CampaignOutcome, CampaignStatus, Channel, ListingDraft};

use crate::traits::{CapabilityError, MarketingDispatcher};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const TIKTOK_TAGS: [&str; 4] = ["#fyp", "#viral", "#trending", "#template"];
const YOUTUBE_TAGS: [&str; 3] = ["#youtubeshorts", "#shorts", "#viralvideo"];

/// Drip sequence sent after the launch email, as (day, subject).
const EMAIL_FOLLOW_UPS: [(u8, &str); 3] = [
    (1, "Did you see our new template? 🎁"),
    (3, "Last chance for launch discount! ⏰"),
    (7, "Missed it? Here's another chance 💫"),
];

// ---------------------------------------------------------------------------
// Copy builders
// ---------------------------------------------------------------------------

pub fn tiktok_hashtags(draft: &ListingDraft) -> Vec<String> {
    let mut tags: Vec<String> = draft.seo_keywords.clone();
    tags.extend(TIKTOK_TAGS.iter().map(|t| t.to_string()));
    tags
}

pub fn youtube_hashtags(draft: &ListingDraft) -> Vec<String> {
    let mut tags: Vec<String> = draft.seo_keywords.clone();
    tags.extend(YOUTUBE_TAGS.iter().map(|t| t.to_string()));
    tags
}

pub fn tiktok_script(draft: &ListingDraft) -> String {
    let features = draft
        .features
        .iter()
        .take(3)
        .map(|f| format!("- {f}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "(0-3s): \"Stop scrolling! 😱 This {category} will change your life!\"\n\n\
         (3-8s): \"Look at these features:\"\n{features}\n\n\
         (8-12s): \"It costs only ${price:.2} but saves you hours of work!\"\n\n\
         (12-15s): \"Link in bio to get yours now! ⬆️\"",
        category = draft.category,
        price = draft.price_usd,
    )
}

pub fn youtube_title(draft: &ListingDraft) -> String {
    format!("{} - Quick Demo", draft.name)
}

pub fn youtube_description(draft: &ListingDraft) -> String {
    let features = draft
        .features
        .iter()
        .take(5)
        .map(|f| format!("• {f}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Check out this {category}!\n\n\
         ⭐ Key Features:\n{features}\n\n\
         💰 Price: ${price:.2}\n\n\
         📥 Get it here: [Link]\n\n\
         #template #digital #productivity #ai",
        category = draft.category,
        price = draft.price_usd,
    )
}

pub fn telegram_message(draft: &ListingDraft) -> String {
    let features = draft
        .features
        .iter()
        .take(5)
        .map(|f| format!("• {f}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "🚀 *New Template Released!*\n\n\
         📌 *{name}*\n\n\
         💰 Price: ${price:.2}\n\n\
         📝 Description:\n{description}\n\n\
         ✨ Key Features:\n{features}\n\n\
         🔗 Buy link: coming soon\n\n\
         #template #digital",
        name = draft.name,
        price = draft.price_usd,
        description = draft.description,
    )
}

pub fn discord_embed(draft: &ListingDraft) -> serde_json::Value {
    json!({
        "title": "🎉 New Template Released!",
        "description": draft.name,
        "color": 0x00FF00,
        "fields": [
            {"name": "💰 Price", "value": format!("${:.2}", draft.price_usd), "inline": true},
            {"name": "🏷️ Category", "value": draft.category.to_string(), "inline": true},
            {"name": "🔗 Links", "value": "[Gumroad](link) | [Etsy](link) | [Website](link)"},
        ],
        "footer": {"text": "Template Automation System"},
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

pub fn launch_email_subject(draft: &ListingDraft) -> String {
    format!("🚀 NEW: {} is here!", draft.name)
}

// ---------------------------------------------------------------------------
// ChannelDispatcher
// ---------------------------------------------------------------------------

/// Marketing dispatcher over a fixed channel list.
pub struct ChannelDispatcher {
    client: reqwest::Client,
    channels: Vec<Channel>,
    telegram_token: Option<String>,
    telegram_chat_id: Option<String>,
    discord_webhook: Option<String>,
    telegram_api_base: String,
}

impl ChannelDispatcher {
    pub fn new(channels: Vec<Channel>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            channels,
            telegram_token: None,
            telegram_chat_id: None,
            discord_webhook: None,
            telegram_api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// Enable live Telegram delivery.
    pub fn with_telegram(mut self, token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        self.telegram_token = Some(token.into());
        self.telegram_chat_id = Some(chat_id.into());
        self
    }

    /// Enable live Discord delivery.
    pub fn with_discord(mut self, webhook_url: impl Into<String>) -> Self {
        self.discord_webhook = Some(webhook_url.into());
        self
    }

    pub fn with_telegram_api_base(mut self, base: impl Into<String>) -> Self {
        self.telegram_api_base = base.into();
        self
    }

    async fn send_telegram(
        &self,
        token: &str,
        chat_id: &str,
        draft: &ListingDraft,
    ) -> Result<(), String> {
        let url = format!("{}/bot{token}/sendMessage", self.telegram_api_base);
        let body = json!({
            "chat_id": chat_id,
            "text": telegram_message(draft),
            "parse_mode": "Markdown",
        });
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!(
                "telegram responded with status {}",
                response.status().as_u16()
            ))
        }
    }

    async fn send_discord(&self, webhook: &str, draft: &ListingDraft) -> Result<(), String> {
        let body = json!({ "embeds": [discord_embed(draft)] });
        let response = self
            .client
            .post(webhook)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!(
                "discord responded with status {}",
                response.status().as_u16()
            ))
        }
    }

    async fn run_channel(&self, channel: Channel, draft: &ListingDraft) -> CampaignOutcome {
        match channel {
            Channel::Tiktok => CampaignOutcome {
                channel,
                status: CampaignStatus::Prepared,
                detail: format!(
                    "script prepared, hashtags: {}",
                    tiktok_hashtags(draft).join(" ")
                ),
            },
            Channel::Youtube => CampaignOutcome {
                channel,
                status: CampaignStatus::Prepared,
                detail: format!("shorts prepared: {}", youtube_title(draft)),
            },
            Channel::Telegram => match (&self.telegram_token, &self.telegram_chat_id) {
                (Some(token), Some(chat_id)) => {
                    match self.send_telegram(token, chat_id, draft).await {
                        Ok(()) => CampaignOutcome {
                            channel,
                            status: CampaignStatus::Sent,
                            detail: "announcement delivered".to_string(),
                        },
                        Err(e) => {
                            warn!(error = %e, "telegram delivery failed");
                            CampaignOutcome {
                                channel,
                                status: CampaignStatus::Failed,
                                detail: e,
                            }
                        }
                    }
                }
                _ => CampaignOutcome {
                    channel,
                    status: CampaignStatus::Prepared,
                    detail: "bot token not configured, announcement prepared".to_string(),
                },
            },
            Channel::Discord => match &self.discord_webhook {
                Some(webhook) => match self.send_discord(webhook, draft).await {
                    Ok(()) => CampaignOutcome {
                        channel,
                        status: CampaignStatus::Sent,
                        detail: "embed delivered".to_string(),
                    },
                    Err(e) => {
                        warn!(error = %e, "discord delivery failed");
                        CampaignOutcome {
                            channel,
                            status: CampaignStatus::Failed,
                            detail: e,
                        }
                    }
                },
                None => CampaignOutcome {
                    channel,
                    status: CampaignStatus::Prepared,
                    detail: "webhook not configured, embed prepared".to_string(),
                },
            },
            Channel::Email => CampaignOutcome {
                channel,
                status: CampaignStatus::Prepared,
                detail: format!(
                    "launch email '{}' and {} follow-ups prepared",
                    launch_email_subject(draft),
                    EMAIL_FOLLOW_UPS.len()
                ),
            },
        }
    }
}

#[async_trait]
impl MarketingDispatcher for ChannelDispatcher {
    fn channels(&self) -> Vec<Channel> {
        self.channels.clone()
    }

    async fn launch(&self, draft: &ListingDraft) -> Result<Vec<CampaignOutcome>, CapabilityError> {
        let mut outcomes = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            outcomes.push(self.run_channel(*channel, draft).await);
        }
        info!(
            listing = %draft.name,
            campaigns = outcomes.len(),
            sent = outcomes
                .iter()
                .filter(|o| o.status == CampaignStatus::Sent)
                .count(),
            "marketing launch complete"
        );
        Ok(outcomes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
