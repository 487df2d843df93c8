//! Push notification delivery.
//!
//! One provider call per token, in order. A failing token is recorded and
//! the loop moves on; nothing is batched or retried.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use shared::entity::signals;
use shared::Money;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::services::push_tokens;

/// Provider error codes meaning the token will never work again.
pub const INVALID_TOKEN_CODES: &[&str] = &[
    "UNREGISTERED",
    "INVALID_ARGUMENT",
    "messaging/registration-token-not-registered",
    "messaging/invalid-registration-token",
];

pub const PUSH_DISABLED: &str = "push-disabled";

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// All values are strings on the wire.
    pub data: BTreeMap<String, String>,
    /// Android notification channel.
    pub android_channel: String,
}

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct PushError {
    pub message: String,
    pub code: Option<String>,
}

impl PushError {
    pub fn new(message: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            message: message.into(),
            code: code.map(str::to_string),
        }
    }

    pub fn is_invalid_token(&self) -> bool {
        self.code
            .as_deref()
            .map_or(false, |c| INVALID_TOKEN_CODES.contains(&c))
    }
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Deliver to one device. Returns the provider's message id.
    async fn send(&self, token: &str, notification: &Notification) -> Result<String, PushError>;
    fn name(&self) -> &str;
}

/// Firebase Cloud Messaging HTTP v1.
pub struct FcmProvider {
    client: reqwest::Client,
    send_url: String,
    access_token: String,
    icon: String,
}

impl FcmProvider {
    pub fn new(send_url: String, access_token: String, icon: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            send_url,
            access_token,
            icon,
        }
    }

    fn payload(&self, token: &str, n: &Notification) -> Value {
        json!({
            "message": {
                "token": token,
                "notification": { "title": n.title, "body": n.body },
                "data": n.data,
                "android": {
                    "priority": "high",
                    "notification": { "sound": "default", "channel_id": n.android_channel }
                },
                "apns": {
                    "payload": { "aps": { "sound": "default", "badge": 1 } }
                },
                "webpush": {
                    "notification": {
                        "title": n.title,
                        "body": n.body,
                        "icon": self.icon,
                        "badge": self.icon
                    }
                }
            }
        })
    }
}

/// Pull the most specific error code out of an FCM error body.
fn fcm_error_code(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    let detail_code = error
        .get("details")
        .and_then(Value::as_array)
        .and_then(|details| {
            details
                .iter()
                .find_map(|d| d.get("errorCode").and_then(Value::as_str))
        });
    detail_code
        .or_else(|| error.get("status").and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send(&self, token: &str, notification: &Notification) -> Result<String, PushError> {
        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(&self.access_token)
            .json(&self.payload(token, notification))
            .send()
            .await
            .map_err(|e| PushError::new(format!("FCM request failed: {}", e), None))?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            let name = body
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Ok(name);
        }

        let message = body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("FCM returned {}", status));
        Err(PushError {
            message,
            code: fcm_error_code(&body),
        })
    }

    fn name(&self) -> &str {
        "fcm"
    }
}

/// Stand-in when no push credentials are configured.
pub struct DisabledProvider;

#[async_trait]
impl PushProvider for DisabledProvider {
    async fn send(&self, _token: &str, _notification: &Notification) -> Result<String, PushError> {
        Err(PushError::new("Push delivery is not configured", Some(PUSH_DISABLED)))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResult {
    pub token: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub invalid_token: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanOutReport {
    pub success: bool,
    pub success_count: usize,
    pub failure_count: usize,
    pub invalid_tokens: Vec<String>,
    pub responses: Vec<PushResult>,
}

pub async fn fan_out(
    provider: &dyn PushProvider,
    tokens: &[String],
    notification: &Notification,
) -> FanOutReport {
    let mut responses = Vec::with_capacity(tokens.len());
    let mut success_count = 0;
    let mut failure_count = 0;
    let mut invalid_tokens = Vec::new();

    for token in tokens {
        match provider.send(token, notification).await {
            Ok(message_id) => {
                success_count += 1;
                responses.push(PushResult {
                    token: token.clone(),
                    success: true,
                    message_id: Some(message_id),
                    error: None,
                    code: None,
                    invalid_token: false,
                });
            }
            Err(err) => {
                failure_count += 1;
                let invalid = err.is_invalid_token();
                if invalid {
                    warn!("⚠️ Invalid push token {}: {}", mask_token(token), err);
                    invalid_tokens.push(token.clone());
                } else {
                    error!("❌ Push to {} failed: {}", mask_token(token), err);
                }
                responses.push(PushResult {
                    token: token.clone(),
                    success: false,
                    message_id: None,
                    error: Some(err.message),
                    code: err.code,
                    invalid_token: invalid,
                });
            }
        }
    }

    info!(
        "📣 '{}' via {}: {} sent, {} failed",
        notification.title,
        provider.name(),
        success_count,
        failure_count
    );
    FanOutReport {
        success: true,
        success_count,
        failure_count,
        invalid_tokens,
        responses,
    }
}

/// Fan a notification out to every registered device in the background.
pub fn spawn_broadcast(
    db: Arc<DatabaseConnection>,
    provider: Arc<dyn PushProvider>,
    notification: Notification,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match push_tokens::all_tokens(&db).await {
            Ok(tokens) if tokens.is_empty() => {
                debug!("📣 No registered devices for '{}'", notification.title);
            }
            Ok(tokens) => {
                fan_out(provider.as_ref(), &tokens, &notification).await;
            }
            Err(e) => error!("❌ Could not load push tokens: {}", e),
        }
    })
}

fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Signal fields as sent by clients. Numeric fields may arrive as JSON
/// numbers or strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalPayload {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(default, alias = "channelId")]
    pub channel_id: Option<String>,
    #[serde(default, rename = "type")]
    pub side: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub entry: Option<String>,
    #[serde(default, alias = "takeProfit", deserialize_with = "lenient_text")]
    pub take_profit: Option<String>,
    #[serde(default, alias = "stopLoss", deserialize_with = "lenient_text")]
    pub stop_loss: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub pnl: Option<String>,
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl From<&signals::Model> for SignalPayload {
    fn from(s: &signals::Model) -> Self {
        SignalPayload {
            id: Some(s.id.to_string()),
            channel_id: Some(s.channel_id.clone()),
            side: Some(s.signal_type.clone()),
            symbol: Some(s.symbol.clone()),
            entry: Some(s.entry.clone()),
            take_profit: Some(s.take_profit.clone()),
            stop_loss: Some(s.stop_loss.clone()),
            status: Some(s.status.clone()),
            pnl: s
                .pnl
                .as_deref()
                .map(|p| Money::parse_lenient(p).signed_display()),
        }
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

pub fn new_signal_notification(signal: &SignalPayload) -> Notification {
    let mut data = BTreeMap::new();
    data.insert("signalId".to_string(), text(&signal.id));
    data.insert("channelId".to_string(), text(&signal.channel_id));
    data.insert("type".to_string(), "new_signal".to_string());
    data.insert("symbol".to_string(), text(&signal.symbol));
    data.insert("signalType".to_string(), text(&signal.side));

    Notification {
        title: "Signal Trade".to_string(),
        body: format!(
            "{} {} - Entrée: {} | TP: {} | SL: {}",
            text(&signal.side),
            text(&signal.symbol),
            text(&signal.entry),
            text(&signal.take_profit),
            text(&signal.stop_loss)
        ),
        data,
        android_channel: "signals".to_string(),
    }
}

pub fn closure_notification(signal: &SignalPayload) -> Notification {
    let status = text(&signal.status).to_uppercase();
    let label = match status.as_str() {
        "WIN" => "GAGNANT",
        "LOSS" => "PERDANT",
        _ => "BREAK-EVEN",
    };
    let pnl = signal.pnl.clone().filter(|p| !p.is_empty());
    let body = match (&pnl, status.as_str()) {
        (Some(pnl), s) if s != "BE" => format!("{} - P&L: {}", text(&signal.symbol), pnl),
        _ => format!("{} - Break-Even", text(&signal.symbol)),
    };

    let mut data = BTreeMap::new();
    data.insert("signalId".to_string(), text(&signal.id));
    data.insert("channelId".to_string(), text(&signal.channel_id));
    data.insert("type".to_string(), "signal_closed".to_string());
    data.insert("symbol".to_string(), text(&signal.symbol));
    data.insert("status".to_string(), status.clone());
    data.insert("pnl".to_string(), pnl.unwrap_or_default());

    Notification {
        title: format!("Signal Clôturé - {}", label),
        body,
        data,
        android_channel: "signals".to_string(),
    }
}

pub fn livestream_notification(custom_message: Option<&str>) -> Notification {
    let body = custom_message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("Le livestream démarre dans 5 minutes !")
        .to_string();
    let mut data = BTreeMap::new();
    data.insert("type".to_string(), "livestream_start".to_string());
    data.insert("channelId".to_string(), "video".to_string());

    Notification {
        title: "🔴 Livestream Start 5 min".to_string(),
        body,
        data,
        android_channel: "livestream".to_string(),
    }
}
