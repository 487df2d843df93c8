//! Channel catalog and plan-based access rules.

use serde::Serialize;

use crate::error::DomainError;
use crate::models::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Education,
    Signals,
    Journal,
    Calendar,
    Livestream,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Channel {
    pub id: &'static str,
    pub emoji: &'static str,
    pub name: &'static str,
    pub kind: ChannelKind,
}

impl Channel {
    /// Channels that carry a chat message stream.
    pub fn has_messages(&self) -> bool {
        matches!(self.kind, ChannelKind::Education | ChannelKind::Signals)
            || self.id == "trading-journal"
    }

    pub fn has_signals(&self) -> bool {
        self.kind == ChannelKind::Signals
    }
}

pub const CHANNELS: &[Channel] = &[
    Channel { id: "fondamentaux", emoji: "📚", name: "Fondamentaux", kind: ChannelKind::Education },
    Channel { id: "letsgooo-model", emoji: "🚀", name: "Letsgooo model", kind: ChannelKind::Education },
    Channel { id: "general-chat-2", emoji: "📊", name: "Indices", kind: ChannelKind::Signals },
    Channel { id: "general-chat-3", emoji: "🪙", name: "Crypto", kind: ChannelKind::Signals },
    Channel { id: "general-chat-4", emoji: "💱", name: "Forex", kind: ChannelKind::Signals },
    Channel { id: "trading-journal", emoji: "📝", name: "Trading journal", kind: ChannelKind::Journal },
    Channel { id: "calendrier", emoji: "📅", name: "Journal signaux", kind: ChannelKind::Calendar },
    Channel { id: "journal", emoji: "📓", name: "Journal perso", kind: ChannelKind::Journal },
    Channel { id: "video", emoji: "🎥", name: "Livestream", kind: ChannelKind::Livestream },
    Channel { id: "livestream-premium", emoji: "🔴", name: "Livestream premium", kind: ChannelKind::Livestream },
];

pub fn find_channel(id: &str) -> Result<&'static Channel, DomainError> {
    CHANNELS
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| DomainError::UnknownChannel(id.to_string()))
}

/// Channel ids a plan unlocks.
pub fn plan_channels(plan: Plan) -> &'static [&'static str] {
    match plan {
        Plan::Basic => &[
            "fondamentaux",
            "general-chat-2",
            "general-chat-3",
            "general-chat-4",
            "trading-journal",
            "calendrier",
            "journal",
        ],
        Plan::Premium => &[
            "fondamentaux",
            "letsgooo-model",
            "general-chat-2",
            "general-chat-3",
            "general-chat-4",
            "trading-journal",
            "calendrier",
            "journal",
            "video",
            "livestream-premium",
        ],
        // calendrier is not part of the journal plan
        Plan::Journal => &["journal", "trading-journal"],
    }
}

pub fn has_channel_access(plan: Option<Plan>, is_admin: bool, channel_id: &str) -> bool {
    if is_admin {
        return CHANNELS.iter().any(|c| c.id == channel_id);
    }
    match plan {
        Some(plan) => plan_channels(plan).contains(&channel_id),
        None => false,
    }
}

/// Catalog entries visible to a user, in display order.
pub fn accessible_channels(plan: Option<Plan>, is_admin: bool) -> Vec<&'static Channel> {
    CHANNELS
        .iter()
        .filter(|c| has_channel_access(plan, is_admin, c.id))
        .collect()
}
