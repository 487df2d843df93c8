use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Trade direction of a signal or a personal trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl FromStr for Side {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(DomainError::InvalidSide(s.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a signal: created `Active`, closed once to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalStatus {
    Active,
    Win,
    Loss,
    #[serde(rename = "BE")]
    BreakEven,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Active => "ACTIVE",
            SignalStatus::Win => "WIN",
            SignalStatus::Loss => "LOSS",
            SignalStatus::BreakEven => "BE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SignalStatus::Active)
    }

    /// Outcome of a closed signal, `None` while active.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            SignalStatus::Active => None,
            SignalStatus::Win => Some(Outcome::Win),
            SignalStatus::Loss => Some(Outcome::Loss),
            SignalStatus::BreakEven => Some(Outcome::BreakEven),
        }
    }
}

impl FromStr for SignalStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(SignalStatus::Active),
            "WIN" => Ok(SignalStatus::Win),
            "LOSS" => Ok(SignalStatus::Loss),
            "BE" => Ok(SignalStatus::BreakEven),
            _ => Err(DomainError::InvalidStatus(s.to_string())),
        }
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a closed trade. Personal trades are always closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Win,
    Loss,
    #[serde(rename = "BE")]
    BreakEven,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "WIN",
            Outcome::Loss => "LOSS",
            Outcome::BreakEven => "BE",
        }
    }
}

impl FromStr for Outcome {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WIN" => Ok(Outcome::Win),
            "LOSS" => Ok(Outcome::Loss),
            "BE" => Ok(Outcome::BreakEven),
            _ => Err(DomainError::InvalidStatus(s.to_string())),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorType {
    Admin,
    User,
}

impl AuthorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorType::Admin => "admin",
            AuthorType::User => "user",
        }
    }
}

/// Subscription plan stored on the user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Basic,
    Premium,
    Journal,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic => "basic",
            Plan::Premium => "premium",
            Plan::Journal => "journal",
        }
    }
}

impl FromStr for Plan {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Plan::Basic),
            "premium" => Ok(Plan::Premium),
            "journal" => Ok(Plan::Journal),
            _ => Err(DomainError::InvalidPlan(s.to_string())),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a reaction is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionTarget {
    Message,
    Signal,
}

impl ReactionTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionTarget::Message => "message",
            ReactionTarget::Signal => "signal",
        }
    }
}

/// Per-emoji reaction tally as seen by one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionCount {
    pub emoji: String,
    pub count: u64,
    pub reacted: bool,
}

/// Per-emoji tally with no caller in mind, as broadcast to every
/// subscriber of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionTally {
    pub emoji: String,
    pub count: u64,
}

impl From<&ReactionCount> for ReactionTally {
    fn from(c: &ReactionCount) -> Self {
        ReactionTally {
            emoji: c.emoji.clone(),
            count: c.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parse_is_case_insensitive() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!(" SELL ".parse::<Side>().unwrap(), Side::Sell);
        assert!("long".parse::<Side>().is_err());
    }

    #[test]
    fn test_signal_status_round_trip_through_storage_text() {
        for status in [
            SignalStatus::Active,
            SignalStatus::Win,
            SignalStatus::Loss,
            SignalStatus::BreakEven,
        ] {
            assert_eq!(status.as_str().parse::<SignalStatus>().unwrap(), status);
        }
        assert_eq!(SignalStatus::Active.outcome(), None);
        assert_eq!(SignalStatus::BreakEven.outcome(), Some(Outcome::BreakEven));
    }

    #[test]
    fn test_status_serializes_as_wire_text() {
        assert_eq!(serde_json::to_string(&SignalStatus::BreakEven).unwrap(), "\"BE\"");
        assert_eq!(serde_json::to_string(&Outcome::Win).unwrap(), "\"WIN\"");
        assert_eq!(serde_json::to_string(&Plan::Premium).unwrap(), "\"premium\"");
    }

    #[test]
    fn test_tally_drops_caller_flag() {
        let count = ReactionCount {
            emoji: "🔥".into(),
            count: 2,
            reacted: true,
        };
        let json = serde_json::to_value(ReactionTally::from(&count)).unwrap();
        assert_eq!(json, serde_json::json!({ "emoji": "🔥", "count": 2 }));
    }

    #[test]
    fn test_plan_rejects_unknown() {
        assert!(matches!("gold".parse::<Plan>(), Err(DomainError::InvalidPlan(_))));
    }
}
