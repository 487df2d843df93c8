//! In-process event hub behind the SSE streams.
//!
//! Each topic keeps a broadcast sender plus a capped backlog of its most
//! recent events. Events carry a per-topic sequence number starting at 1, so
//! a subscriber that reconnects with `after=<seq>` gets the missed events
//! replayed and never sees one twice.
//!
//! The number of topics is capped. Creating a topic past the cap evicts the
//! least recently used topic that has no subscribers; its backlog and
//! sequence are lost.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MessageCreated,
    MessageUpdated,
    MessageDeleted,
    SignalCreated,
    SignalUpdated,
    SignalDeleted,
    ReactionChanged,
    TradeCreated,
    TradeUpdated,
    TradeDeleted,
    AccountCreated,
    AccountUpdated,
    AccountDeleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MessageCreated => "message_created",
            EventKind::MessageUpdated => "message_updated",
            EventKind::MessageDeleted => "message_deleted",
            EventKind::SignalCreated => "signal_created",
            EventKind::SignalUpdated => "signal_updated",
            EventKind::SignalDeleted => "signal_deleted",
            EventKind::ReactionChanged => "reaction_changed",
            EventKind::TradeCreated => "trade_created",
            EventKind::TradeUpdated => "trade_updated",
            EventKind::TradeDeleted => "trade_deleted",
            EventKind::AccountCreated => "account_created",
            EventKind::AccountUpdated => "account_updated",
            EventKind::AccountDeleted => "account_deleted",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub seq: u64,
    pub topic: String,
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub at: DateTime<Utc>,
}

pub fn channel_topic(channel_id: &str) -> String {
    format!("channel:{}", channel_id)
}

pub fn journal_topic(user_id: i32) -> String {
    format!("journal:{}", user_id)
}

pub const DEFAULT_MAX_TOPICS: usize = 4096;

struct Topic {
    sender: broadcast::Sender<Event>,
    backlog: VecDeque<Event>,
    last_seq: u64,
    touched: u64,
}

impl Topic {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Topic {
            sender,
            backlog: VecDeque::with_capacity(capacity),
            last_seq: 0,
            touched: 0,
        }
    }
}

#[derive(Default)]
struct Topics {
    map: HashMap<String, Topic>,
    tick: u64,
}

impl Topics {
    fn touch(&mut self, name: &str, backlog: usize, max_topics: usize) -> &mut Topic {
        self.tick += 1;
        if !self.map.contains_key(name) && self.map.len() >= max_topics {
            self.evict_idle();
        }
        let tick = self.tick;
        let topic = self
            .map
            .entry(name.to_string())
            .or_insert_with(|| Topic::new(backlog));
        topic.touched = tick;
        topic
    }

    fn evict_idle(&mut self) {
        let idle = self
            .map
            .iter()
            .filter(|(_, t)| t.sender.receiver_count() == 0)
            .min_by_key(|(_, t)| t.touched)
            .map(|(name, _)| name.clone());
        match idle {
            Some(name) => {
                self.map.remove(&name);
                debug!("🧹 Evicted idle topic {}", name);
            }
            None => warn!("⚠️ {} topics, all with subscribers; growing past the cap", self.map.len()),
        }
    }
}

#[derive(Clone)]
pub struct EventHub {
    topics: Arc<RwLock<Topics>>,
    backlog: usize,
    max_topics: usize,
}

impl EventHub {
    pub fn new(backlog: usize) -> Self {
        Self::with_max_topics(backlog, DEFAULT_MAX_TOPICS)
    }

    pub fn with_max_topics(backlog: usize, max_topics: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(Topics::default())),
            backlog,
            max_topics: max_topics.max(1),
        }
    }

    /// Append an event to a topic and fan it out. Returns its sequence number.
    pub async fn publish(&self, topic: &str, kind: EventKind, payload: serde_json::Value) -> u64 {
        let mut topics = self.topics.write().await;
        let entry = topics.touch(topic, self.backlog, self.max_topics);

        entry.last_seq += 1;
        let event = Event {
            seq: entry.last_seq,
            topic: topic.to_string(),
            kind,
            payload,
            at: Utc::now(),
        };

        entry.backlog.push_back(event.clone());
        while entry.backlog.len() > self.backlog {
            entry.backlog.pop_front();
        }

        // No receivers is fine, the backlog still holds the event.
        let receivers = entry.sender.send(event).unwrap_or(0);
        debug!("📡 {} #{} {} -> {} subscriber(s)", topic, entry.last_seq, kind.as_str(), receivers);
        entry.last_seq
    }

    /// Subscribe to a topic. With `after`, backlog events newer than that
    /// sequence are replayed first.
    pub async fn subscribe(&self, topic: &str, after: Option<u64>) -> Subscription {
        let mut topics = self.topics.write().await;
        let entry = topics.touch(topic, self.backlog, self.max_topics);

        let receiver = entry.sender.subscribe();
        let replay: VecDeque<Event> = match after {
            Some(after) => entry
                .backlog
                .iter()
                .filter(|e| e.seq > after)
                .cloned()
                .collect(),
            None => VecDeque::new(),
        };
        // a cursor from before a restart may be ahead of this hub
        let cursor = Cursor {
            last: Some(after.map_or(entry.last_seq, |a| a.min(entry.last_seq))),
        };

        Subscription {
            topic: topic.to_string(),
            replay,
            receiver,
            cursor,
        }
    }

    pub async fn last_seq(&self, topic: &str) -> u64 {
        self.topics
            .read()
            .await
            .map
            .get(topic)
            .map_or(0, |t| t.last_seq)
    }

    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .map
            .get(topic)
            .map_or(0, |t| t.sender.receiver_count())
    }

    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.map.len()
    }
}

/// Highest sequence a subscriber has delivered.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    last: Option<u64>,
}

impl Cursor {
    /// True the first time a sequence above the cursor is seen.
    pub fn admit(&mut self, seq: u64) -> bool {
        match self.last {
            Some(last) if seq <= last => false,
            _ => {
                self.last = Some(seq);
                true
            }
        }
    }

    pub fn position(&self) -> Option<u64> {
        self.last
    }
}

pub struct Subscription {
    topic: String,
    replay: VecDeque<Event>,
    receiver: broadcast::Receiver<Event>,
    cursor: Cursor,
}

impl Subscription {
    /// Next undelivered event; `None` once the hub is gone.
    pub async fn next(&mut self) -> Option<Event> {
        while let Some(event) = self.replay.pop_front() {
            if self.cursor.admit(event.seq) {
                return Some(event);
            }
        }
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.cursor.admit(event.seq) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("⚠️ Subscriber on {} lagged, skipped {} event(s)", self.topic, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }
}
