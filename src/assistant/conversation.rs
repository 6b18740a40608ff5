use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_MAX_CONVERSATIONS: usize = 1000;
/// Exchanges included as context when building a follow-up prompt.
pub const DEFAULT_CONTEXT_EXCHANGES: usize = 5;

/// Identifies one conversation: a user talking about one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub user_id: Uuid,
    pub plan_id: Uuid,
}

/// One question/answer round with the study assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationExchange {
    pub question: String,
    pub answer: String,
    /// Model provider that produced the answer.
    pub provider: String,
    pub asked_at: DateTime<Utc>,
}

/// Input for recording an exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordExchangeInput {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub provider: String,
}

/// A conversation's stored exchanges, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub message_count: usize,
    pub messages: Vec<ConversationExchange>,
}

#[derive(Debug, Default)]
struct Conversation {
    exchanges: VecDeque<ConversationExchange>,
    /// Store-wide sequence number of the last write, for eviction.
    last_touched: u64,
}

#[derive(Debug, Default)]
struct Inner {
    conversations: HashMap<ConversationKey, Conversation>,
    clock: u64,
}

/// Bounded in-memory chat history.
///
/// Each conversation keeps at most `history_limit` exchanges, dropping the
/// oldest first. The store keeps at most `max_conversations` conversations and
/// evicts the least recently written one to make room for a new one.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    history_limit: usize,
    max_conversations: usize,
    inner: Arc<Mutex<Inner>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_CONVERSATIONS)
    }
}

impl ConversationStore {
    pub fn new(history_limit: usize, max_conversations: usize) -> Self {
        Self {
            history_limit: history_limit.max(1),
            max_conversations: max_conversations.max(1),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Append an exchange and return the conversation's length afterwards.
    pub fn record(&self, key: ConversationKey, input: RecordExchangeInput) -> usize {
        let mut inner = self.inner.lock().expect("conversation store lock poisoned");
        inner.clock += 1;
        let now = inner.clock;

        if !inner.conversations.contains_key(&key)
            && inner.conversations.len() >= self.max_conversations
        {
            evict_least_recent(&mut inner.conversations);
        }

        let conversation = inner.conversations.entry(key).or_default();
        conversation.last_touched = now;
        conversation.exchanges.push_back(ConversationExchange {
            question: input.question,
            answer: input.answer,
            provider: input.provider,
            asked_at: Utc::now(),
        });
        while conversation.exchanges.len() > self.history_limit {
            conversation.exchanges.pop_front();
        }

        conversation.exchanges.len()
    }

    /// All stored exchanges for a conversation, oldest first.
    pub fn history(&self, key: ConversationKey) -> ConversationHistory {
        let inner = self.inner.lock().expect("conversation store lock poisoned");
        let messages: Vec<ConversationExchange> = inner
            .conversations
            .get(&key)
            .map(|c| c.exchanges.iter().cloned().collect())
            .unwrap_or_default();

        ConversationHistory {
            user_id: key.user_id,
            plan_id: key.plan_id,
            message_count: messages.len(),
            messages,
        }
    }

    /// The last `n` exchanges, oldest first.
    pub fn recent(&self, key: ConversationKey, n: usize) -> Vec<ConversationExchange> {
        let inner = self.inner.lock().expect("conversation store lock poisoned");
        inner
            .conversations
            .get(&key)
            .map(|c| {
                let skip = c.exchanges.len().saturating_sub(n);
                c.exchanges.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Forget a conversation. Returns whether anything was stored.
    pub fn clear(&self, key: ConversationKey) -> bool {
        let mut inner = self.inner.lock().expect("conversation store lock poisoned");
        inner.conversations.remove(&key).is_some()
    }

    pub fn conversation_count(&self) -> usize {
        let inner = self.inner.lock().expect("conversation store lock poisoned");
        inner.conversations.len()
    }
}

fn evict_least_recent(conversations: &mut HashMap<ConversationKey, Conversation>) {
    let oldest = conversations
        .iter()
        .min_by_key(|(_, c)| c.last_touched)
        .map(|(key, _)| *key);

    if let Some(key) = oldest {
        conversations.remove(&key);
        tracing::debug!(
            user_id = %key.user_id,
            plan_id = %key.plan_id,
            "Evicted least recently used conversation"
        );
    }
}
