//! Subscription bookkeeping, independent of connection state.
//!
//! Subscriptions are stored as canonical `topic:resource` keys in a
//! lock-free `scc::HashMap`. The set survives connection drops and is
//! replayed against every newly established socket; only a manual
//! disconnect clears it.

use tracing::warn;

/// Marker standing in for "all resources of this topic" in a canonical key.
pub const WILDCARD: &str = "*";

/// A decoded subscription: topic plus optional resource scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    /// Topic name (`threads`, `presence`, ...).
    pub topic: String,
    /// Resource the subscription is scoped to, if any.
    pub resource_id: Option<u64>,
}

impl SubscriptionKey {
    /// Create a new subscription key.
    pub fn new(topic: impl Into<String>, resource_id: Option<u64>) -> Self {
        Self {
            topic: topic.into(),
            resource_id,
        }
    }

    /// Encode into the canonical string form used for set membership.
    pub fn canonical(&self) -> String {
        canonical_key(&self.topic, self.resource_id)
    }

    /// Decode a canonical key back into topic and resource id. The
    /// wildcard marker decodes to "no resource id".
    pub fn decode(key: &str) -> Option<Self> {
        let (topic, resource) = key.rsplit_once(':')?;
        if topic.is_empty() {
            return None;
        }
        let resource_id = if resource == WILDCARD {
            None
        } else {
            Some(resource.parse().ok()?)
        };
        Some(Self::new(topic, resource_id))
    }
}

/// Encode a (topic, resource id) pair into its canonical string form.
pub fn canonical_key(topic: &str, resource_id: Option<u64>) -> String {
    match resource_id {
        Some(id) => format!("{topic}:{id}"),
        None => format!("{topic}:{WILDCARD}"),
    }
}

/// Lock-free store for the active subscription set.
pub struct SubscriptionSet {
    keys: scc::HashMap<String, ()>,
}

impl SubscriptionSet {
    /// Create an empty subscription set.
    pub fn new() -> Self {
        Self {
            keys: scc::HashMap::new(),
        }
    }

    /// Record a subscription.
    ///
    /// Returns `true` if it was newly added, `false` if the canonical key
    /// was already present (idempotent subscribe).
    pub fn insert(&self, topic: &str, resource_id: Option<u64>) -> bool {
        self.keys
            .insert_sync(canonical_key(topic, resource_id), ())
            .is_ok()
    }

    /// Remove a subscription.
    ///
    /// Returns `true` if the key was present, `false` for a never-recorded
    /// key (no-op).
    pub fn remove(&self, topic: &str, resource_id: Option<u64>) -> bool {
        self.keys
            .remove_sync(&canonical_key(topic, resource_id))
            .is_some()
    }

    /// Snapshot every recorded subscription, decoded for replay.
    pub fn snapshot(&self) -> Vec<SubscriptionKey> {
        let mut keys = Vec::new();
        self.keys.retain_sync(|key, _| {
            keys.push(key.clone());
            true
        });

        keys.into_iter()
            .filter_map(|key| {
                let decoded = SubscriptionKey::decode(&key);
                if decoded.is_none() {
                    // Keys are only produced by canonical_key, so this
                    // indicates a bug rather than bad input.
                    warn!(key, "skipping undecodable subscription key");
                }
                decoded
            })
            .collect()
    }

    /// Remove every subscription.
    pub fn clear(&self) {
        self.keys.clear_sync();
    }

    /// Number of recorded subscriptions.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for SubscriptionSet {
    fn default() -> Self {
        Self::new()
    }
}
