//! Database row types returned by the repository.

/// One channel's subscription to a tracked subject on the upstream API.
/// Invariant: at most one row per `channel_id` (enforced by
/// `repo::upsert_subscription`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub channel_id: i64,
    pub tracked: String,
}
