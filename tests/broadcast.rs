//! Broadcast-run semantics: fan-out over the subscription snapshot with
//! per-subscriber failure isolation.

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use teloxide::types::InlineKeyboardMarkup;
use tg_airwatch::broadcast;
use tg_airwatch::db;
use tg_airwatch::model::{Episode, EpisodeList, Serie, SerieRef};
use tg_airwatch::outbound::{DeliveryError, Outbound};
use tg_airwatch::upstream::{EpisodeSource, FetchError};
use tokio::sync::Mutex;

async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

fn listing_for(serie_name: &str) -> EpisodeList {
    EpisodeList {
        episodes: vec![Episode {
            name: "An Episode".into(),
            episode_number: 3,
            episode_season: 1,
            serie: SerieRef {
                id: None,
                name: serie_name.into(),
            },
        }],
    }
}

fn fetch_err() -> FetchError {
    FetchError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR)
}

/// Scripted daily feed: responses pop in call order, subjects are recorded.
#[derive(Clone, Default)]
struct StubSource {
    responses: Arc<Mutex<VecDeque<Result<EpisodeList, FetchError>>>>,
    daily_calls: Arc<Mutex<Vec<Option<String>>>>,
}

impl StubSource {
    fn with_responses(responses: Vec<Result<EpisodeList, FetchError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }
}

#[async_trait]
impl EpisodeSource for StubSource {
    async fn daily(&self, subject: Option<&str>) -> Result<EpisodeList, FetchError> {
        self.daily_calls
            .lock()
            .await
            .push(subject.map(str::to_owned));
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(EpisodeList::default()))
    }

    async fn search(&self, _query: &str) -> Result<EpisodeList, FetchError> {
        Err(fetch_err())
    }

    async fn serie(&self, _id: i64) -> Result<Serie, FetchError> {
        Err(fetch_err())
    }
}

/// Records deliveries; sends to channels in `refuse` fail with a delivery
/// error instead.
#[derive(Clone, Default)]
struct RecordingOutbound {
    sent: Arc<Mutex<Vec<(i64, String)>>>,
    refuse: Arc<Mutex<HashSet<i64>>>,
}

impl RecordingOutbound {
    fn refusing(channels: &[i64]) -> Self {
        Self {
            refuse: Arc::new(Mutex::new(channels.iter().copied().collect())),
            ..Default::default()
        }
    }

    async fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Outbound for RecordingOutbound {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i32, DeliveryError> {
        if self.refuse.lock().await.contains(&chat_id) {
            return Err(DeliveryError::new("refused by transport"));
        }
        let mut sent = self.sent.lock().await;
        sent.push((chat_id, text.to_owned()));
        Ok(sent.len() as i32)
    }

    async fn send_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        _keyboard: InlineKeyboardMarkup,
    ) -> Result<i32, DeliveryError> {
        self.send_text(chat_id, text).await
    }

    async fn attach_keyboard(
        &self,
        _chat_id: i64,
        _message_id: i32,
        _keyboard: InlineKeyboardMarkup,
    ) -> Result<(), DeliveryError> {
        Ok(())
    }

    async fn answer_callback(&self, _callback_id: &str) -> Result<(), DeliveryError> {
        Ok(())
    }
}

#[tokio::test]
async fn delivers_each_subscribers_listing() {
    let pool = setup_pool().await;
    db::upsert_subscription(&pool, 1, "alice").await.unwrap();
    db::upsert_subscription(&pool, 2, "bob").await.unwrap();

    let source = StubSource::with_responses(vec![
        Ok(listing_for("Foo")),
        Ok(listing_for("Bar")),
    ]);
    let outbound = RecordingOutbound::default();

    broadcast::broadcast_once(&pool, &source, &outbound, Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(
        *source.daily_calls.lock().await,
        vec![Some("alice".to_string()), Some("bob".to_string())]
    );
    let sent = outbound.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], (1, "Airing today:\n- S01E03 Foo\n".to_string()));
    assert_eq!(sent[1], (2, "Airing today:\n- S01E03 Bar\n".to_string()));
}

#[tokio::test]
async fn fetch_failure_skips_only_that_subscriber() {
    let pool = setup_pool().await;
    db::upsert_subscription(&pool, 1, "alice").await.unwrap();
    db::upsert_subscription(&pool, 2, "bob").await.unwrap();
    db::upsert_subscription(&pool, 3, "carol").await.unwrap();

    let source = StubSource::with_responses(vec![
        Ok(listing_for("Foo")),
        Err(fetch_err()),
        Ok(listing_for("Baz")),
    ]);
    let outbound = RecordingOutbound::default();

    broadcast::broadcast_once(&pool, &source, &outbound, Duration::ZERO)
        .await
        .unwrap();

    // All three subscribers were attempted; only the failed fetch is skipped.
    assert_eq!(source.daily_calls.lock().await.len(), 3);
    let channels: Vec<i64> = outbound.sent().await.iter().map(|(c, _)| *c).collect();
    assert_eq!(channels, vec![1, 3]);
}

#[tokio::test]
async fn delivery_failure_does_not_abort_the_run() {
    let pool = setup_pool().await;
    db::upsert_subscription(&pool, 1, "alice").await.unwrap();
    db::upsert_subscription(&pool, 2, "bob").await.unwrap();
    db::upsert_subscription(&pool, 3, "carol").await.unwrap();

    let source = StubSource::with_responses(vec![
        Ok(listing_for("Foo")),
        Ok(listing_for("Bar")),
        Ok(listing_for("Baz")),
    ]);
    let outbound = RecordingOutbound::refusing(&[2]);

    broadcast::broadcast_once(&pool, &source, &outbound, Duration::ZERO)
        .await
        .unwrap();

    let channels: Vec<i64> = outbound.sent().await.iter().map(|(c, _)| *c).collect();
    assert_eq!(channels, vec![1, 3]);
}

#[tokio::test]
async fn empty_snapshot_sends_nothing() {
    let pool = setup_pool().await;
    let source = StubSource::default();
    let outbound = RecordingOutbound::default();

    broadcast::broadcast_once(&pool, &source, &outbound, Duration::ZERO)
        .await
        .unwrap();

    assert!(source.daily_calls.lock().await.is_empty());
    assert!(outbound.sent().await.is_empty());
}
