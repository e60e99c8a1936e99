//! Daily fan-out of airing listings to every subscribed channel.

use crate::db::{self, Pool, StoreError};
use crate::format;
use crate::outbound::Outbound;
use crate::upstream::EpisodeSource;
use chrono::{NaiveDateTime, NaiveTime};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Wall-clock fire time of the daily broadcast, local timezone.
pub const FIRE_HOUR: u32 = 6;
pub const FIRE_MINUTE: u32 = 1;

/// Pause between subscribers, keeping the run under the transport's outbound
/// rate limit.
pub const PACING: Duration = Duration::from_secs(2);

/// Time left until the next daily fire instant. Pure local-time math so the
/// trigger loop stays testable.
pub fn duration_until_next(now: NaiveDateTime) -> Duration {
    let fire_time = NaiveTime::from_hms_opt(FIRE_HOUR, FIRE_MINUTE, 0).expect("valid fire time");
    let today_fire = now.date().and_time(fire_time);
    let next = if now < today_fire {
        today_fire
    } else {
        today_fire + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// One broadcast run over a snapshot of all subscriptions.
///
/// Per-subscriber fetch or delivery failures are logged and skipped; a
/// failure enumerating the snapshot aborts the whole run. After every
/// subscriber, successful or not, the loop sleeps `pace`.
#[instrument(skip_all)]
pub async fn broadcast_once(
    pool: &Pool,
    source: &dyn EpisodeSource,
    outbound: &dyn Outbound,
    pace: Duration,
) -> Result<(), StoreError> {
    let subscriptions = db::list_subscriptions(pool).await?;
    info!(count = subscriptions.len(), "broadcasting to all subscribers");

    for sub in subscriptions {
        match source.daily(Some(&sub.tracked)).await {
            Ok(listing) => {
                let text = format::format_listing(&listing.episodes);
                match outbound.send_text(sub.channel_id, &text).await {
                    Ok(_) => info!(channel_id = sub.channel_id, "broadcast delivered"),
                    Err(err) => {
                        warn!(?err, channel_id = sub.channel_id, "broadcast delivery failed")
                    }
                }
            }
            Err(err) => {
                warn!(
                    ?err,
                    channel_id = sub.channel_id,
                    tracked = %sub.tracked,
                    "daily fetch failed; skipping subscriber"
                );
            }
        }
        tokio::time::sleep(pace).await;
    }
    Ok(())
}
