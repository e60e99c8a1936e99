use crate::db::{self, Pool};
use crate::format;
use crate::outbound::Outbound;
use crate::upstream::EpisodeSource;
use anyhow::Result;
use tracing::{debug, error, info, instrument, warn};

/// Queries shorter than this are rejected before any upstream call.
pub const MIN_SEARCH_CHARS: usize = 5;

const FAILURE_REPLY: &str = "Something went wrong, please try again later.";

/// A recognized text command. Anything else is logged and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Today,
    Sub(&'a str),
    Unsub,
    Search(&'a str),
}

/// Parse a message text into a command. Accepts an optional `@botname`
/// suffix on the token; the argument is the rest of the line, trimmed.
pub fn parse_command(text: &str) -> Option<Command<'_>> {
    let rest = text.trim().strip_prefix('/')?;
    let (token, args) = match rest.split_once(char::is_whitespace) {
        Some((token, args)) => (token, args.trim()),
        None => (rest, ""),
    };
    let token = token.split('@').next().unwrap_or(token);
    match token {
        "today" => Some(Command::Today),
        "sub" => Some(Command::Sub(args)),
        "unsub" => Some(Command::Unsub),
        "search" => Some(Command::Search(args)),
        _ => None,
    }
}

/// Handle one inbound message event. Every recognized command produces
/// exactly one reply; returned errors are reply-delivery failures, logged by
/// the dispatcher loop.
#[instrument(skip_all)]
pub async fn handle_message(
    outbound: &dyn Outbound,
    pool: &Pool,
    source: &dyn EpisodeSource,
    calendar_url: &str,
    chat_id: i64,
    text: &str,
) -> Result<()> {
    let Some(command) = parse_command(text) else {
        debug!(chat_id, "no command");
        return Ok(());
    };
    match command {
        Command::Today => today(outbound, source, calendar_url, chat_id).await,
        Command::Sub(tracked) => sub(outbound, pool, chat_id, tracked).await,
        Command::Unsub => unsub(outbound, pool, chat_id).await,
        Command::Search(query) => search(outbound, source, chat_id, query).await,
    }
}

/// Handle one button-press callback. The callback is acknowledged before the
/// detail fetch so the client never hangs on its loading indicator.
#[instrument(skip_all)]
pub async fn handle_callback(
    outbound: &dyn Outbound,
    source: &dyn EpisodeSource,
    chat_id: i64,
    callback_id: &str,
    payload: &str,
) -> Result<()> {
    if let Err(err) = outbound.answer_callback(callback_id).await {
        warn!(?err, chat_id, "failed to answer callback");
    }

    let Some(raw_id) = payload.strip_prefix(format::SERIE_CALLBACK_PREFIX) else {
        debug!(payload, "unrecognized callback payload");
        return Ok(());
    };
    let Ok(serie_id) = raw_id.parse::<i64>() else {
        warn!(payload, "malformed serie callback payload");
        return Ok(());
    };

    match source.serie(serie_id).await {
        Ok(serie) => {
            let reply = format!("{}\n\n{}", serie.name, serie.overview);
            outbound.send_text(chat_id, &reply).await?;
        }
        Err(err) => {
            warn!(?err, serie_id, "serie detail fetch failed");
            outbound.send_text(chat_id, FAILURE_REPLY).await?;
        }
    }
    Ok(())
}

async fn today(
    outbound: &dyn Outbound,
    source: &dyn EpisodeSource,
    calendar_url: &str,
    chat_id: i64,
) -> Result<()> {
    let listing = match source.daily(None).await {
        Ok(listing) => listing,
        Err(err) => {
            warn!(?err, chat_id, "daily fetch failed");
            outbound.send_text(chat_id, FAILURE_REPLY).await?;
            return Ok(());
        }
    };
    let text = format::format_listing(&listing.episodes);
    match format::calendar_keyboard(calendar_url) {
        Some(keyboard) => {
            outbound.send_with_keyboard(chat_id, &text, keyboard).await?;
        }
        None => {
            outbound.send_text(chat_id, &text).await?;
        }
    }
    Ok(())
}

async fn sub(outbound: &dyn Outbound, pool: &Pool, chat_id: i64, tracked: &str) -> Result<()> {
    if tracked.is_empty() {
        outbound
            .send_text(chat_id, "Usage: /sub <name of the track list to follow>")
            .await?;
        return Ok(());
    }
    info!(chat_id, tracked, "subscription requested");
    match db::upsert_subscription(pool, chat_id, tracked).await {
        Ok(()) => {
            let reply = format!(
                "You are now subscribed to the track list of {tracked}.\nThis channel will receive daily updates."
            );
            outbound.send_text(chat_id, &reply).await?;
        }
        Err(err) => {
            error!(?err, chat_id, "failed to store subscription");
            outbound.send_text(chat_id, FAILURE_REPLY).await?;
        }
    }
    Ok(())
}

async fn unsub(outbound: &dyn Outbound, pool: &Pool, chat_id: i64) -> Result<()> {
    info!(chat_id, "unsubscribe requested");
    match db::delete_subscription(pool, chat_id).await {
        Ok(()) => {
            outbound
                .send_text(chat_id, "This channel will no longer receive daily updates.")
                .await?;
        }
        Err(err) => {
            error!(?err, chat_id, "failed to delete subscription");
            outbound.send_text(chat_id, FAILURE_REPLY).await?;
        }
    }
    Ok(())
}

async fn search(
    outbound: &dyn Outbound,
    source: &dyn EpisodeSource,
    chat_id: i64,
    query: &str,
) -> Result<()> {
    if query.chars().count() < MIN_SEARCH_CHARS {
        outbound
            .send_text(
                chat_id,
                "Search query must be at least 5 characters long.",
            )
            .await?;
        return Ok(());
    }

    let results = match source.search(query).await {
        Ok(results) => results,
        Err(err) => {
            warn!(?err, chat_id, query, "search fetch failed");
            outbound.send_text(chat_id, FAILURE_REPLY).await?;
            return Ok(());
        }
    };
    if results.episodes.is_empty() {
        outbound
            .send_text(chat_id, &format!("Nothing found for {query}."))
            .await?;
        return Ok(());
    }

    let message_id = outbound
        .send_text(chat_id, "Select a serie for details:")
        .await?;
    let keyboard = format::selection_keyboard(&results.episodes);
    if let Err(err) = outbound.attach_keyboard(chat_id, message_id, keyboard).await {
        // The plain message already reached the user; leave it as-is.
        warn!(?err, chat_id, "failed to attach selection keyboard");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_commands() {
        assert_eq!(parse_command("/today"), Some(Command::Today));
        assert_eq!(parse_command("/unsub"), Some(Command::Unsub));
        assert_eq!(parse_command("  /today  "), Some(Command::Today));
    }

    #[test]
    fn parses_arguments() {
        assert_eq!(parse_command("/sub alice"), Some(Command::Sub("alice")));
        assert_eq!(
            parse_command("/search doctor who"),
            Some(Command::Search("doctor who"))
        );
        assert_eq!(parse_command("/sub"), Some(Command::Sub("")));
    }

    #[test]
    fn strips_bot_name_suffix() {
        assert_eq!(parse_command("/today@airwatch_bot"), Some(Command::Today));
        assert_eq!(
            parse_command("/sub@airwatch_bot alice"),
            Some(Command::Sub("alice"))
        );
    }

    #[test]
    fn rejects_non_commands() {
        assert_eq!(parse_command("today"), None);
        assert_eq!(parse_command("/unknown"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("hello /today"), None);
    }
}
