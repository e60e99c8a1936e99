//! Pure text and keyboard builders. No I/O here.

use crate::model::Episode;
use reqwest::Url;
use std::fmt::Write;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Callback payload prefix for serie-detail requests. The transport
/// round-trips the payload verbatim through the button.
pub const SERIE_CALLBACK_PREFIX: &str = "serie=";

/// Human-readable airing listing. An empty listing yields the header alone.
pub fn format_listing(episodes: &[Episode]) -> String {
    let mut text = String::from("Airing today:\n");
    for episode in episodes {
        let _ = writeln!(
            text,
            "- S{:02}E{:02} {}",
            episode.episode_season, episode.episode_number, episode.serie.name
        );
    }
    text
}

/// One keyboard row per result, labeled with the serie name and carrying a
/// `serie=<id>` callback payload. Results without a serie id are skipped.
pub fn selection_keyboard(episodes: &[Episode]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = episodes
        .iter()
        .filter_map(|episode| {
            let id = episode.serie.id?;
            Some(vec![InlineKeyboardButton::callback(
                episode.serie.name.clone(),
                format!("{SERIE_CALLBACK_PREFIX}{id}"),
            )])
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Static single-button keyboard linking to the upstream calendar page.
/// Returns `None` if the configured URL does not parse (config validation
/// rejects that at startup).
pub fn calendar_keyboard(calendar_url: &str) -> Option<InlineKeyboardMarkup> {
    let url = Url::parse(calendar_url).ok()?;
    Some(InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::url("View calendar", url),
    ]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SerieRef;

    fn episode(season: u32, number: u32, serie_id: Option<i64>, serie_name: &str) -> Episode {
        Episode {
            name: "An Episode".into(),
            episode_number: number,
            episode_season: season,
            serie: SerieRef {
                id: serie_id,
                name: serie_name.into(),
            },
        }
    }

    #[test]
    fn empty_listing_is_header_only() {
        assert_eq!(format_listing(&[]), "Airing today:\n");
    }

    #[test]
    fn listing_zero_pads_season_and_number() {
        let episodes = vec![episode(1, 3, None, "Foo")];
        assert_eq!(format_listing(&episodes), "Airing today:\n- S01E03 Foo\n");
    }

    #[test]
    fn listing_keeps_input_order() {
        let episodes = vec![
            episode(2, 10, None, "Foo"),
            episode(12, 1, None, "Bar"),
        ];
        assert_eq!(
            format_listing(&episodes),
            "Airing today:\n- S02E10 Foo\n- S12E01 Bar\n"
        );
    }

    #[test]
    fn selection_keyboard_one_row_per_result() {
        let episodes = vec![
            episode(1, 1, Some(42), "Foo"),
            episode(1, 2, Some(7), "Bar"),
        ];
        let keyboard = selection_keyboard(&episodes);
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[0].len(), 1);
        let button = &keyboard.inline_keyboard[0][0];
        assert_eq!(button.text, "Foo");
        match &button.kind {
            teloxide::types::InlineKeyboardButtonKind::CallbackData(data) => {
                assert_eq!(data, "serie=42")
            }
            other => panic!("unexpected button kind: {other:?}"),
        }
    }

    #[test]
    fn selection_keyboard_skips_results_without_serie_id() {
        let episodes = vec![episode(1, 1, None, "Foo"), episode(1, 2, Some(7), "Bar")];
        let keyboard = selection_keyboard(&episodes);
        assert_eq!(keyboard.inline_keyboard.len(), 1);
        assert_eq!(keyboard.inline_keyboard[0][0].text, "Bar");
    }

    #[test]
    fn calendar_keyboard_builds_url_button() {
        let keyboard = calendar_keyboard("https://feedmyaddiction.xyz/calendar").unwrap();
        assert_eq!(keyboard.inline_keyboard.len(), 1);
        assert_eq!(keyboard.inline_keyboard[0][0].text, "View calendar");
        assert!(calendar_keyboard("not a url").is_none());
    }
}
