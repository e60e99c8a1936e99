use serde::{Deserialize, Serialize};

/// Episode listing as returned by the upstream `daily` and `search` endpoints.
///
/// Fetched fresh per request; never cached or persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeList {
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub name: String,
    pub episode_number: u32,
    pub episode_season: u32,
    pub serie: SerieRef,
}

/// Parent serie as embedded in an episode row. The id is present on search
/// results (where it seeds callback payloads) but may be absent elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerieRef {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// Detail record for a single serie, fetched when a search result is selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Serie {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub overview: String,
}
