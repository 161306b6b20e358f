//! Catalog client: fetches song records from the content service and turns
//! them into [`Catalog`] snapshots with fully qualified asset URLs.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::error::CatalogFetchError;
use crate::model::{Catalog, Track, ViewFilter};

/// Query parameter the service uses to restrict results to top tracks.
pub const TOP_TRACK_FILTER_PARAM: &str = "filter[top_track]";

/// Anything that can produce a catalog for a view filter.
///
/// The core loop only talks to this trait, so tests can script responses.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self, filter: ViewFilter) -> Result<Catalog, CatalogFetchError>;
}

// ── wire format ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SongsResponse {
    data: Vec<SongRecord>,
}

/// Record ids arrive as integers from some deployments and strings from others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordId {
    Num(i64),
    Text(String),
}

impl RecordId {
    fn into_string(self) -> String {
        match self {
            RecordId::Num(n) => n.to_string(),
            RecordId::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SongRecord {
    id: RecordId,
    #[serde(alias = "name")]
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    duration: Option<String>,
    cover: String,
    url: String,
    #[serde(default)]
    top_track: bool,
    #[serde(default)]
    accent: Option<String>,
    #[serde(default)]
    sort: Option<i64>,
    #[serde(default)]
    status: Option<String>,
}

impl SongRecord {
    fn is_published(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == "published")
    }

    fn into_track(self, base_url: &str, assets_path: &str) -> Track {
        Track {
            cover_url: resolve_asset(base_url, assets_path, &self.cover),
            audio_url: resolve_asset(base_url, assets_path, &self.url),
            id: self.id.into_string(),
            title: self.title,
            artist: self.artist,
            duration: self.duration.unwrap_or_default(),
            top_track: self.top_track,
            accent: self.accent,
            sort: self.sort,
        }
    }
}

// ── pure helpers ──────────────────────────────────────────────────────────────

/// Join `base`, `path` and `id` with exactly one `/` between each part.
pub fn asset_url(base: &str, path: &str, id: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_matches('/');
    let id = id.trim_start_matches('/');
    if path.is_empty() {
        format!("{}/{}", base, id)
    } else {
        format!("{}/{}/{}", base, path, id)
    }
}

/// Like [`asset_url`], but ids that are already absolute URLs pass through.
pub fn resolve_asset(base: &str, path: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        asset_url(base, path, raw)
    }
}

/// Query pairs the request for `filter` must carry.
pub fn filter_query(filter: ViewFilter) -> Vec<(&'static str, &'static str)> {
    match filter {
        ViewFilter::ForYou => Vec::new(),
        ViewFilter::TopTracks => vec![(TOP_TRACK_FILTER_PARAM, "true")],
    }
}

/// Decode a `{ "data": [...] }` body into a catalog for `filter`.
pub fn parse_catalog(
    body: &[u8],
    filter: ViewFilter,
    config: &CatalogConfig,
) -> Result<Catalog, CatalogFetchError> {
    let response: SongsResponse =
        serde_json::from_slice(body).map_err(|e| CatalogFetchError::Decode(e.to_string()))?;
    Ok(build_catalog(response.data, filter, config))
}

fn build_catalog(records: Vec<SongRecord>, filter: ViewFilter, config: &CatalogConfig) -> Catalog {
    let total = records.len();
    let tracks: Vec<Track> = records
        .into_iter()
        .filter(SongRecord::is_published)
        // the server filter is the contract; this guards against services that ignore it
        .filter(|r| filter != ViewFilter::TopTracks || r.top_track)
        .map(|r| r.into_track(&config.base_url, &config.assets_path))
        .collect();
    if tracks.len() != total {
        debug!(
            "catalog: kept {} of {} records for {:?}",
            tracks.len(),
            total,
            filter
        );
    }
    Catalog::new(filter, tracks)
}

// ── HTTP client ───────────────────────────────────────────────────────────────

pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogConfig,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogFetchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tune/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()
            .map_err(CatalogFetchError::Transport)?;
        Ok(Self { http, config })
    }

    pub fn songs_url(&self) -> String {
        let path = self.config.songs_path.trim_end_matches('/');
        asset_url(&self.config.base_url, "", path)
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_catalog(&self, filter: ViewFilter) -> Result<Catalog, CatalogFetchError> {
        let url = self.songs_url();
        debug!("catalog: GET {} filter={:?}", url, filter);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(&filter_query(filter))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("catalog: {} returned {}", url, status);
            return Err(CatalogFetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let catalog = parse_catalog(&body, filter, &self.config)?;
        info!("catalog: {} tracks for {:?}", catalog.len(), filter);
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r##"{
        "data": [
            {"id": 1, "status": "published", "name": "Colors", "artist": "William King",
             "accent": "#331E00", "cover": "4f718272", "top_track": true, "url": "https://pub.cdn/colors.mp3"},
            {"id": "2", "title": "Saudade", "artist": "Gabrielle Aplin", "duration": "4:12", "sort": 3,
             "cover": "cover-2", "top_track": false, "url": "audio-2"},
            {"id": 3, "status": "draft", "name": "Unreleased", "artist": "Nobody",
             "cover": "c3", "url": "a3"}
        ]
    }"##;

    fn config() -> CatalogConfig {
        CatalogConfig {
            base_url: "https://cms.example.com/".to_string(),
            ..CatalogConfig::default()
        }
    }

    #[test]
    fn test_asset_url_joins_single_slash() {
        assert_eq!(
            asset_url("https://cms.example.com", "assets", "abc"),
            "https://cms.example.com/assets/abc"
        );
        assert_eq!(
            asset_url("https://cms.example.com/", "/assets/", "/abc"),
            "https://cms.example.com/assets/abc"
        );
        assert_eq!(
            asset_url("http://localhost:1/", "", "items/songs"),
            "http://localhost:1/items/songs"
        );
    }

    #[test]
    fn test_filter_query() {
        assert!(filter_query(ViewFilter::ForYou).is_empty());
        assert_eq!(
            filter_query(ViewFilter::TopTracks),
            vec![("filter[top_track]", "true")]
        );
    }

    #[test]
    fn test_parse_catalog_normalizes_records() {
        let catalog = parse_catalog(BODY.as_bytes(), ViewFilter::ForYou, &config()).unwrap();
        assert_eq!(catalog.len(), 2, "draft record must be skipped");

        let colors = catalog.get(0).unwrap();
        assert_eq!(colors.id, "1");
        assert_eq!(colors.title, "Colors");
        assert_eq!(colors.cover_url, "https://cms.example.com/assets/4f718272");
        assert_eq!(colors.audio_url, "https://pub.cdn/colors.mp3");
        assert!(colors.top_track);
        assert_eq!(colors.accent.as_deref(), Some("#331E00"));
        assert_eq!(colors.duration, "");

        let saudade = catalog.get(1).unwrap();
        assert_eq!(saudade.id, "2");
        assert_eq!(saudade.duration, "4:12");
        assert_eq!(saudade.sort, Some(3));
        assert_eq!(colors.sort, None);
        assert_eq!(saudade.audio_url, "https://cms.example.com/assets/audio-2");
    }

    #[test]
    fn test_parse_catalog_top_tracks_keeps_flagged_only() {
        let catalog = parse_catalog(BODY.as_bytes(), ViewFilter::TopTracks, &config()).unwrap();
        assert_eq!(catalog.filter(), ViewFilter::TopTracks);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(0).unwrap().title, "Colors");
    }

    #[test]
    fn test_parse_catalog_rejects_garbage() {
        let err = parse_catalog(b"<html>oops</html>", ViewFilter::ForYou, &config()).unwrap_err();
        assert!(matches!(err, CatalogFetchError::Decode(_)));

        let err = parse_catalog(br#"{"items": []}"#, ViewFilter::ForYou, &config()).unwrap_err();
        assert!(matches!(err, CatalogFetchError::Decode(_)));
    }

    #[test]
    fn test_parse_catalog_empty_data() {
        let catalog = parse_catalog(br#"{"data": []}"#, ViewFilter::ForYou, &config()).unwrap();
        assert!(catalog.is_empty());
    }
}
