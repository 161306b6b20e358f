//! Drives the real reqwest `CatalogClient` against a local axum server that
//! imitates the content service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use tune_core::catalog::{CatalogClient, CatalogSource};
use tune_core::config::CatalogConfig;
use tune_core::error::CatalogFetchError;
use tune_core::model::ViewFilter;

#[derive(Clone, Default)]
struct FakeService {
    seen_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

fn songs() -> Value {
    json!({
        "data": [
            {"id": 1, "status": "published", "name": "Colors", "artist": "William King",
             "cover": "cover-1", "url": "audio-1", "top_track": true, "accent": "#331E00"},
            {"id": 2, "status": "published", "name": "Saudade", "artist": "Gabrielle Aplin",
             "cover": "cover-2", "url": "audio-2", "top_track": false},
            {"id": 3, "status": "published", "name": "Sunflower", "artist": "Post Malone",
             "cover": "cover-3", "url": "audio-3", "top_track": true}
        ]
    })
}

async fn list_songs(
    State(service): State<FakeService>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let top_only = params.get("filter[top_track]").map(String::as_str) == Some("true");
    service.seen_queries.lock().unwrap().push(params);

    let mut body = songs();
    if top_only {
        if let Some(data) = body["data"].as_array_mut() {
            data.retain(|r| r["top_track"] == json!(true));
        }
    }
    Json(body)
}

async fn broken() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance")
}

async fn not_json() -> impl IntoResponse {
    "<html>definitely not json</html>"
}

async fn serve(service: FakeService) -> String {
    let app = Router::new()
        .route("/items/songs", get(list_songs))
        .route("/broken/songs", get(broken))
        .route("/html/songs", get(not_json))
        .with_state(service);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str, songs_path: &str) -> CatalogClient {
    CatalogClient::new(CatalogConfig {
        base_url: base_url.to_string(),
        songs_path: songs_path.to_string(),
        ..CatalogConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_for_you_fetches_everything_with_asset_urls() {
    let service = FakeService::default();
    let base = serve(service.clone()).await;

    let catalog = client(&base, "items/songs")
        .fetch_catalog(ViewFilter::ForYou)
        .await
        .unwrap();

    assert_eq!(catalog.filter(), ViewFilter::ForYou);
    assert_eq!(catalog.len(), 3);
    let first = catalog.get(0).unwrap();
    assert_eq!(first.id, "1");
    assert_eq!(first.cover_url, format!("{}/assets/cover-1", base));
    assert_eq!(first.audio_url, format!("{}/assets/audio-1", base));

    let queries = service.seen_queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].is_empty(), "For You must not send a filter");
}

#[tokio::test]
async fn test_top_tracks_sends_filter_param() {
    let service = FakeService::default();
    let base = serve(service.clone()).await;

    let catalog = client(&base, "/items/songs/")
        .fetch_catalog(ViewFilter::TopTracks)
        .await
        .unwrap();

    let titles: Vec<&str> = catalog.tracks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Colors", "Sunflower"]);
    assert!(catalog.tracks().iter().all(|t| t.top_track));

    let queries = service.seen_queries.lock().unwrap();
    assert_eq!(
        queries[0].get("filter[top_track]").map(String::as_str),
        Some("true")
    );
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let base = serve(FakeService::default()).await;
    let err = client(&base, "broken/songs")
        .fetch_catalog(ViewFilter::ForYou)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogFetchError::Status(503)), "{:?}", err);
}

#[tokio::test]
async fn test_missing_route_is_reported_as_status() {
    let base = serve(FakeService::default()).await;
    let err = client(&base, "nowhere")
        .fetch_catalog(ViewFilter::ForYou)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogFetchError::Status(404)), "{:?}", err);
}

#[tokio::test]
async fn test_undecodable_body_is_reported() {
    let base = serve(FakeService::default()).await;
    let err = client(&base, "html/songs")
        .fetch_catalog(ViewFilter::ForYou)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogFetchError::Decode(_)), "{:?}", err);
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    // bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}", addr), "items/songs")
        .fetch_catalog(ViewFilter::ForYou)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogFetchError::Transport(_)), "{:?}", err);
}
