mod models;

use async_trait::async_trait;
use miniplayer_core::{
    ApiConfig, CatalogClient, CoreError, LyricPayload, QualityTier, StreamSource, Track,
};
use models::{Envelope, LyricResponse, SongUrlResponse, SongsResponse, CODE_OK};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

const PLAYLIST_TRACKS_ENDPOINT: &str = "/playlist/track/all";
const SONG_DETAIL_ENDPOINT: &str = "/song/detail";
const SONG_URL_ENDPOINT: &str = "/song/url/v1";
const LYRIC_ENDPOINT: &str = "/lyric";

/// Client for the NetEase Cloud Music proxy API
pub struct NeteaseClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl NeteaseClient {
    /// Create a client from the `[api]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ApiConfig) -> Result<Self, CoreError> {
        // Base client with timeout
        let base_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("MiniPlayer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint_url(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}{}", self.base_url, endpoint);
        for (i, (key, value)) in params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            let _ = write!(url, "{sep}{key}={}", urlencoding::encode(value));
        }
        url
    }

    /// GET an endpoint and decode its body, failing on any code but 200.
    async fn request<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T, CoreError> {
        let url = self.endpoint_url(endpoint, params);
        debug!("NetEase GET: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::Network {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("NetEase {} returned HTTP status: {}", endpoint, status);
            return Err(CoreError::ApiStatus {
                endpoint: endpoint.to_string(),
                code: i64::from(status.as_u16()),
            });
        }

        let body = response.bytes().await?;
        let envelope: Envelope = serde_json::from_slice(&body)?;
        if envelope.code != CODE_OK {
            warn!("NetEase {} returned code: {}", endpoint, envelope.code);
            return Err(CoreError::ApiStatus {
                endpoint: endpoint.to_string(),
                code: envelope.code,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl CatalogClient for NeteaseClient {
    fn name(&self) -> &'static str {
        "netease"
    }

    async fn playlist_tracks(&self, playlist_id: &str, limit: u32, offset: u32) -> Result<Vec<Track>, CoreError> {
        info!("Fetching playlist {} from NetEase (limit {}, offset {})", playlist_id, limit, offset);
        let limit = limit.to_string();
        let offset = offset.to_string();
        let response: SongsResponse = self
            .request(
                PLAYLIST_TRACKS_ENDPOINT,
                &[("id", playlist_id), ("limit", &limit), ("offset", &offset)],
            )
            .await?;
        Ok(response.songs.into_iter().map(Track::from).collect())
    }

    async fn song_details(&self, ids: &[String]) -> Result<Vec<Track>, CoreError> {
        let ids = ids.join(",");
        let response: SongsResponse = self.request(SONG_DETAIL_ENDPOINT, &[("ids", &ids)]).await?;
        Ok(response.songs.into_iter().map(Track::from).collect())
    }

    async fn song_url(&self, track_id: &str, tier: QualityTier) -> Result<Vec<StreamSource>, CoreError> {
        let response: SongUrlResponse = self
            .request(SONG_URL_ENDPOINT, &[("id", track_id), ("level", tier.as_str())])
            .await?;
        Ok(response.data.into_iter().map(StreamSource::from).collect())
    }

    async fn lyrics(&self, track_id: &str) -> Result<LyricPayload, CoreError> {
        let response: LyricResponse = self.request(LYRIC_ENDPOINT, &[("id", track_id)]).await?;
        Ok(LyricPayload::from(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> NeteaseClient {
        NeteaseClient::new(&ApiConfig {
            base_url: format!("{}/nmp.php", server.uri()),
            timeout_secs: 5,
            max_retries: 0,
            playlist_limit: 1000,
        })
        .unwrap()
    }

    fn song(id: u64, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "ar": [{"name": "Artist"}],
            "al": {"name": "Album", "picUrl": "http://p1.music.126.net/a.jpg"},
            "dt": 200_000
        })
    }

    #[test]
    fn test_endpoint_url_encodes_params() {
        let client = NeteaseClient::new(&ApiConfig {
            base_url: "https://api.example.com/nmp.php/".into(),
            ..ApiConfig::default()
        })
        .unwrap();

        assert_eq!(
            client.endpoint_url(SONG_DETAIL_ENDPOINT, &[("ids", "1,2")]),
            "https://api.example.com/nmp.php/song/detail?ids=1%2C2"
        );
        assert_eq!(
            client.endpoint_url(SONG_URL_ENDPOINT, &[("id", "9"), ("level", "exhigh")]),
            "https://api.example.com/nmp.php/song/url/v1?id=9&level=exhigh"
        );
    }

    #[tokio::test]
    async fn test_playlist_tracks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nmp.php/playlist/track/all"))
            .and(query_param("id", "14273792576"))
            .and(query_param("limit", "1000"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "songs": [song(1, "One"), song(2, "Two")]
            })))
            .mount(&server)
            .await;

        let tracks = client_for(&server)
            .playlist_tracks("14273792576", 1000, 0)
            .await
            .unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].id, "2");
        assert_eq!(tracks[1].title, "Two");
    }

    #[tokio::test]
    async fn test_non_ok_code_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nmp.php/song/url/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 404, "data": []})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .song_url("5", QualityTier::ExHigh)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::ApiStatus { code: 404, .. }));
    }

    #[tokio::test]
    async fn test_song_url_requests_tier() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nmp.php/song/url/v1"))
            .and(query_param("level", "standard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": [{"id": 5, "url": "http://m7.music.126.net/5.mp3", "br": 128_000, "level": "standard"}]
            })))
            .mount(&server)
            .await;

        let sources = client_for(&server)
            .song_url("5", QualityTier::Standard)
            .await
            .unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].playable_url(), Some("http://m7.music.126.net/5.mp3"));
        assert_eq!(sources[0].bitrate, Some(128_000));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nmp.php/lyric"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client_for(&server).lyrics("5").await.unwrap_err();
        assert!(matches!(err, CoreError::ApiStatus { code: 403, .. }));
    }

    #[tokio::test]
    async fn test_lyrics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nmp.php/lyric"))
            .and(query_param("id", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "lrc": {"lyric": "[00:01.00]hello\n[00:02.00]world"},
                "tlyric": {"lyric": "[00:01.00]你好"}
            })))
            .mount(&server)
            .await;

        let payload = client_for(&server).lyrics("5").await.unwrap();
        let track = payload.to_track();

        assert_eq!(track.len(), 2);
        assert_eq!(track.lines()[0].translation, "你好");
    }
}
