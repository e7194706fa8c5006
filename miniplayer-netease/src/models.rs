//! Wire types of the NetEase proxy API.
//!
//! Every response carries a numeric `code`; anything but 200 is a failure.
//! The API returns many more fields than listed here, serde ignores them.

use miniplayer_core::{LyricPayload, StreamSource, Track};
use serde::Deserialize;
use std::time::Duration;

/// Success code of every endpoint
pub const CODE_OK: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub code: i64,
}

#[derive(Debug, Deserialize)]
pub struct SongsResponse {
    #[serde(default)]
    pub songs: Vec<SongDto>,
}

#[derive(Debug, Deserialize)]
pub struct SongDto {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ar: Vec<ArtistDto>,
    #[serde(default)]
    pub al: Option<AlbumDto>,
    /// Duration in milliseconds
    #[serde(default)]
    pub dt: u64,
}

#[derive(Debug, Deserialize)]
pub struct ArtistDto {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumDto {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "picUrl", default)]
    pub pic_url: Option<String>,
}

impl From<SongDto> for Track {
    fn from(song: SongDto) -> Self {
        let (album, cover_url) = song
            .al
            .map(|al| (al.name, al.pic_url.unwrap_or_default()))
            .unwrap_or_default();
        Self::new(
            song.id.to_string(),
            song.name,
            song.ar.into_iter().map(|ar| ar.name).collect(),
            album,
            cover_url,
            Duration::from_millis(song.dt),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SongUrlResponse {
    #[serde(default)]
    pub data: Vec<SongUrlDto>,
}

#[derive(Debug, Deserialize)]
pub struct SongUrlDto {
    pub id: u64,
    pub url: Option<String>,
    pub br: Option<u64>,
    pub level: Option<String>,
}

impl From<SongUrlDto> for StreamSource {
    fn from(dto: SongUrlDto) -> Self {
        Self {
            track_id: dto.id.to_string(),
            url: dto.url,
            bitrate: dto.br,
            level: dto.level,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LyricResponse {
    pub lrc: Option<LyricBlock>,
    pub tlyric: Option<LyricBlock>,
}

#[derive(Debug, Deserialize)]
pub struct LyricBlock {
    pub lyric: Option<String>,
}

impl From<LyricResponse> for LyricPayload {
    fn from(response: LyricResponse) -> Self {
        let text = |block: Option<LyricBlock>| {
            block
                .and_then(|b| b.lyric)
                .filter(|lyric| !lyric.trim().is_empty())
        };
        Self::new(text(response.lrc), text(response.tlyric))
    }
}
