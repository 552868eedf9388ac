use std::{process::Stdio, time::Duration};

use radiobot_core::{ResolveError, Track};
use serde::Deserialize;
use tokio::{io::AsyncReadExt, process::Command};
use url::Url;

use crate::util::with_https_scheme;

const YT_UNAVAILABLE: &str = "Video unavailable. This video is not available";
const YT_NOT_FOUND: &str = "Video unavailable";
const YT_ID_ERROR: &str = "Incomplete YouTube ID";
const YT_PRIVATE_PLAYLIST: &str = "The playlist does not exist";

/// YouTube videos and playlists, expanded with yt-dlp.
pub struct YouTubeProvider;

#[derive(Debug, Deserialize)]
struct FlatYouTubeVideo {
    id: String,
    title: String,
    channel: Option<String>,
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
    width: Option<u32>,
}

// Deleted and private entries of a playlist come without a title
#[derive(Debug, Deserialize)]
struct DeletedYouTubeVideo {
    #[allow(dead_code)]
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YouTubeVideo {
    Flat(FlatYouTubeVideo),
    Deleted(DeletedYouTubeVideo),
}

#[derive(Debug, Deserialize)]
struct YouTubePlaylist {
    entries: Vec<YouTubeVideo>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YouTubeResource {
    Playlist(YouTubePlaylist),
    Video(FlatYouTubeVideo),
}

impl YouTubeProvider {
    /// Returns true for links to a video or a playlist
    pub fn test(reference: &str) -> bool {
        let Ok(url) = Url::parse(&with_https_scheme(reference)) else {
            return false;
        };

        let has_query = |key: &str| url.query_pairs().any(|(k, v)| k == key && !v.is_empty());

        if url
            .host_str()
            .filter(|host| host.ends_with("youtube.com"))
            .is_some()
        {
            let path = url.path();

            return (path.starts_with("/watch") && has_query("v"))
                || path.starts_with("/v/")
                || path.starts_with("/shorts/")
                || (path == "/playlist" && has_query("list"));
        }

        url.host_str() == Some("youtu.be") && url.path().len() > 1
    }

    /// Fetches the video, or every available video of the playlist, in playlist order.
    pub async fn fetch(reference: &str) -> Result<Vec<Track>, ResolveError> {
        let resource = YouTubeResource::fetch(reference).await?;

        match resource {
            YouTubeResource::Video(video) => Ok(vec![video.into()]),
            YouTubeResource::Playlist(playlist) => Ok(playlist
                .entries
                .into_iter()
                .filter_map(|v| match v {
                    YouTubeVideo::Flat(v) => Some(v),
                    YouTubeVideo::Deleted(_) => None,
                })
                .map(Into::into)
                .collect()),
        }
    }
}

impl YouTubeResource {
    /// Attempts to fetch a video or a playlist from the given URL using yt-dlp.
    async fn fetch(url: &str) -> Result<Self, ResolveError> {
        let mut child = Command::new("yt-dlp")
            // Only list the entries of playlists
            .arg("--flat-playlist")
            .arg("--skip-download")
            // A single JSON document for the whole resource
            .arg("-J")
            .args(["--", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ResolveError::Other(e.to_string()))?;

        let mut output = String::new();
        let mut error_output = String::new();

        if let Some(mut stdout) = child.stdout.take() {
            stdout
                .read_to_string(&mut output)
                .await
                .map_err(|e| ResolveError::Other(e.to_string()))?;
        }

        if let Some(mut stderr) = child.stderr.take() {
            stderr.read_to_string(&mut error_output).await.ok();
        }

        let exit = child
            .wait()
            .await
            .map_err(|e| ResolveError::Other(e.to_string()))?;

        if !exit.success() {
            return Err(classify_error(error_output));
        }

        serde_json::from_str(&output).map_err(|e| ResolveError::ParseError(e.to_string()))
    }
}

fn classify_error(error_output: String) -> ResolveError {
    if error_output.contains(YT_UNAVAILABLE) {
        return ResolveError::Unavailable;
    }

    if error_output.contains(YT_NOT_FOUND) || error_output.contains(YT_PRIVATE_PLAYLIST) {
        return ResolveError::NotFound;
    }

    if error_output.contains(YT_ID_ERROR) {
        return ResolveError::Invalid("Invalid video ID".to_string());
    }

    ResolveError::FetchError(error_output.trim().to_string())
}

impl From<FlatYouTubeVideo> for Track {
    fn from(video: FlatYouTubeVideo) -> Self {
        let url = format!("https://www.youtube.com/watch?v={}", video.id);
        let mut track = Track::new(url, video.title)
            .with_source("youtube")
            .with_duration(video.duration.map(Duration::from_secs_f64))
            .with_artwork(largest_thumbnail(video.thumbnails));

        track.author = video.channel;
        track
    }
}

fn largest_thumbnail(mut thumbnails: Vec<Thumbnail>) -> Option<String> {
    thumbnails.sort_by_key(|t| t.width);
    thumbnails
        .pop()
        .map(|t| t.url.replace("hqdefault", "maxresdefault"))
}
