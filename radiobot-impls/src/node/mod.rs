use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use radiobot_core::{
    AudioTransport, ChannelId, GuildId, ResolveError, Track, TransportError, TransportEventReceiver,
    TransportEventSender, TransportHandle, Volume,
};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use tokio::{sync::broadcast, task::JoinHandle, time::sleep};

mod events;
mod wire;

pub use events::*;
use wire::{ConnectBody, ConnectResponse, LoadResult, MessageBody, PlayBody, VolumeBody};

/// A client for a remote voice node, which joins voice channels, plays
/// tracks, loads tracks from references, and reports what happens to them.
pub struct NodeClient {
    base_url: String,
    password: String,
    client: Client,
    events: TransportEventSender,
    ready_poll_interval: Duration,
}

impl NodeClient {
    const EVENT_CAPACITY: usize = 256;
    const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

    pub fn new<U, P>(base_url: U, password: P) -> Self
    where
        U: Into<String>,
        P: Into<String>,
    {
        let (events, _) = broadcast::channel(Self::EVENT_CAPACITY);

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            password: password.into(),
            client: Client::new(),
            events,
            ready_poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_ready_poll_interval(mut self, interval: Duration) -> Self {
        self.ready_poll_interval = interval;
        self
    }

    /// Spawns the task that streams node events into [AudioTransport::subscribe] receivers.
    /// The stream is reopened whenever it ends or fails.
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let node = self.clone();

        tokio::spawn(async move {
            let mut failures = 0;

            loop {
                match node.stream_events().await {
                    Ok(()) => {
                        warn!("Node event stream ended, reopening it");
                        failures = 0;
                    }
                    Err(error) => {
                        warn!("Node event stream failed: {}", error);
                        failures += 1;
                    }
                }

                sleep(reconnect_delay(failures)).await;
            }
        })
    }

    /// Asks the node to load the given identifier, which is a URL or a
    /// prefixed search query such as `ytsearch:lofi radio`.
    pub async fn load_tracks(&self, identifier: &str) -> Result<Vec<Track>, ResolveError> {
        let response = self
            .request(Method::GET, "/v1/loadtracks")
            .query(&[("identifier", identifier)])
            .send()
            .await
            .map_err(|e| ResolveError::FetchError(e.to_string()))?;

        let response = checked(response)
            .await
            .map_err(|e| ResolveError::FetchError(e.to_string()))?;

        let result: LoadResult = response
            .json()
            .await
            .map_err(|e| ResolveError::ParseError(e.to_string()))?;

        match result {
            LoadResult::Track(track) => Ok(vec![track.into()]),
            LoadResult::Playlist(playlist) => {
                Ok(playlist.tracks.into_iter().map(Into::into).collect())
            }
            LoadResult::Search(tracks) => Ok(tracks.into_iter().map(Into::into).collect()),
            LoadResult::Empty(_) => Ok(vec![]),
            LoadResult::Error(exception) if exception.severity == "common" => {
                Err(ResolveError::Unavailable)
            }
            LoadResult::Error(exception) => Err(ResolveError::FetchError(
                exception
                    .message
                    .unwrap_or_else(|| "Unknown node error".to_string()),
            )),
        }
    }

    async fn stream_events(&self) -> Result<(), TransportError> {
        let response = self
            .request(Method::GET, "/v1/events")
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| e.into_transport_error())?;

        let mut stream = checked(response).await?.bytes_stream();
        let mut parser = EventStreamParser::default();

        info!("Listening to node events");

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| e.into_transport_error())?;

            for payload in parser.push(&chunk) {
                match parse_event(&payload) {
                    // Nobody listening is fine
                    Some(event) => drop(self.events.send(event)),
                    None => debug!("Ignoring node event: {}", payload),
                }
            }
        }

        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(header::AUTHORIZATION, &self.password)
    }

    fn connection_path(handle: &TransportHandle) -> String {
        format!(
            "/v1/guilds/{}/connections/{}",
            handle.guild_id, handle.connection_id
        )
    }
}

#[async_trait]
impl AudioTransport for NodeClient {
    async fn wait_until_ready(&self) {
        let mut reported = false;

        loop {
            let result = self.request(Method::GET, "/v1/ready").send().await;

            match result {
                Ok(response) if response.status().is_success() => {
                    info!("Voice node is ready");
                    return;
                }
                Ok(response) if !reported => {
                    info!("Waiting for voice node (status {})", response.status());
                    reported = true;
                }
                Err(error) if !reported => {
                    warn!("Waiting for voice node: {}", error);
                    reported = true;
                }
                _ => {}
            }

            sleep(self.ready_poll_interval).await;
        }
    }

    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<TransportHandle, TransportError> {
        let response = self
            .request(Method::POST, &format!("/v1/guilds/{}/connections", guild_id))
            .json(&ConnectBody::new(channel_id))
            .send()
            .await
            .map_err(|e| e.into_transport_error())?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(TransportError::ChannelNotFound(channel_id)),
            StatusCode::FORBIDDEN => return Err(TransportError::PermissionDenied(channel_id)),
            _ => {}
        }

        let body: ConnectResponse = checked(response)
            .await?
            .json()
            .await
            .map_err(|e| e.into_transport_error())?;

        Ok(TransportHandle {
            guild_id,
            channel_id,
            connection_id: body.connection_id,
        })
    }

    async fn play(
        &self,
        handle: &TransportHandle,
        track: &Track,
        volume: Volume,
    ) -> Result<(), TransportError> {
        let path = format!("{}/track", Self::connection_path(handle));
        let body = PlayBody {
            track: &track.identifier,
            volume: volume.get(),
        };

        let response = self
            .request(Method::PUT, &path)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.into_transport_error())?;

        checked(response).await.map(drop)
    }

    async fn set_volume(
        &self,
        handle: &TransportHandle,
        volume: Volume,
    ) -> Result<(), TransportError> {
        let path = format!("{}/volume", Self::connection_path(handle));

        let response = self
            .request(Method::PUT, &path)
            .json(&VolumeBody {
                volume: volume.get(),
            })
            .send()
            .await
            .map_err(|e| e.into_transport_error())?;

        checked(response).await.map(drop)
    }

    async fn disconnect(&self, handle: &TransportHandle) -> Result<(), TransportError> {
        let response = self
            .request(Method::DELETE, &Self::connection_path(handle))
            .send()
            .await
            .map_err(|e| e.into_transport_error())?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }

        checked(response).await.map(drop)
    }

    async fn announce(&self, channel_id: ChannelId, message: &str) -> Result<(), TransportError> {
        let response = self
            .request(Method::POST, &format!("/v1/channels/{}/messages", channel_id))
            .json(&MessageBody { content: message })
            .send()
            .await
            .map_err(|e| e.into_transport_error())?;

        checked(response).await.map(drop)
    }

    fn subscribe(&self) -> TransportEventReceiver {
        self.events.subscribe()
    }
}

/// Helper trait to reduce boilerplate
pub trait IntoTransportError {
    fn into_transport_error(self) -> TransportError;
}

impl IntoTransportError for reqwest::Error {
    fn into_transport_error(self) -> TransportError {
        if self.is_connect() || self.is_timeout() {
            TransportError::Unavailable
        } else {
            TransportError::Request(self.to_string())
        }
    }
}

/// Turns a non-success response into a [TransportError::Rejected] carrying the body.
async fn checked(response: Response) -> Result<Response, TransportError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Rejected(format!("{}: {}", status, body)))
}

fn reconnect_delay(failures: u32) -> Duration {
    Duration::from_millis(500)
        .saturating_mul(2u32.saturating_pow(failures.min(8)))
        .min(NodeClient::MAX_RECONNECT_DELAY)
}
