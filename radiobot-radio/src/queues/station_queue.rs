use log::{debug, info};
use radiobot_core::{ArcedResolver, ResolveError, Track};
use rand::{seq::SliceRandom, thread_rng};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Station playlist has no tracks")]
    Empty,
    #[error("Failed to resolve station playlist: {0}")]
    Resolve(#[from] ResolveError),
}

/// The tracks of a station, played in a loop.
///
/// The playlist is resolved again every time it runs out, so changes to the
/// backing playlist are picked up, and shuffled once per resolution.
pub struct StationQueue {
    resolver: ArcedResolver,
    link: String,
    shuffle: bool,

    tracks: Vec<Track>,
    cursor: usize,
}

impl StationQueue {
    pub fn new(resolver: ArcedResolver, link: impl Into<String>, shuffle: bool) -> Self {
        Self {
            resolver,
            link: link.into(),
            shuffle,
            tracks: vec![],
            cursor: 0,
        }
    }

    /// Replaces the queue with a fresh resolution of the station, returning the amount of tracks.
    /// The queue is left empty on failure.
    pub async fn refill(&mut self) -> Result<usize, QueueError> {
        self.clear();

        let mut tracks = self.resolver.resolve(&self.link).await?;

        if tracks.is_empty() {
            return Err(QueueError::Empty);
        }

        if self.shuffle {
            tracks.shuffle(&mut thread_rng());
        }

        info!("Queued {} tracks from {}", tracks.len(), self.link);

        self.tracks = tracks;
        Ok(self.tracks.len())
    }

    /// Returns the next track, starting a new cycle when the current one is exhausted.
    pub async fn next(&mut self) -> Result<Track, QueueError> {
        if self.cursor >= self.tracks.len() {
            debug!("Station {} exhausted, starting a new cycle", self.link);
            self.refill().await?;
        }

        let track = self.tracks[self.cursor].clone();
        self.cursor += 1;

        Ok(track)
    }

    /// Points the queue at another station. Takes effect on the next refill.
    pub fn set_source(&mut self, link: impl Into<String>) {
        self.link = link.into();
    }

    /// Takes effect on the next refill.
    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.shuffle = shuffle;
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.cursor = 0;
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    /// The tracks left in the current cycle
    pub fn remaining(&self) -> &[Track] {
        &self.tracks[self.cursor.min(self.tracks.len())..]
    }
}
