use std::time::Duration;

/// A playable track descriptor, as produced by a [crate::TrackResolver].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// What the transport is asked to play. Either an opaque, transport
    /// specific encoding of the track or a URL.
    pub identifier: String,
    pub title: String,
    pub author: Option<String>,

    /// A link a human can open
    pub canonical: String,
    /// The provider the track came from, e.g. "youtube"
    pub source: String,

    pub duration: Option<Duration>,
    pub artwork: Option<String>,
}

impl Track {
    pub fn new<I, T>(identifier: I, title: T) -> Self
    where
        I: Into<String>,
        T: Into<String>,
    {
        let identifier = identifier.into();

        Self {
            canonical: identifier.clone(),
            identifier,
            title: title.into(),
            author: None,
            source: "unknown".to_string(),
            duration: None,
            artwork: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_canonical(mut self, canonical: impl Into<String>) -> Self {
        self.canonical = canonical.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_artwork(mut self, artwork: Option<String>) -> Self {
        self.artwork = artwork;
        self
    }
}
