use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use radiobot_core::{ResolveError, Track, TrackResolver};
use radiobot_impls::NodeClient;

mod direct;
mod search;
mod youtube;

pub use direct::DirectProvider;
pub use search::SearchProvider;
pub use youtube::YouTubeProvider;

/// The kinds of playlist references a station can have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// A YouTube video or playlist link
    YouTube,
    /// Any other http(s) link, played as a single track
    Direct,
    /// Anything else is searched for
    Search,
}

impl Provider {
    pub fn detect(reference: &str) -> Self {
        if YouTubeProvider::test(reference) {
            return Self::YouTube;
        }

        if DirectProvider::test(reference) {
            return Self::Direct;
        }

        Self::Search
    }
}

/// Something that can turn a transport specific identifier into tracks
#[async_trait]
pub trait TrackLoader: Send + Sync {
    async fn load_tracks(&self, identifier: &str) -> Result<Vec<Track>, ResolveError>;
}

#[async_trait]
impl TrackLoader for NodeClient {
    async fn load_tracks(&self, identifier: &str) -> Result<Vec<Track>, ResolveError> {
        NodeClient::load_tracks(self, identifier).await
    }
}

/// Resolves station playlists by picking a [Provider] once per resolution.
pub struct InputResolver {
    loader: Arc<dyn TrackLoader>,
}

impl InputResolver {
    pub fn new(loader: Arc<dyn TrackLoader>) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl TrackResolver for InputResolver {
    async fn resolve(&self, reference: &str) -> Result<Vec<Track>, ResolveError> {
        let reference = reference.trim();

        if reference.is_empty() {
            return Err(ResolveError::Invalid("Reference is empty".to_string()));
        }

        let provider = Provider::detect(reference);
        debug!("Resolving {} with {:?}", reference, provider);

        match provider {
            Provider::YouTube => YouTubeProvider::fetch(reference).await,
            Provider::Direct => Ok(DirectProvider::fetch(reference)),
            Provider::Search => SearchProvider::fetch(self.loader.as_ref(), reference).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingLoader {
        identifiers: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TrackLoader for RecordingLoader {
        async fn load_tracks(&self, identifier: &str) -> Result<Vec<Track>, ResolveError> {
            self.identifiers.lock().push(identifier.to_string());

            Ok(vec![
                Track::new("encoded-1", "Best match"),
                Track::new("encoded-2", "Second match"),
            ])
        }
    }

    #[test]
    fn detects_providers() {
        assert_eq!(
            Provider::detect("https://www.youtube.com/playlist?list=PL1"),
            Provider::YouTube
        );
        assert_eq!(
            Provider::detect("https://ice.example.org/radio.ogg"),
            Provider::Direct
        );
        assert_eq!(Provider::detect("jazz for studying"), Provider::Search);
    }

    #[tokio::test]
    async fn searches_keep_the_best_match() {
        let loader = Arc::new(RecordingLoader::default());
        let resolver = InputResolver::new(loader.clone());

        let tracks = resolver.resolve("  jazz for studying ").await.unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "Best match");
        assert_eq!(
            *loader.identifiers.lock(),
            vec!["ytsearch:jazz for studying".to_string()]
        );
    }

    #[tokio::test]
    async fn direct_links_skip_the_loader() {
        let loader = Arc::new(RecordingLoader::default());
        let resolver = InputResolver::new(loader.clone());

        let tracks = resolver
            .resolve("https://ice.example.org/radio.ogg")
            .await
            .unwrap();

        assert_eq!(tracks[0].identifier, "https://ice.example.org/radio.ogg");
        assert!(loader.identifiers.lock().is_empty());
    }

    #[tokio::test]
    async fn rejects_empty_references() {
        let resolver = InputResolver::new(Arc::new(RecordingLoader::default()));

        assert!(matches!(
            resolver.resolve("   ").await,
            Err(ResolveError::Invalid(_))
        ));
    }
}
