use lazy_static::lazy_static;
use radiobot_core::{ResolveError, Track};
use regex::Regex;

use super::TrackLoader;

lazy_static! {
    static ref SEARCH_PREFIX: Regex = Regex::new(r"^[a-z]+search:").unwrap();
}

const DEFAULT_PREFIX: &str = "ytsearch:";

/// A search string, looked up by the voice node. Only the best match is played.
pub struct SearchProvider;

impl SearchProvider {
    /// Returns the identifier the node is asked to load
    pub fn identifier(query: &str) -> String {
        if SEARCH_PREFIX.is_match(query) {
            query.to_string()
        } else {
            format!("{}{}", DEFAULT_PREFIX, query)
        }
    }

    pub async fn fetch(loader: &dyn TrackLoader, query: &str) -> Result<Vec<Track>, ResolveError> {
        let tracks = loader.load_tracks(&Self::identifier(query)).await?;

        Ok(tracks.into_iter().take(1).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_plain_queries() {
        assert_eq!(SearchProvider::identifier("lofi radio"), "ytsearch:lofi radio");
        assert_eq!(SearchProvider::identifier("scsearch:lofi"), "scsearch:lofi");
        assert_eq!(SearchProvider::identifier("ytmsearch:lofi"), "ytmsearch:lofi");
    }
}
