use radiobot_core::Track;
use url::Url;

/// A link to a stream or a file, played as it is.
pub struct DirectProvider;

impl DirectProvider {
    /// Returns true for any http(s) URL with a host
    pub fn test(reference: &str) -> bool {
        Url::parse(reference)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
            .unwrap_or(false)
    }

    pub fn fetch(reference: &str) -> Vec<Track> {
        let title = Url::parse(reference)
            .ok()
            .and_then(|url| title_of(&url))
            .unwrap_or_else(|| reference.to_string());

        vec![Track::new(reference, title).with_source("direct")]
    }
}

fn title_of(url: &Url) -> Option<String> {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last());

    match segment {
        Some(segment) => Some(segment.to_string()),
        None => url.host_str().map(ToString::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_full_urls() {
        assert!(DirectProvider::test("https://radio.example.com/stream.mp3"));
        assert!(DirectProvider::test("http://10.0.0.2:8000/live"));

        assert!(!DirectProvider::test("radio.example.com/stream.mp3"));
        assert!(!DirectProvider::test("ftp://example.com/song.mp3"));
        assert!(!DirectProvider::test("chill beats"));
    }

    #[test]
    fn titles_after_the_last_segment() {
        let tracks = DirectProvider::fetch("https://radio.example.com/live/stream.mp3");

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "stream.mp3");
        assert_eq!(tracks[0].identifier, "https://radio.example.com/live/stream.mp3");
        assert_eq!(tracks[0].source, "direct");

        let tracks = DirectProvider::fetch("https://radio.example.com/");
        assert_eq!(tracks[0].title, "radio.example.com");
    }
}
