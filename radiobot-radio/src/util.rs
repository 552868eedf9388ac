use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Matches the scheme of a URL, or the start of one that has none
    pub static ref URL_SCHEME_REGEX: Regex = Regex::new(r"^(https?://)?").unwrap();
}

/// Returns the reference with a https scheme, so scheme-less links still parse as URLs
pub fn with_https_scheme(reference: &str) -> String {
    URL_SCHEME_REGEX.replace(reference, "https://").into_owned()
}
