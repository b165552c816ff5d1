//! Retrieval link construction.
//!
//! Links mirror the exporter's layout: `<host>/<name>` for files stored directly in
//! the output directory and `<host>/<swarm name>/<file name>` for multi-file swarms.
//! Names come straight from users and swarms, so the joined link is normalized:
//! percent-decoded once, then the characters that break chat auto-linking
//! (brackets, parentheses, whitespace) are re-encoded.

use crate::error::Error;
use crate::types::OutputFile;

/// Build a retrieval link from the public host and the file's path segments.
pub fn build_link<S: AsRef<str>>(host: &str, segments: &[S]) -> String {
    let mut link = host.trim_end_matches('/').to_string();
    for segment in segments {
        link.push('/');
        link.push_str(segment.as_ref().trim_matches('/'));
    }
    normalize_url(&link)
}

/// Build the retrieval link for an output file.
pub fn link_for(host: &str, output: &OutputFile) -> String {
    build_link(host, output.path_segments.as_slice())
}

/// Normalize a link, returning the input unchanged if it cannot be decoded.
pub fn normalize_url(input: &str) -> String {
    match try_normalize(input) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(url = input, error = %e, "Failed to normalize link, using it as-is");
            input.to_string()
        }
    }
}

fn try_normalize(input: &str) -> Result<String, Error> {
    let decoded = urlencoding::decode(input).map_err(|e| Error::Publish(e.to_string()))?;

    let mut out = String::with_capacity(decoded.len() + 8);
    for c in decoded.chars() {
        match c {
            '[' => out.push_str("%5B"),
            ']' => out.push_str("%5D"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            c if c.is_whitespace() => out.push_str("%20"),
            c => out.push(c),
        }
    }
    Ok(out)
}
