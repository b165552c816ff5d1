//! Utility functions for remote file names

/// Fallback name when neither the response nor the URL carries one
const FALLBACK_NAME: &str = "download";

/// Extract the remote file name (extension included) from an HTTP response
///
/// Tries the Content-Disposition header first (`filename=` and RFC 5987
/// `filename*=`), then the last segment of the URL path (percent-decoded).
///
/// # Examples
///
/// ```ignore
/// let response = reqwest::get("https://example.com/a%20b.mp4").await?;
/// let name = remote_file_name(&response, "https://example.com/a%20b.mp4");
/// // Returns "a b.mp4"
/// ```
pub fn remote_file_name(response: &reqwest::Response, url: &str) -> String {
    if let Some(content_disposition) = response.headers().get("content-disposition")
        && let Ok(value) = content_disposition.to_str()
        && let Some(name) = file_name_from_disposition(value)
    {
        return name;
    }

    file_name_from_url(url).unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// Parse the file name out of a Content-Disposition header value
///
/// Format: `attachment; filename="file.mp4"` or `filename*=UTF-8''file%20name.mp4`
pub fn file_name_from_disposition(value: &str) -> Option<String> {
    for part in value.split(';') {
        let part = part.trim();
        if let Some(encoded) = part.strip_prefix("filename*=") {
            // charset'lang'encoded-filename
            if let Some(idx) = encoded.rfind('\'')
                && let Ok(decoded) = urlencoding::decode(&encoded[idx + 1..])
                && !decoded.is_empty()
            {
                return Some(decoded.into_owned());
            }
        } else if let Some(raw) = part.strip_prefix("filename=") {
            let name = raw.trim_matches('"');
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Last non-empty path segment of `url`, percent-decoded
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    Some(
        urlencoding::decode(last)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| last.to_string()),
    )
}
