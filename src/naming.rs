//! Output file naming.
//!
//! Every stored file gets a random 8-hex-character base name and keeps the extension
//! of the name it arrived with, or one derived from its MIME type when the name has
//! none. Names are not checked against the output directory:
//! with a 32-bit namespace a collision is improbable enough to accept.

use rand::RngCore;
use std::path::Path;

/// Number of random bytes in a generated base name
const NAME_BYTES: usize = 4;

/// MIME types whose extension is not simply their subtype
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("video/quicktime", "mov"),
    ("video/x-matroska", "mkv"),
    ("video/x-msvideo", "avi"),
    ("video/3gpp", "3gp"),
    ("video/mp2t", "ts"),
    ("application/x-bittorrent", "torrent"),
];

/// Assign a fresh output name for a file originally called `original_name`.
///
/// ```
/// let name = relay_dl::naming::assign("holiday video.mp4");
/// assert!(name.ends_with(".mp4"));
/// assert_eq!(name.len(), 8 + ".mp4".len());
/// ```
pub fn assign(original_name: &str) -> String {
    assign_with_extension(extension_of(original_name))
}

/// Assign a fresh output name ending in `.{extension}`, or a bare base name.
pub fn assign_with_extension(extension: Option<&str>) -> String {
    let base = random_base_name();
    match extension {
        Some(ext) => format!("{}.{}", base, ext),
        None => base,
    }
}

/// Extension of `name` without the dot, `None` if it has none.
pub fn extension_of(name: &str) -> Option<&str> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
}

/// Extension for a MIME type such as `video/mp4`, `None` if none can be derived.
///
/// Parameters after `;` are ignored. Types without a known mapping use their
/// subtype when it is plain alphanumeric.
pub fn extension_for_mime(mime: &str) -> Option<&str> {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    if let Some((_, ext)) = MIME_EXTENSIONS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(essence))
    {
        return Some(*ext);
    }

    let (_, subtype) = essence.split_once('/')?;
    (!subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric())).then_some(subtype)
}

fn random_base_name() -> String {
    let mut bytes = [0u8; NAME_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
