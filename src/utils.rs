//! Utility functions for filenames and path manipulation

use crate::error::DownloadError;
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Maximum length (in characters) of a sanitized file stem
pub const MAX_STEM_CHARS: usize = 120;

/// Get a collision-free path for a file.
///
/// If `is_taken` reports the path as taken, ` (1)`, ` (2)`, ... is inserted
/// before the extension until a free name is found.
///
/// # Examples
///
/// ```
/// use subreddit_dl::utils::get_unique_path;
/// use std::path::Path;
///
/// let taken = [Path::new("/tmp/lake.jpg").to_path_buf()];
/// let unique = get_unique_path(Path::new("/tmp/lake.jpg"), |p| taken.contains(&p.to_path_buf())).unwrap();
/// assert_eq!(unique, Path::new("/tmp/lake (1).jpg"));
/// ```
pub fn get_unique_path(
    path: &Path,
    is_taken: impl Fn(&Path) -> bool,
) -> Result<PathBuf, DownloadError> {
    if !is_taken(path) {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| DownloadError::InvalidName {
            reason: format!("cannot extract file stem from {}", path.display()),
        })?;
    let extension = path.extension().and_then(|e| e.to_str());
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let new_name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        let new_path = parent.join(new_name);
        if !is_taken(&new_path) {
            return Ok(new_path);
        }
    }

    Err(DownloadError::FileCollision {
        path: path.to_path_buf(),
    })
}

/// Turn a post title into a portable file stem.
///
/// Path separators, reserved characters and control characters are dropped,
/// whitespace runs become a single underscore, and the result is truncated to
/// [`MAX_STEM_CHARS`]. Returns an empty string if nothing usable remains.
///
/// # Examples
///
/// ```
/// use subreddit_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Lake Tahoe, CA [OC] 4000x3000"), "Lake_Tahoe,_CA_[OC]_4000x3000");
/// assert_eq!(sanitize_filename("a/b\\c:d"), "abcd");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;

    for c in name.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
            continue;
        }
        if pending_space {
            out.push('_');
            pending_space = false;
        }
        out.push(c);
    }

    let out: String = out.chars().take(MAX_STEM_CHARS).collect();
    // Leading dots would hide the file; trailing dots are invalid on Windows
    out.trim_matches('.').trim_end_matches('_').to_string()
}

/// File extension for a `Content-Type` header value, if it names a media type
pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    let ext = match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "text/html" => "html",
        _ => return None,
    };
    Some(ext)
}
