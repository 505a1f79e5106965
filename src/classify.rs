//! Item classifier -- turns raw listing posts into [`MediaItem`]s.
//!
//! Posts that do not point at anything downloadable (removed posts, link posts
//! to arbitrary web pages, galleries without a direct URL) are discarded here
//! and never reach the filter chain.

use crate::listing::RawPost;
use crate::types::{ContentType, MediaItem, Orientation};
use chrono::{DateTime, Utc};

/// File extensions treated as still images
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// File extensions treated as videos
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];

/// Hosts whose links are always direct media files
const DIRECT_MEDIA_HOSTS: &[&str] = &["i.redd.it", "i.imgur.com"];

/// Classify a raw post.
///
/// Returns `None` for posts that cannot be downloaded or displayed.
pub fn classify(post: RawPost) -> Option<MediaItem> {
    if post.id.is_empty() || post.removed_by_category.is_some() {
        return None;
    }

    let (content_type, url, width, height) = resolve_media(&post)?;
    let created_at = post
        .created_utc
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0));

    Some(MediaItem {
        orientation: Orientation::from_dimensions(width, height),
        id: post.id,
        title: post.title,
        url,
        width,
        height,
        content_type,
        nsfw: post.over_18,
        subreddit: post.subreddit,
        created_at,
    })
}

/// Classify every post of a page, keeping upstream order
pub fn classify_all(posts: Vec<RawPost>) -> Vec<MediaItem> {
    posts.into_iter().filter_map(classify).collect()
}

/// Pick the media kind, URL and dimensions for a post
fn resolve_media(post: &RawPost) -> Option<(ContentType, String, u32, u32)> {
    let (preview_width, preview_height) = preview_dimensions(post);

    if post.is_self {
        let url = post.url.clone().unwrap_or_default();
        return Some((ContentType::Text, url, 0, 0));
    }

    if let Some(video) = post.media.as_ref().and_then(|m| m.reddit_video.as_ref())
        && !video.fallback_url.is_empty()
    {
        let (width, height) = if video.width > 0 && video.height > 0 {
            (video.width, video.height)
        } else {
            (preview_width, preview_height)
        };
        return Some((
            ContentType::Video,
            unescape(&video.fallback_url),
            width,
            height,
        ));
    }

    let url = unescape(post.url.as_deref()?);
    let extension = url_extension(&url);

    // imgur's gifv pages are html wrappers around an mp4
    if extension.as_deref() == Some("gifv")
        && let Ok(mut mp4) = url::Url::parse(&url)
    {
        let path = format!("{}.mp4", &mp4.path()[..mp4.path().len() - ".gifv".len()]);
        mp4.set_path(&path);
        mp4.set_query(None);
        return Some((
            ContentType::Video,
            mp4.to_string(),
            preview_width,
            preview_height,
        ));
    }

    if let Some(ext) = extension.as_deref() {
        if IMAGE_EXTENSIONS.contains(&ext) {
            return Some((ContentType::Image, url, preview_width, preview_height));
        }
        if VIDEO_EXTENSIONS.contains(&ext) {
            return Some((ContentType::Video, url, preview_width, preview_height));
        }
    }

    let direct_host = url::Url::parse(&url)
        .ok()
        .and_then(|u| u.host_str().map(|h| DIRECT_MEDIA_HOSTS.contains(&h)))
        .unwrap_or(false);
    if direct_host || post.post_hint.as_deref() == Some("image") {
        return Some((ContentType::Image, url, preview_width, preview_height));
    }

    None
}

fn preview_dimensions(post: &RawPost) -> (u32, u32) {
    post.preview
        .as_ref()
        .and_then(|p| p.images.first())
        .map(|img| (img.source.width, img.source.height))
        .unwrap_or((0, 0))
}

/// Lower-cased extension of the last path segment of a URL
pub(crate) fn url_extension(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Undo the HTML escaping the listing API applies without `raw_json=1`
fn unescape(url: &str) -> String {
    url.replace("&amp;", "&")
}
