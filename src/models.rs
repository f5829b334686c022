//! Core data model: resolved post records and the transient fragments
//! produced by the field extractor before a record is built.

use serde::{Deserialize, Serialize};

/// What kind of media a resolved record carries. Always derived from the
/// URL fields, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    ImageOnly,
    Empty,
}

/// Canonical resolved state for one post id. One row per id in the cache;
/// a record whose derived kind is `Empty` is a negative-cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostRecord {
    pub id: String,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub username: String,
    pub profile_url: String,
    pub permalink: String,
    pub likes: i64,
    pub comments: i64,
    pub views: i64,
    /// Epoch seconds after which this record counts as a cache miss.
    pub expires_at: i64,
}

impl PostRecord {
    pub fn media_kind(&self) -> MediaKind {
        match (&self.video_url, &self.thumbnail_url) {
            (Some(_), _) => MediaKind::Video,
            (None, Some(_)) => MediaKind::ImageOnly,
            (None, None) => MediaKind::Empty,
        }
    }

    /// True for negative-cache entries ("resolution attempted, nothing found").
    pub fn is_empty(&self) -> bool {
        self.media_kind() == MediaKind::Empty
    }
}

/// Raw field values pulled out of a provider page or API response.
/// `None` means the field marker was absent from the source buffer, which is
/// distinct from a field that was present but empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFragment {
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_video: Option<String>,
    pub title: Option<String>,
    pub views: Option<String>,
    pub comments: Option<String>,
    pub likes: Option<String>,
    pub username: Option<String>,
}

impl ExtractedFragment {
    /// True when no field at all was found in the source.
    pub fn is_empty(&self) -> bool {
        self.video_url.is_none()
            && self.thumbnail_url.is_none()
            && self.is_video.is_none()
            && self.title.is_none()
            && self.views.is_none()
            && self.comments.is_none()
            && self.likes.is_none()
            && self.username.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(video: Option<&str>, thumb: Option<&str>) -> PostRecord {
        PostRecord {
            id: "DTEST".to_string(),
            video_url: video.map(str::to_string),
            thumbnail_url: thumb.map(str::to_string),
            username: String::new(),
            profile_url: String::new(),
            permalink: String::new(),
            likes: 0,
            comments: 0,
            views: 0,
            expires_at: 0,
        }
    }

    #[test]
    fn media_kind_derivation() {
        assert_eq!(
            record(Some("https://cdn/x.mp4"), None).media_kind(),
            MediaKind::Video
        );
        assert_eq!(
            record(Some("https://cdn/x.mp4"), Some("https://cdn/t.jpg")).media_kind(),
            MediaKind::Video
        );
        assert_eq!(
            record(None, Some("https://cdn/t.jpg")).media_kind(),
            MediaKind::ImageOnly
        );
        assert_eq!(record(None, None).media_kind(), MediaKind::Empty);
        assert!(record(None, None).is_empty());
    }

    #[test]
    fn fragment_emptiness() {
        assert!(ExtractedFragment::default().is_empty());

        let frag = ExtractedFragment {
            username: Some(String::new()),
            ..Default::default()
        };
        // Present-but-empty is still present.
        assert!(!frag.is_empty());
    }
}
