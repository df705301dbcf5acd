//! Field extraction
//!
//! Maps the field names used in rule sets onto the values of a [`RawHit`].

use crate::catalog::RawHit;

/// The fixed vocabulary of hit fields rule sets can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitField {
    Channel,
    Topic,
    Title,
    Description,
    Timestamp,
    Duration,
    Size,
    UrlVideoLow,
    UrlVideo,
    UrlVideoHd,
}

impl HitField {
    /// Looks a field up by its rule set name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let field = match name.trim().to_ascii_lowercase().as_str() {
            "channel" => Self::Channel,
            "topic" => Self::Topic,
            "title" => Self::Title,
            "description" => Self::Description,
            "timestamp" => Self::Timestamp,
            "duration" => Self::Duration,
            "size" => Self::Size,
            "url_video_low" => Self::UrlVideoLow,
            "url_video" => Self::UrlVideo,
            "url_video_hd" => Self::UrlVideoHd,
            _ => return None,
        };
        Some(field)
    }

    /// String form of this field on `hit`; numeric fields are stringified
    pub fn value(self, hit: &RawHit) -> String {
        match self {
            Self::Channel => hit.channel.clone(),
            Self::Topic => hit.topic.clone(),
            Self::Title => hit.title.clone(),
            Self::Description => hit.description.clone(),
            Self::Timestamp => hit.timestamp.to_string(),
            Self::Duration => hit.duration.to_string(),
            Self::Size => hit.size.to_string(),
            Self::UrlVideoLow => hit.url_video_low.clone(),
            Self::UrlVideo => hit.url_video.clone(),
            Self::UrlVideoHd => hit.url_video_hd.clone(),
        }
    }
}

/// Returns the named field of `hit`, or an empty string for unknown names.
pub fn extract_field(hit: &RawHit, name: &str) -> String {
    HitField::from_name(name)
        .map(|field| field.value(hit))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_field() {
        let hit = RawHit {
            topic: "Tatort".to_string(),
            duration: 5400,
            url_video_hd: "https://example.invalid/hd.mp4".to_string(),
            ..Default::default()
        };

        assert_eq!(extract_field(&hit, "topic"), "Tatort");
        assert_eq!(extract_field(&hit, "Duration"), "5400");
        assert_eq!(extract_field(&hit, "url_video_hd"), "https://example.invalid/hd.mp4");
        assert_eq!(extract_field(&hit, "description"), "");
        assert_eq!(extract_field(&hit, "rating"), "");
    }
}
