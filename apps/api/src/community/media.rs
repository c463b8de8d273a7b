use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

/// Metadata for an attachment held in external object storage. Only the
/// description is stored here, never the bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Media {
    pub kind: MediaKind,
    pub url: String,
    pub format: String,
    pub size_bytes: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<f64>,
}

impl Media {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.url.trim().is_empty() {
            return Err(AppError::validation("Media url is required"));
        }
        if self.format.trim().is_empty() {
            return Err(AppError::validation("Media format is required"));
        }
        if self.size_bytes <= 0 {
            return Err(AppError::validation("Media size must be positive"));
        }
        let has_dimensions = self.width.is_some() || self.height.is_some();
        if has_dimensions && self.kind == MediaKind::Audio {
            return Err(AppError::validation("Audio media cannot have dimensions"));
        }
        if let Some(duration) = self.duration_secs {
            if self.kind == MediaKind::Image {
                return Err(AppError::validation("Image media cannot have a duration"));
            }
            if !duration.is_finite() || duration < 0.0 {
                return Err(AppError::validation("Media duration must be non-negative"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> Media {
        Media {
            kind: MediaKind::Image,
            url: "https://cdn.example.com/a.png".to_string(),
            format: "png".to_string(),
            size_bytes: 2048,
            width: Some(640),
            height: Some(480),
            duration_secs: None,
        }
    }

    #[test]
    fn test_valid_image() {
        assert!(image().validate().is_ok());
    }

    #[test]
    fn test_missing_url_rejected() {
        let media = Media {
            url: " ".to_string(),
            ..image()
        };
        assert!(matches!(media.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_zero_size_rejected() {
        let media = Media {
            size_bytes: 0,
            ..image()
        };
        assert!(media.validate().is_err());
    }

    #[test]
    fn test_audio_with_dimensions_rejected() {
        let media = Media {
            kind: MediaKind::Audio,
            duration_secs: Some(12.5),
            ..image()
        };
        assert!(media.validate().is_err());
    }

    #[test]
    fn test_image_with_duration_rejected() {
        let media = Media {
            duration_secs: Some(3.0),
            ..image()
        };
        assert!(media.validate().is_err());
    }

    #[test]
    fn test_video_with_everything_is_fine() {
        let media = Media {
            kind: MediaKind::Video,
            format: "mp4".to_string(),
            duration_secs: Some(30.0),
            ..image()
        };
        assert!(media.validate().is_ok());
    }

    #[test]
    fn test_kind_deserializes_lowercase() {
        let media: Media = serde_json::from_str(
            r#"{"kind":"video","url":"u","format":"webm","size_bytes":10,"width":null,"height":null,"duration_secs":null}"#,
        )
        .unwrap();
        assert_eq!(media.kind, MediaKind::Video);
    }
}
