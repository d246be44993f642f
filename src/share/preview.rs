//! Inline preview classification.

use std::path::Path;

use super::gate::TransferLimits;

/// Content families that can be rendered inline by a browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Text,
    Image,
    Pdf,
    Video,
    Audio,
}

/// Outcome of classifying a file for preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewDecision {
    Inline(PreviewKind),
    TooLarge,
    Unsupported,
}

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "csv", "json", "xml", "html", "htm", "css", "js", "log", "ini", "conf", "yaml",
    "yml", "toml",
];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "ico"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogv", "mov", "m4v"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "oga", "flac", "m4a", "aac"];

/// Decides whether a file may be shown inline.
#[derive(Debug, Clone, Copy)]
pub struct PreviewClassifier {
    text_ceiling: u64,
    default_ceiling: u64,
}

impl PreviewClassifier {
    pub fn new(limits: &TransferLimits) -> Self {
        Self {
            text_ceiling: limits.max_text_preview_size,
            default_ceiling: limits.max_preview_size,
        }
    }

    /// Classify a file by name, size and media type.
    ///
    /// Unknown content is `Unsupported` regardless of size; otherwise the
    /// ceiling for its kind decides between `Inline` and `TooLarge`.
    pub fn classify(&self, name: &str, size: u64, media_type: &str) -> PreviewDecision {
        let Some(kind) = preview_kind(name, media_type) else {
            return PreviewDecision::Unsupported;
        };

        let ceiling = match kind {
            PreviewKind::Text => self.text_ceiling,
            _ => self.default_ceiling,
        };
        if size > ceiling {
            return PreviewDecision::TooLarge;
        }

        PreviewDecision::Inline(kind)
    }
}

/// Preview kind from the extension first, then the media type.
pub fn preview_kind(name: &str, media_type: &str) -> Option<PreviewKind> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if let Some(ext) = extension.as_deref() {
        if TEXT_EXTENSIONS.contains(&ext) {
            return Some(PreviewKind::Text);
        }
        if IMAGE_EXTENSIONS.contains(&ext) {
            return Some(PreviewKind::Image);
        }
        if ext == "pdf" {
            return Some(PreviewKind::Pdf);
        }
        if VIDEO_EXTENSIONS.contains(&ext) {
            return Some(PreviewKind::Video);
        }
        if AUDIO_EXTENSIONS.contains(&ext) {
            return Some(PreviewKind::Audio);
        }
    }

    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.split_once('/') {
        Some(("text", _)) => Some(PreviewKind::Text),
        Some(("image", _)) => Some(PreviewKind::Image),
        Some(("application", "pdf")) => Some(PreviewKind::Pdf),
        Some(("video", _)) => Some(PreviewKind::Video),
        Some(("audio", _)) => Some(PreviewKind::Audio),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1_000_000;

    fn classifier() -> PreviewClassifier {
        PreviewClassifier::new(&TransferLimits {
            max_upload_size: 100 * MB,
            max_preview_size: 5 * MB,
            max_text_preview_size: 10 * MB,
        })
    }

    #[test]
    fn test_text_uses_text_ceiling() {
        let classifier = classifier();

        assert_eq!(
            classifier.classify("notes.txt", 8 * MB, "text/plain"),
            PreviewDecision::Inline(PreviewKind::Text)
        );
        assert_eq!(
            classifier.classify("notes.txt", 11 * MB, "text/plain"),
            PreviewDecision::TooLarge
        );
    }

    #[test]
    fn test_pdf_uses_default_ceiling() {
        let classifier = classifier();

        assert_eq!(
            classifier.classify("report.pdf", 6 * MB, "application/pdf"),
            PreviewDecision::TooLarge
        );
        assert_eq!(
            classifier.classify("report.pdf", 4 * MB, "application/pdf"),
            PreviewDecision::Inline(PreviewKind::Pdf)
        );
    }

    #[test]
    fn test_ceiling_is_inclusive() {
        let classifier = classifier();

        assert_eq!(
            classifier.classify("photo.png", 5 * MB, "image/png"),
            PreviewDecision::Inline(PreviewKind::Image)
        );
    }

    #[test]
    fn test_unknown_content_unsupported() {
        let classifier = classifier();

        assert_eq!(
            classifier.classify("archive.zip", 10, "application/zip"),
            PreviewDecision::Unsupported
        );
        assert_eq!(
            classifier.classify("blob", 1, "application/octet-stream"),
            PreviewDecision::Unsupported
        );
        // Unsupported wins over size.
        assert_eq!(
            classifier.classify("huge.iso", 100 * MB, "application/octet-stream"),
            PreviewDecision::Unsupported
        );
    }

    #[test]
    fn test_media_type_fallback() {
        assert_eq!(
            preview_kind("README", "text/markdown; charset=utf-8"),
            Some(PreviewKind::Text)
        );
        assert_eq!(preview_kind("clip", "video/mp4"), Some(PreviewKind::Video));
        assert_eq!(preview_kind("song", "audio/mpeg"), Some(PreviewKind::Audio));
        assert_eq!(preview_kind("scan", "Application/PDF"), Some(PreviewKind::Pdf));
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(
            preview_kind("PHOTO.JPG", "application/octet-stream"),
            Some(PreviewKind::Image)
        );
        assert_eq!(preview_kind("config.YAML", ""), Some(PreviewKind::Text));
    }
}
