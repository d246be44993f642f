//! API handlers for Sharebox.

pub mod entries;
pub mod files;
pub mod folders;

pub use files::*;
pub use folders::*;

use crate::config::Config;
use crate::share::{
    ArchiveStreamer, EntryLister, PreviewClassifier, ShareOps, ShareRoot, TransferGate,
};
use crate::web::error::ApiError;

/// Shared application state.
///
/// Built once at startup and read-only afterwards; every component holds its
/// own handle to the same share root.
#[derive(Debug, Clone)]
pub struct AppState {
    pub root: ShareRoot,
    pub lister: EntryLister,
    pub archiver: ArchiveStreamer,
    pub ops: ShareOps,
    pub gate: TransferGate,
    pub previews: PreviewClassifier,
}

impl AppState {
    /// Open the share root and build the components from configuration.
    pub fn new(config: &Config) -> crate::Result<Self> {
        let root = ShareRoot::open(&config.share.path)?;
        let limits = config.limits.to_transfer_limits();

        Ok(Self {
            lister: EntryLister::new(&root, config.share.excluded_files.iter().cloned()),
            archiver: ArchiveStreamer::new(&root, config.archive.compression_level),
            ops: ShareOps::new(&root),
            gate: TransferGate::new(config.permissions.to_permission_set(), limits),
            previews: PreviewClassifier::new(&limits),
            root,
        })
    }
}

/// Run blocking filesystem work off the async executor.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!("Blocking task failed: {}", e);
        ApiError::internal("An internal error occurred")
    })
}

/// Build a safe `Content-Disposition` value.
///
/// Control characters are dropped so the name cannot inject headers. The
/// quoted `filename` is an ASCII-only fallback; the exact name travels in the
/// RFC 5987 `filename*` parameter whenever the fallback had to change it.
pub(crate) fn content_disposition_header(disposition: &str, filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    if fallback == filename {
        return format!("{disposition}; filename=\"{filename}\"");
    }

    let encoded = urlencoding::encode(filename);
    format!("{disposition}; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_content_disposition_simple_ascii() {
        let result = content_disposition_header("attachment", "document.txt");
        assert_eq!(result, "attachment; filename=\"document.txt\"");
    }

    #[test]
    fn test_content_disposition_inline() {
        let result = content_disposition_header("inline", "my photo.png");
        assert_eq!(result, "inline; filename=\"my photo.png\"");
    }

    #[test]
    fn test_content_disposition_unicode() {
        let result = content_disposition_header("attachment", "日本語ファイル.txt");
        assert!(result.contains("filename*=UTF-8''"));
        assert!(result.contains("%E6%97%A5%E6%9C%AC%E8%AA%9E"));
        assert!(HeaderValue::from_str(&result).is_ok());
    }

    #[test]
    fn test_content_disposition_quotes_and_backslashes() {
        let result = content_disposition_header("attachment", "a\"b\\c.txt");
        assert!(result.contains("filename=\"a_b_c.txt\""));
        assert!(result.contains("%22"));
    }

    #[test]
    fn test_content_disposition_header_injection() {
        let result =
            content_disposition_header("attachment", "file\"\r\nX-Evil: header\r\n\r\n<script>.txt");
        assert!(!result.contains('\r'));
        assert!(!result.contains('\n'));
        assert!(result.starts_with("attachment; filename="));
        assert!(HeaderValue::from_str(&result).is_ok());
    }

    #[test]
    fn test_app_state_from_config() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.share.path = temp.path().join("share").to_string_lossy().into_owned();

        let state = AppState::new(&config).unwrap();
        assert!(state.root.path().is_dir());
        assert!(!state.gate.permissions().upload);
        assert!(state.gate.permissions().download);
    }
}
