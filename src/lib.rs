//! Sharebox - share a directory tree over HTTP.
//!
//! Clients browse, upload, download, preview and reorganize files inside one
//! configured directory. Every client path is confined to that directory, and
//! whole folders download as `.tar.gz` archives streamed as they are built.

pub mod config;
pub mod error;
pub mod logging;
pub mod share;
pub mod web;

pub use config::Config;
pub use error::{Result, ShareboxError};
pub use share::{
    ArchiveStreamer, EntryLister, PreviewClassifier, ResolvedPath, ShareOps, ShareRoot,
    TransferGate,
};
pub use web::WebServer;
