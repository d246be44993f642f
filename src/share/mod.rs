//! The shared directory tree.
//!
//! Everything that touches the filesystem on behalf of a client lives here:
//! - [`ShareRoot`] confines client paths to the share
//! - [`EntryLister`] lists directories
//! - [`ArchiveStreamer`] streams folders as `.tar.gz`
//! - [`TransferGate`] and [`PreviewClassifier`] decide what is allowed
//! - [`ShareOps`] creates, deletes, renames and moves entries
//!
//! All of it is synchronous; the web layer runs it on blocking threads.

pub mod archive;
pub mod gate;
pub mod listing;
pub mod ops;
pub mod preview;
pub mod root;
pub mod sink;

pub use archive::{archive_label, ArchiveError, ArchiveStreamer, ArchiveSummary};
pub use gate::{Denied, OperationKind, PermissionSet, TransferGate, TransferLimits};
pub use listing::{media_type_for, EntryLister, EntryMetadata, ListError, FOLDER_TYPE};
pub use ops::{EntryKind, OpError, ShareOps};
pub use preview::{PreviewClassifier, PreviewDecision, PreviewKind};
pub use root::{PathError, ResolvedPath, ShareRoot};
pub use sink::{chunk_stream, ChannelSink, CHANNEL_DEPTH, CHUNK_SIZE};
