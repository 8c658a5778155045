//! Persisted data types.
//!
//! These mirror the JSON documents under the store directory and are
//! shared by every component that reads or writes them.

mod archive;
mod completion;
mod deleted;
mod history;
mod task;

pub use archive::{Archive, ArchiveMeta};
pub use completion::{CompletionDetails, CompletionFields};
pub use deleted::DeletedTaskRecord;
pub use history::{HistoryEntry, HistoryOperation};
pub use task::{dedup_ids, RelatedFile, RelatedFileType, StatusCounts, Task, TaskCollection, TaskStatus};
