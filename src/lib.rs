//! Client core for the Fin News Hot event feed.
//!
//! The library keeps a local view of the remote event feed consistent under
//! periodic polling, user filtering, local bookmarks and in-place draft
//! generation. The terminal dashboard in the binary only reads this state.

pub mod api;
pub mod config;
pub mod draft;
pub mod error;
pub mod feed;
pub mod health;
pub mod schedule;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{
    ApiClient, Confirmation, CriteriaPatch, Draft, Event, EventApi, FilterCriteria,
    HealthSnapshot, Source, SourceType,
};
pub use config::ClientConfig;
pub use draft::{DraftWorkflow, GenerateOutcome, OpenOutcome, Selection};
pub use error::{ApiError, StoreError, WorkflowError};
pub use feed::{FeedController, FeedPhase, FeedStatus, RefreshOutcome};
pub use health::HealthMonitor;
pub use store::{Bookmarks, FileStore, KeyValueStore, MemoryStore};
