pub mod client;
pub mod models;
pub mod query;
mod timestamp;

pub use client::{ApiClient, EventApi};
pub use models::{Draft, Entity, Event, HealthSnapshot, Source, SourceType, TimelineItem};
pub use query::{Confirmation, CriteriaPatch, FilterCriteria};
