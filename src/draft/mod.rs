//! The single open event and its draft-generation lifecycle.
//!
//! `Closed -> Opening -> Open | OpenFailed -> Closed`, and while open,
//! generation runs `Open -> generating -> Open` with or without a new draft.
//! Every open/close bumps a selection sequence number; responses carrying an
//! older number are discarded without touching state.

mod export;

pub use export::render_text;

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

use crate::api::{Event, EventApi};
use crate::error::{ApiError, WorkflowError};
use crate::feed::FeedController;

#[derive(Debug, Clone, PartialEq)]
pub struct OpenEvent {
    pub event: Event,
    pub generating: bool,
    /// Last generation failure, cleared when a new generation starts.
    pub generate_error: Option<ApiError>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selection {
    #[default]
    Closed,
    Opening {
        id: String,
    },
    Open(OpenEvent),
    OpenFailed {
        id: String,
        error: ApiError,
    },
}

impl Selection {
    pub fn id(&self) -> Option<&str> {
        match self {
            Selection::Closed => None,
            Selection::Opening { id } | Selection::OpenFailed { id, .. } => Some(id.as_str()),
            Selection::Open(open) => Some(open.event.id.as_str()),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Selection::Closed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    Opened(Event),
    Failed(ApiError),
    /// The selection changed before the response arrived.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerateOutcome {
    Generated(Event),
    /// The selection stays open with its previous draft state.
    Failed(ApiError),
    /// The selection was closed, replaced or regenerated meanwhile.
    Stale,
}

#[derive(Default)]
struct DraftState {
    selection: Selection,
    selection_seq: u64,
    generate_seq: u64,
}

struct DraftInner {
    api: Arc<dyn EventApi>,
    feed: FeedController,
    state: Mutex<DraftState>,
}

#[derive(Clone)]
pub struct DraftWorkflow {
    inner: Arc<DraftInner>,
}

impl DraftWorkflow {
    /// `feed` receives every successfully generated event so the list and the
    /// detail view never disagree.
    pub fn new(api: Arc<dyn EventApi>, feed: FeedController) -> Self {
        Self {
            inner: Arc::new(DraftInner {
                api,
                feed,
                state: Mutex::new(DraftState::default()),
            }),
        }
    }

    pub fn selection(&self) -> Selection {
        self.inner.state.lock().selection.clone()
    }

    pub fn selected_id(&self) -> Option<String> {
        self.inner.state.lock().selection.id().map(str::to_string)
    }

    /// Select `id`. The selection is `Opening` before this returns; the
    /// returned future fetches the event.
    pub fn open(&self, id: &str) -> impl Future<Output = OpenOutcome> + Send + 'static {
        let seq = {
            let mut state = self.inner.state.lock();
            state.selection_seq += 1;
            state.selection = Selection::Opening { id: id.to_string() };
            state.selection_seq
        };
        tracing::debug!(%id, seq, "opening event");

        let inner = Arc::clone(&self.inner);
        let id = id.to_string();
        async move { inner.complete_open(seq, id).await }
    }

    /// Clear the selection. Any in-flight open or generate response becomes a
    /// no-op when it arrives.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        state.selection_seq += 1;
        state.selection = Selection::Closed;
    }

    /// Generate a draft for the open event.
    ///
    /// Fails with `InvalidState` unless an event is open.
    pub fn generate(
        &self,
    ) -> Result<impl Future<Output = GenerateOutcome> + Send + 'static, WorkflowError> {
        let (selection_seq, generate_seq, id) = {
            let mut state = self.inner.state.lock();
            let state = &mut *state;
            let Selection::Open(open) = &mut state.selection else {
                return Err(WorkflowError::InvalidState("no open event to generate a draft for"));
            };
            open.generating = true;
            open.generate_error = None;
            state.generate_seq += 1;
            (state.selection_seq, state.generate_seq, open.event.id.clone())
        };
        tracing::info!(%id, "draft generation requested");

        let inner = Arc::clone(&self.inner);
        Ok(async move { inner.complete_generate(selection_seq, generate_seq, id).await })
    }

    /// Text rendering of the open event's draft.
    pub fn export_draft_as_text(&self) -> Result<String, WorkflowError> {
        let state = self.inner.state.lock();
        match &state.selection {
            Selection::Open(open) => open
                .event
                .draft
                .as_ref()
                .map(render_text)
                .ok_or(WorkflowError::NoDraft),
            _ => Err(WorkflowError::InvalidState("no open event to export")),
        }
    }
}

impl DraftInner {
    async fn complete_open(&self, seq: u64, id: String) -> OpenOutcome {
        let result = self.api.get_event(&id).await;

        let mut state = self.state.lock();
        if seq != state.selection_seq {
            tracing::debug!(%id, seq, latest = state.selection_seq, "discarding stale event detail");
            return OpenOutcome::Stale;
        }

        match result {
            Ok(event) => {
                state.selection = Selection::Open(OpenEvent {
                    event: event.clone(),
                    generating: false,
                    generate_error: None,
                });
                OpenOutcome::Opened(event)
            }
            Err(error) => {
                tracing::warn!(%id, %error, "failed to open event");
                state.selection = Selection::OpenFailed {
                    id,
                    error: error.clone(),
                };
                OpenOutcome::Failed(error)
            }
        }
    }

    async fn complete_generate(&self, selection_seq: u64, generate_seq: u64, id: String) -> GenerateOutcome {
        let result = self.api.generate_draft(&id).await;

        let updated = {
            let mut state = self.state.lock();
            let state = &mut *state;
            if selection_seq != state.selection_seq || generate_seq != state.generate_seq {
                tracing::debug!(%id, "discarding stale draft generation");
                return GenerateOutcome::Stale;
            }
            let Selection::Open(open) = &mut state.selection else {
                return GenerateOutcome::Stale;
            };

            open.generating = false;
            match result {
                Ok(event) => {
                    open.event = open.event.superseded_by(event);
                    open.event.clone()
                }
                Err(error) => {
                    tracing::warn!(%id, %error, "draft generation failed");
                    open.generate_error = Some(error.clone());
                    return GenerateOutcome::Failed(error);
                }
            }
        };

        self.feed.patch_event(updated.clone());
        tracing::info!(%id, "draft generated");
        GenerateOutcome::Generated(updated)
    }
}
