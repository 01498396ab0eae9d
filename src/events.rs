use finhot::{GenerateOutcome, OpenOutcome, RefreshOutcome};

/// Completions of background requests, delivered to the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    /// A feed refresh issued by the UI settled
    Refreshed(RefreshOutcome),

    /// An event detail fetch settled
    Opened { id: String, outcome: OpenOutcome },

    /// A draft generation settled
    Generated(GenerateOutcome),
}
