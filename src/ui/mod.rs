pub mod detail;
pub mod events;

pub use detail::{popup_area, render_detail, render_export};
pub use events::EventsView;
