//! Concrete capability providers ("skills") for the maestro dispatcher.
//!
//! `ChatSkills` and `TextSkills` are registered unconditionally; the
//! ticketing, calendar, and catalog sets are credential-gated and only
//! constructed when the dispatch request carries the matching credential.

mod calendar;
mod catalog;
mod chat;
mod ranker;
mod text;
mod tickets;

pub use calendar::CalendarSkills;
pub use catalog::CatalogSkills;
pub use chat::{ChatSkills, LlmMode};
pub use ranker::LlmStepRanker;
pub use text::TextSkills;
pub use tickets::TicketSkills;

/// Integration names used for conditional registration. The gateway maps
/// credential headers onto these.
pub const INTEGRATION_TICKETS: &str = "tickets";
pub const INTEGRATION_CALENDAR: &str = "calendar";
pub const INTEGRATION_CATALOG: &str = "catalog";
