pub mod auth;
pub mod event;
pub mod pagination;

pub use auth::Session;
pub use event::{ChangeEvent, ChangeKind, EventFilter};
pub use pagination::PageRequest;
