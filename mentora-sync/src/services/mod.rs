pub mod billing;
pub mod categories;
pub mod link_preview;
pub mod media;
pub mod notifications;
pub mod scroll;
