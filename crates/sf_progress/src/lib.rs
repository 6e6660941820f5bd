mod broadcaster;
mod error;
mod event;

pub use broadcaster::Broadcaster;
pub use error::{Error, Result};
pub use event::{Event, EventKind};
