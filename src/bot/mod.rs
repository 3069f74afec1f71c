//! Telegram-facing layer: update dispatch, effect execution, keyboards and
//! media retrieval.

pub mod dispatcher;
pub mod executor;
pub mod keyboards;
pub mod media;

pub use dispatcher::process_update;
