//! Application runtime composition modules.

pub(crate) mod config;
pub(crate) mod progress;
pub(crate) mod runtime;
pub(crate) mod status;
pub(crate) mod terminal;
