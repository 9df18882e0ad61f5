//! # DARIA Common Library
//!
//! Shared code for the DARIA session maintenance tools including:
//! - Session and guide document models
//! - Filesystem stores for sessions and discussion guides
//! - Pipeline event types
//! - Configuration loading and logging setup

pub mod config;
pub mod error;
pub mod events;
pub mod guide_store;
pub mod logging;
pub mod session;
pub mod session_store;

pub use error::{Error, Result};
pub use events::PipelineEvent;
pub use guide_store::{GuideDocument, GuideHandle, GuideStore};
pub use session::{Message, Role, SessionDocument, Transcript};
pub use session_store::SessionStore;
