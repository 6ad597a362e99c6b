//! Session — the canonical aggregate and the controller that owns it

mod controller;
mod model;

pub use controller::SessionController;
pub use model::Session;

use crate::config::ConfigError;
use crate::phrase_service::PhraseServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a replay is in progress; it has been stopped")]
    ReplayInProgress,

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("phrase service error: {0}")]
    PhraseService(#[from] PhraseServiceError),
}
