//! View lifecycle status shared by the conversation views.

use std::fmt;

/// `Idle → Loading → Ready | Error`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewStatus {
    /// Not mounted
    #[default]
    Idle,
    Loading,
    Ready,
    /// Primary data could not be loaded; the view offers a retry
    Error(String),
}

impl ViewStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for ViewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Error(message) => write!(f, "error: {}", message),
        }
    }
}
