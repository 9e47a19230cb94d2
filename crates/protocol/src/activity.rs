//! Admin activity-log action codes.
//!
//! The server tags every activity entry with a string code. This enum is the
//! single place those codes are interpreted; labels, icons and colors all
//! derive from one exhaustive match.

use serde::{Deserialize, Serialize};

/// Visual tone of an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Neutral,
    Warning,
    Danger,
}

/// An action recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Upload,
    Download,
    Delete,
    Share,
    Rename,
    Login,
    Logout,
    Signup,
    PasswordReset,
    #[serde(other)]
    Unknown,
}

impl ActivityAction {
    /// Parses a raw action code. Unrecognized codes map to `Unknown`.
    pub fn from_code(code: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(code.to_ascii_lowercase()))
            .unwrap_or(Self::Unknown)
    }

    /// Presentation attributes: (label, icon name, tone).
    fn attributes(self) -> (&'static str, &'static str, Tone) {
        match self {
            Self::Upload => ("Uploaded", "upload", Tone::Positive),
            Self::Download => ("Downloaded", "download", Tone::Neutral),
            Self::Delete => ("Deleted", "trash", Tone::Danger),
            Self::Share => ("Shared", "share", Tone::Positive),
            Self::Rename => ("Renamed", "edit", Tone::Neutral),
            Self::Login => ("Signed in", "log-in", Tone::Neutral),
            Self::Logout => ("Signed out", "log-out", Tone::Neutral),
            Self::Signup => ("Signed up", "user-plus", Tone::Positive),
            Self::PasswordReset => ("Password reset", "key", Tone::Warning),
            Self::Unknown => ("Activity", "activity", Tone::Neutral),
        }
    }

    pub fn label(self) -> &'static str {
        self.attributes().0
    }

    pub fn icon(self) -> &'static str {
        self.attributes().1
    }

    pub fn tone(self) -> Tone {
        self.attributes().2
    }
}
