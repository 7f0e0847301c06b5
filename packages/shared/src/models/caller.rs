use serde::{Deserialize, Serialize};

/// Who is making a request, as established by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallerIdentity {
    /// A verified account; `subject` is the identity provider's stable id.
    Account {
        subject: String,
        display_name: Option<String>,
    },
    /// An anonymous caller carrying a client-generated session token.
    Session { session_id: String },
}

impl CallerIdentity {
    /// Builds a caller from whatever credentials were presented.
    ///
    /// An account subject wins over a session token. Blank values count as
    /// absent; `None` means the caller could not be identified at all.
    pub fn from_parts(
        subject: Option<String>,
        display_name: Option<String>,
        session_id: Option<String>,
    ) -> Option<Self> {
        let non_blank = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(subject) = non_blank(subject) {
            return Some(CallerIdentity::Account {
                subject,
                display_name: non_blank(display_name),
            });
        }
        non_blank(session_id).map(|session_id| CallerIdentity::Session { session_id })
    }
}
