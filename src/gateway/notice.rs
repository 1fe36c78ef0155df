use serde::Serialize;

use super::{MutationError, MutationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Failure,
}

/// Transient user-facing message produced for every finished mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub detail: Option<String>,
}

impl Notice {
    /// "Survey created", "Flow deleted", ...
    pub fn success(kind: MutationKind, noun: &str) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: format!("{} {}", capitalize(noun), kind.past_tense()),
            detail: None,
        }
    }

    /// "Failed to delete survey" with the reason when one is known.
    pub fn failure(kind: MutationKind, noun: &str, error: &MutationError) -> Self {
        Self {
            level: NoticeLevel::Failure,
            title: format!("Failed to {} {}", kind.verb(), noun),
            detail: error.reason(),
        }
    }

    pub fn for_result<T>(kind: MutationKind, noun: &str, result: &Result<T, MutationError>) -> Self {
        match result {
            Ok(_) => Self::success(kind, noun),
            Err(e) => Self::failure(kind, noun, e),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.level == NoticeLevel::Failure
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.title, detail),
            None => write!(f, "{}", self.title),
        }
    }
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
