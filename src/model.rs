use serde::{Deserialize, Serialize};

/// Review status reported by the grading API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HomeworkStatus {
    Reviewing,
    Approved,
    Rejected,
}

impl HomeworkStatus {
    pub const ALL: [HomeworkStatus; 3] = [
        HomeworkStatus::Reviewing,
        HomeworkStatus::Approved,
        HomeworkStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HomeworkStatus::Reviewing => "reviewing",
            HomeworkStatus::Approved => "approved",
            HomeworkStatus::Rejected => "rejected",
        }
    }

    /// Look up a raw status code. Returns `None` for codes without a verdict.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == code)
    }

    /// Fixed human-readable verdict for this status.
    pub fn verdict(&self) -> &'static str {
        match self {
            HomeworkStatus::Reviewing => "The work has been taken for review by a reviewer.",
            HomeworkStatus::Approved => {
                "The work has been reviewed: the reviewer liked everything. Hooray!"
            }
            HomeworkStatus::Rejected => "The work has been reviewed: the reviewer has comments.",
        }
    }
}

/// One assignment as reported in a single poll. Rebuilt every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRecord {
    pub name: String,
    pub status: HomeworkStatus,
}

impl AssignmentRecord {
    pub fn new(name: impl Into<String>, status: HomeworkStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    pub fn status_message(&self) -> String {
        format!(
            "Review status changed for \"{}\". {}",
            self.name,
            self.status.verdict()
        )
    }
}

/// Last content successfully delivered on each notification slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationCache {
    pub last_status: Option<String>,
    pub last_error: Option<String>,
}

/// Everything the poll loop carries from one cycle to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    pub checkpoint: i64,
    pub cache: NotificationCache,
}

impl PollState {
    pub fn starting_at(checkpoint: i64) -> Self {
        Self {
            checkpoint,
            cache: NotificationCache::default(),
        }
    }
}
