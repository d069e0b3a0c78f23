use chrono::{DateTime, Utc};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::profile::{ActivityLevel, Goal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
#[cfg_attr(
    feature = "serde",
    derive(serde_with::SerializeDisplay, serde_with::DeserializeFromStr)
)]
#[strum(serialize_all = "snake_case")]
pub enum AssessmentStatus {
    Pending,
    InProgress,
    Completed,
}

impl AssessmentStatus {
    /// Status only moves forward; staying put is allowed.
    pub fn can_become(&self, next: AssessmentStatus) -> bool {
        next >= *self
    }
}

/// A client's request for a personalised nutrition plan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assessment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub goal: Goal,
    pub activity_level: ActivityLevel,
    pub dietary_notes: String,
    pub status: AssessmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewAssessment {
    pub goal: Goal,
    pub activity_level: ActivityLevel,
    #[cfg_attr(feature = "serde", serde(default))]
    pub dietary_notes: String,
}

impl NewAssessment {
    pub fn into_assessment(self, user_id: Uuid) -> Assessment {
        Assessment {
            id: Uuid::new_v4(),
            user_id,
            goal: self.goal,
            activity_level: self.activity_level,
            dietary_notes: self.dietary_notes.trim().to_owned(),
            status: AssessmentStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DashboardStats {
    pub users: u32,
    pub pending: u32,
    pub completed: u32,
    pub active_plans: u32,
    pub recent: Vec<Assessment>,
}
