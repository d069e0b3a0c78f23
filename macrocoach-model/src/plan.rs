use chrono::{DateTime, Utc};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{assessment::Assessment, calculator::MacroResult, profile::ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
#[cfg_attr(
    feature = "serde",
    derive(serde_with::SerializeDisplay, serde_with::DeserializeFromStr)
)]
#[strum(serialize_all = "snake_case")]
pub enum PlanStatus {
    /// Written by the coach, not yet visible to the client.
    Draft,
    Active,
}

/// A nutrition plan written by the coach in answer to an assessment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NutritionPlan {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub targets: Option<MacroResult>,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
}

impl NutritionPlan {
    pub fn is_visible_to_client(&self) -> bool {
        self.status == PlanStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewPlan {
    pub content: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub targets: Option<MacroResult>,
}

impl NewPlan {
    pub fn into_plan(self, assessment: &Assessment) -> Result<NutritionPlan, ValidationError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(ValidationError::Missing { field: "content" });
        }
        if self.targets.is_some_and(|targets| targets.calories == 0) {
            return Err(ValidationError::OutOfRange {
                field: "calories",
                min: 1.0,
                max: f64::from(u32::MAX),
                value: 0.0,
            });
        }

        Ok(NutritionPlan {
            id: Uuid::new_v4(),
            assessment_id: assessment.id,
            user_id: assessment.user_id,
            content: content.to_owned(),
            targets: self.targets,
            status: PlanStatus::Draft,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assessment::NewAssessment,
        profile::{ActivityLevel, Goal},
    };

    fn assessment() -> Assessment {
        NewAssessment {
            goal: Goal::Maintain,
            activity_level: ActivityLevel::Sedentary,
            dietary_notes: String::new(),
        }
        .into_assessment(Uuid::new_v4())
    }

    #[test]
    fn plan_starts_as_hidden_draft() {
        let assessment = assessment();
        let plan = NewPlan {
            content: " Three meals, two snacks \n".to_owned(),
            targets: None,
        }
        .into_plan(&assessment)
        .unwrap();

        assert_eq!(plan.assessment_id, assessment.id);
        assert_eq!(plan.user_id, assessment.user_id);
        assert_eq!(plan.content, "Three meals, two snacks");
        assert_eq!(plan.status, PlanStatus::Draft);
        assert!(!plan.is_visible_to_client());
    }

    #[test]
    fn invalid_plans_are_rejected() {
        let assessment = assessment();
        assert_eq!(
            NewPlan {
                content: "   ".to_owned(),
                targets: None,
            }
            .into_plan(&assessment)
            .unwrap_err()
            .field(),
            "content"
        );
        assert_eq!(
            NewPlan {
                content: "eat less".to_owned(),
                targets: Some(MacroResult {
                    calories: 0,
                    protein: 0,
                    carbs: 0,
                    fat: 0,
                }),
            }
            .into_plan(&assessment)
            .unwrap_err()
            .field(),
            "calories"
        );
    }
}
