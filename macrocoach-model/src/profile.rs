use std::{ops::RangeInclusive, str::FromStr};

use log::warn;
use strum::{Display, EnumIter, EnumString};

pub const AGE_RANGE: RangeInclusive<i64> = 18..=100;
pub const WEIGHT_RANGE_KG: RangeInclusive<f64> = 40.0..=200.0;
pub const HEIGHT_RANGE_CM: RangeInclusive<f64> = 140.0..=220.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("\"{value}\" is not a valid {field}")]
    InvalidChoice { field: &'static str, value: String },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Missing { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidChoice { field, .. } => field,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[cfg_attr(
    feature = "serde",
    derive(serde_with::SerializeDisplay, serde_with::DeserializeFromStr)
)]
#[strum(serialize_all = "kebab-case")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[cfg_attr(
    feature = "serde",
    derive(serde_with::SerializeDisplay, serde_with::DeserializeFromStr)
)]
#[strum(serialize_all = "kebab-case")]
pub enum ActivityLevel {
    /// Office job, little exercise
    Sedentary,
    /// Light exercise 1-3 days/week
    LightlyActive,
    /// Moderate exercise 3-5 days/week
    ModeratelyActive,
    /// Hard exercise 6-7 days/week
    VeryActive,
    /// Very hard exercise and a physical job
    ExtraActive,
}

impl ActivityLevel {
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::LightlyActive => 1.375,
            ActivityLevel::ModeratelyActive => 1.55,
            ActivityLevel::VeryActive => 1.725,
            ActivityLevel::ExtraActive => 1.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[cfg_attr(
    feature = "serde",
    derive(serde_with::SerializeDisplay, serde_with::DeserializeFromStr)
)]
#[strum(serialize_all = "kebab-case")]
pub enum Goal {
    LoseWeight,
    Maintain,
    GainMuscle,
}

impl Goal {
    /// Unrecognised goals are treated as `Maintain`. This is the only
    /// profile field allowed to fall back silently.
    pub fn parse_lenient(value: &str) -> Self {
        Goal::from_str(value).unwrap_or_else(|_| {
            warn!("Unrecognised goal \"{}\", falling back to maintain", value);
            Goal::Maintain
        })
    }

    pub fn calorie_factor(&self) -> f64 {
        match self {
            Goal::LoseWeight => 0.8,
            Goal::Maintain => 1.0,
            Goal::GainMuscle => 1.1,
        }
    }
}

/// A profile whose fields are all present and within range.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileInput {
    age: u8,
    sex: Sex,
    weight_kg: f64,
    height_cm: f64,
    activity_level: ActivityLevel,
    goal: Goal,
}

impl ProfileInput {
    pub fn new(
        age: i64,
        sex: Sex,
        weight_kg: f64,
        height_cm: f64,
        activity_level: ActivityLevel,
        goal: Goal,
    ) -> Result<Self, ValidationError> {
        if !AGE_RANGE.contains(&age) {
            return Err(ValidationError::OutOfRange {
                field: "age",
                min: *AGE_RANGE.start() as f64,
                max: *AGE_RANGE.end() as f64,
                value: age as f64,
            });
        }
        check_range("weight", weight_kg, &WEIGHT_RANGE_KG)?;
        check_range("height", height_cm, &HEIGHT_RANGE_CM)?;

        Ok(Self {
            age: age as u8,
            sex,
            weight_kg,
            height_cm,
            activity_level,
            goal,
        })
    }

    pub fn age(&self) -> u8 {
        self.age
    }
    pub fn sex(&self) -> Sex {
        self.sex
    }
    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }
    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }
    pub fn activity_level(&self) -> ActivityLevel {
        self.activity_level
    }
    pub fn goal(&self) -> Goal {
        self.goal
    }
}

pub(crate) fn check_range(
    field: &'static str,
    value: f64,
    range: &RangeInclusive<f64>,
) -> Result<(), ValidationError> {
    // NaN fails `contains`, so non-finite values are reported as out of range
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min: *range.start(),
            max: *range.end(),
            value,
        })
    }
}

/// Raw calculator form submission, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ProfileForm {
    pub age: Option<i64>,
    #[cfg_attr(feature = "serde", serde(alias = "gender"))]
    pub sex: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub activity_level: Option<String>,
    pub goal: Option<String>,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<ProfileInput, ValidationError> {
        let age = self.age.ok_or(ValidationError::Missing { field: "age" })?;
        let sex = parse_choice::<Sex>("sex", required_text("sex", &self.sex)?)?;
        let weight = self
            .weight
            .ok_or(ValidationError::Missing { field: "weight" })?;
        let height = self
            .height
            .ok_or(ValidationError::Missing { field: "height" })?;
        let activity_level = parse_choice::<ActivityLevel>(
            "activity level",
            required_text("activity level", &self.activity_level)?,
        )?;
        let goal = Goal::parse_lenient(required_text("goal", &self.goal)?);

        ProfileInput::new(age, sex, weight, height, activity_level, goal)
    }
}

fn required_text<'a>(
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, ValidationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::Missing { field })
}

fn parse_choice<T: FromStr>(field: &'static str, value: &str) -> Result<T, ValidationError> {
    T::from_str(value).map_err(|_| ValidationError::InvalidChoice {
        field,
        value: value.to_owned(),
    })
}
