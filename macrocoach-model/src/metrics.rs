use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use num_derive::FromPrimitive;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

use crate::profile::{check_range, ValidationError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive, Display, EnumString, EnumIter,
)]
#[cfg_attr(
    feature = "serde",
    derive(serde_with::SerializeDisplay, serde_with::DeserializeFromStr)
)]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    Weight = 0,
    BodyFat = 1,
    Chest = 2,
    Waist = 3,
    Hips = 4,
}

impl MetricKind {
    pub fn range(&self) -> RangeInclusive<f64> {
        match self {
            MetricKind::Weight => 30.0..=300.0,
            MetricKind::BodyFat => 1.0..=50.0,
            MetricKind::Chest => 50.0..=200.0,
            MetricKind::Waist => 40.0..=200.0,
            MetricKind::Hips => 50.0..=200.0,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::Weight => "kg",
            MetricKind::BodyFat => "%",
            MetricKind::Chest | MetricKind::Waist | MetricKind::Hips => "cm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricValue {
    pub kind: MetricKind,
    pub value: f64,
}

impl From<MetricValue> for (i64, f64) {
    fn from(value: MetricValue) -> Self {
        (value.kind as i64, value.value)
    }
}

impl TryFrom<(i64, f64)> for MetricValue {
    type Error = &'static str;

    fn try_from((code, value): (i64, f64)) -> Result<Self, Self::Error> {
        num::FromPrimitive::from_i64(code)
            .map(|kind| MetricValue { kind, value })
            .ok_or("Invalid metric kind")
    }
}

/// Measurements submitted together, as entered in the update form.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NewMetric {
    pub weight: Option<f64>,
    pub body_fat: Option<f64>,
    pub chest: Option<f64>,
    pub waist: Option<f64>,
    pub hips: Option<f64>,
}

impl NewMetric {
    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        match kind {
            MetricKind::Weight => self.weight,
            MetricKind::BodyFat => self.body_fat,
            MetricKind::Chest => self.chest,
            MetricKind::Waist => self.waist,
            MetricKind::Hips => self.hips,
        }
    }

    pub fn validate(&self) -> Result<Vec<MetricValue>, ValidationError> {
        let values = MetricKind::iter()
            .filter_map(|kind| self.get(kind).map(|value| MetricValue { kind, value }))
            .collect::<Vec<_>>();

        if values.is_empty() {
            return Err(ValidationError::Missing {
                field: "measurement",
            });
        }
        for value in values.iter() {
            check_range(kind_field(value.kind), value.value, &value.kind.range())?;
        }
        Ok(values)
    }
}

fn kind_field(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::Weight => "weight",
        MetricKind::BodyFat => "body fat",
        MetricKind::Chest => "chest",
        MetricKind::Waist => "waist",
        MetricKind::Hips => "hips",
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metric {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub values: Vec<MetricValue>,
}

impl Metric {
    pub fn new(user_id: Uuid, values: Vec<MetricValue>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            values,
        }
    }

    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        self.values.iter().find(|v| v.kind == kind).map(|v| v.value)
    }

    pub fn add_value(&mut self, value: MetricValue) {
        self.values.push(value)
    }
}

/// Relative change in percent, `None` when either side is missing or the
/// previous value is zero.
pub fn change(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    match (current, previous) {
        (Some(current), Some(previous)) if current != 0.0 && previous != 0.0 => {
            Some((current - previous) / previous * 100.0)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricSummary {
    pub kind: MetricKind,
    pub latest: Option<f64>,
    pub change_percent: Option<f64>,
}

/// Latest value of every kind and its change against the entry before it.
/// `history` must be ordered oldest first.
pub fn summarize(history: &[Metric]) -> Vec<MetricSummary> {
    let latest = history.last();
    let previous = history.len().checked_sub(2).and_then(|i| history.get(i));

    MetricKind::iter()
        .map(|kind| {
            let current = latest.and_then(|m| m.get(kind));
            MetricSummary {
                kind,
                latest: current,
                change_percent: change(current, previous.and_then(|m| m.get(kind))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_entry_is_rejected() {
        assert_eq!(
            NewMetric::default().validate(),
            Err(ValidationError::Missing {
                field: "measurement"
            })
        );
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        let entry = NewMetric {
            weight: Some(80.0),
            body_fat: Some(55.0),
            ..Default::default()
        };
        assert_eq!(entry.validate().unwrap_err().field(), "body fat");
    }

    #[test]
    fn only_present_values_are_kept() {
        let entry = NewMetric {
            weight: Some(80.0),
            waist: Some(85.5),
            ..Default::default()
        };
        assert_eq!(
            entry.validate().unwrap(),
            vec![
                MetricValue {
                    kind: MetricKind::Weight,
                    value: 80.0
                },
                MetricValue {
                    kind: MetricKind::Waist,
                    value: 85.5
                },
            ]
        );
    }

    #[test]
    fn value_codes_round_trip() {
        let value = MetricValue {
            kind: MetricKind::Hips,
            value: 99.0,
        };
        let code: (i64, f64) = value.into();
        assert_eq!(code, (4, 99.0));
        assert_eq!(MetricValue::try_from(code), Ok(value));
        assert!(MetricValue::try_from((17, 1.0)).is_err());
    }

    #[test]
    fn change_against_previous_entry() {
        let test_data = [
            (Some(90.0), Some(100.0), Some(-10.0)),
            (Some(110.0), Some(100.0), Some(10.0)),
            (Some(90.0), None, None),
            (None, Some(100.0), None),
            (Some(90.0), Some(0.0), None),
        ];

        for (i, (current, previous, expected)) in test_data.into_iter().enumerate() {
            assert_eq!(change(current, previous), expected, "Test case #{}", i);
        }
    }

    #[test]
    fn summary_uses_last_two_entries() {
        let user_id = Uuid::new_v4();
        let mut first = Metric::new(user_id, vec![]);
        first.add_value(MetricValue {
            kind: MetricKind::Weight,
            value: 80.0,
        });
        let mut second = Metric::new(user_id, vec![]);
        second.add_value(MetricValue {
            kind: MetricKind::Weight,
            value: 76.0,
        });
        second.add_value(MetricValue {
            kind: MetricKind::Waist,
            value: 84.0,
        });

        let summary = summarize(&[first, second]);
        let weight = summary.iter().find(|s| s.kind == MetricKind::Weight).unwrap();
        assert_eq!(weight.latest, Some(76.0));
        assert_eq!(weight.change_percent, Some(-5.0));
        let waist = summary.iter().find(|s| s.kind == MetricKind::Waist).unwrap();
        assert_eq!(waist.latest, Some(84.0));
        assert_eq!(waist.change_percent, None);
        let hips = summary.iter().find(|s| s.kind == MetricKind::Hips).unwrap();
        assert_eq!(hips.latest, None);
    }

    #[test]
    fn summary_of_empty_history() {
        assert!(summarize(&[]).iter().all(|s| s.latest.is_none()));
    }
}
