use crate::{calculator::MacroResult, user::Session};

pub const REGISTER_LINK: &str = "/register";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MacroBreakdown {
    pub protein_percentage: u32,
    pub carbs_percentage: u32,
    pub fat_percentage: u32,
}

impl MacroBreakdown {
    /// Each share is rounded on its own, so the three need not add up to 100.
    /// Returns `None` when there are no calories to divide by.
    pub fn from_result(result: &MacroResult) -> Option<Self> {
        if result.calories == 0 {
            return None;
        }
        let percentage =
            |kcal: u32| (f64::from(kcal) / f64::from(result.calories) * 100.0).round() as u32;

        Some(Self {
            protein_percentage: percentage(result.protein_kcal()),
            carbs_percentage: percentage(result.carbs_kcal()),
            fat_percentage: percentage(result.fat_kcal()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChartSlice {
    pub label: String,
    pub kcal: u32,
    pub color: String,
}

fn chart_series(result: &MacroResult) -> Vec<ChartSlice> {
    [
        ("Protein", result.protein_kcal(), "#4F46E5"),
        ("Carbs", result.carbs_kcal(), "#10B981"),
        ("Fat", result.fat_kcal(), "#F59E0B"),
    ]
    .into_iter()
    .map(|(label, kcal, color)| ChartSlice {
        label: label.to_owned(),
        kcal,
        color: color.to_owned(),
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")
)]
pub enum CallToAction {
    /// Saving and sharing are handled by the caller's persistence layer.
    SaveOrShare,
    CreateAccount { link: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "state", rename_all = "kebab-case", rename_all_fields = "camelCase")
)]
pub enum ResultsView {
    Placeholder,
    Ready {
        result: MacroResult,
        breakdown: MacroBreakdown,
        chart: Vec<ChartSlice>,
        action: CallToAction,
    },
}

pub fn present(result: Option<&MacroResult>, session: Option<&Session>) -> ResultsView {
    let Some(result) = result else {
        return ResultsView::Placeholder;
    };
    let Some(breakdown) = MacroBreakdown::from_result(result) else {
        return ResultsView::Placeholder;
    };

    let action = match session {
        Some(_) => CallToAction::SaveOrShare,
        None => CallToAction::CreateAccount {
            link: REGISTER_LINK.to_owned(),
        },
    };

    ResultsView::Ready {
        result: *result,
        breakdown,
        chart: chart_series(result),
        action,
    }
}
