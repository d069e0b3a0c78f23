use crate::profile::{ProfileInput, Sex};

pub const PROTEIN_KCAL_PER_GRAM: u32 = 4;
pub const CARBS_KCAL_PER_GRAM: u32 = 4;
pub const FAT_KCAL_PER_GRAM: u32 = 9;

const PROTEIN_SHARE: f64 = 0.30;
const FAT_SHARE: f64 = 0.25;
const CARBS_SHARE: f64 = 0.45;

/// Daily calorie and macronutrient targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacroResult {
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
}

impl MacroResult {
    pub fn protein_kcal(&self) -> u32 {
        self.protein * PROTEIN_KCAL_PER_GRAM
    }
    pub fn carbs_kcal(&self) -> u32 {
        self.carbs * CARBS_KCAL_PER_GRAM
    }
    pub fn fat_kcal(&self) -> u32 {
        self.fat * FAT_KCAL_PER_GRAM
    }

    /// Energy implied by the gram amounts, which differs from `calories`
    /// only by rounding.
    pub fn macro_kcal(&self) -> u32 {
        self.protein_kcal() + self.carbs_kcal() + self.fat_kcal()
    }
}

/// Basal metabolic rate using the Mifflin-St Jeor equation.
pub fn basal_metabolic_rate(input: &ProfileInput) -> f64 {
    let base = 10.0 * input.weight_kg() + 6.25 * input.height_cm() - 5.0 * f64::from(input.age());
    match input.sex() {
        Sex::Male => base + 5.0,
        Sex::Female => base - 161.0,
    }
}

pub fn total_daily_energy_expenditure(input: &ProfileInput) -> f64 {
    basal_metabolic_rate(input) * input.activity_level().multiplier()
}

/// Total over every validated input: the profile ranges keep BMR positive,
/// so the rounded values always fit in `u32`.
pub fn calculate(input: &ProfileInput) -> MacroResult {
    let calories = total_daily_energy_expenditure(input) * input.goal().calorie_factor();

    MacroResult {
        calories: round_kcal(calories),
        protein: round_kcal(calories * PROTEIN_SHARE / f64::from(PROTEIN_KCAL_PER_GRAM)),
        carbs: round_kcal(calories * CARBS_SHARE / f64::from(CARBS_KCAL_PER_GRAM)),
        fat: round_kcal(calories * FAT_SHARE / f64::from(FAT_KCAL_PER_GRAM)),
    }
}

fn round_kcal(value: f64) -> u32 {
    value.round().max(0.0) as u32
}
