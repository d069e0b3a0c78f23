use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::profile::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[cfg_attr(
    feature = "serde",
    derive(serde_with::SerializeDisplay, serde_with::DeserializeFromStr)
)]
#[strum(serialize_all = "snake_case")]
pub enum MealCategory {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// A recipe from the meal library.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: MealCategory,
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
    pub image_url: Option<String>,
    pub recipe: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewMeal {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
    pub category: MealCategory,
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub image_url: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub recipe: String,
}

impl NewMeal {
    pub fn into_meal(self) -> Result<Meal, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::Missing { field: "name" });
        }
        Ok(Meal {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            description: self.description.trim().to_owned(),
            category: self.category,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            image_url: self.image_url.filter(|url| !url.trim().is_empty()),
            recipe: self.recipe.trim().to_owned(),
        })
    }
}

/// Library query. An empty search matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MealFilter {
    pub search: Option<String>,
    pub category: Option<MealCategory>,
}

impl MealFilter {
    /// Case-insensitive substring match on name or description, plus an
    /// exact category match when one is set.
    pub fn matches(&self, meal: &Meal) -> bool {
        if self.category.is_some_and(|category| category != meal.category) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                meal.name.to_lowercase().contains(&term)
                    || meal.description.to_lowercase().contains(&term)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oatmeal() -> Meal {
        NewMeal {
            name: " Overnight Oats ".to_owned(),
            description: "Rolled oats with Greek yoghurt".to_owned(),
            category: MealCategory::Breakfast,
            calories: 420,
            protein: 25,
            carbs: 55,
            fat: 11,
            image_url: Some("".to_owned()),
            recipe: "Mix and leave overnight.".to_owned(),
        }
        .into_meal()
        .unwrap()
    }

    #[test]
    fn new_meal_is_trimmed() {
        let meal = oatmeal();
        assert_eq!(meal.name, "Overnight Oats");
        assert_eq!(meal.image_url, None);
    }

    #[test]
    fn blank_name_is_rejected() {
        let meal = NewMeal {
            name: "  ".to_owned(),
            description: String::new(),
            category: MealCategory::Snack,
            calories: 100,
            protein: 1,
            carbs: 20,
            fat: 1,
            image_url: None,
            recipe: String::new(),
        };
        assert_eq!(
            meal.into_meal(),
            Err(ValidationError::Missing { field: "name" })
        );
    }

    #[test]
    fn filter_matches_name_description_and_category() {
        let meal = oatmeal();
        let test_data = [
            (MealFilter::default(), true),
            (
                MealFilter {
                    search: Some("OATS".to_owned()),
                    category: None,
                },
                true,
            ),
            (
                MealFilter {
                    search: Some("yoghurt".to_owned()),
                    category: Some(MealCategory::Breakfast),
                },
                true,
            ),
            (
                MealFilter {
                    search: Some("  ".to_owned()),
                    category: None,
                },
                true,
            ),
            (
                MealFilter {
                    search: Some("salmon".to_owned()),
                    category: None,
                },
                false,
            ),
            (
                MealFilter {
                    search: None,
                    category: Some(MealCategory::Dinner),
                },
                false,
            ),
        ];

        for (i, (filter, expected)) in test_data.into_iter().enumerate() {
            assert_eq!(filter.matches(&meal), expected, "Test case #{}", i);
        }
    }
}
