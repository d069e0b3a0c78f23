use async_trait::async_trait;
use log::debug;
use macrocoach_model::meal::{Meal, MealCategory, MealFilter};
use sqlx::{sqlite::SqliteRow, Row};

use crate::{connection::Connection, row, Result};

#[mockall::automock]
#[async_trait]
pub trait MealStore: Send + Sync {
    async fn add_meal(&self, meal: &Meal) -> Result<()>;
    /// Meals matching `filter`, ordered by name.
    async fn list_meals(&self, filter: &MealFilter) -> Result<Vec<Meal>>;
}

#[derive(Clone)]
pub struct MealStoreImpl {
    connection: Connection,
}

impl MealStoreImpl {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
}

fn meal_from_row(row: &SqliteRow) -> Result<Meal> {
    let grams = |column: &str| -> Result<u32> {
        let value: i64 = row.try_get(column)?;
        Ok(value as u32)
    };
    Ok(Meal {
        id: row::uuid(row, "id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: row::parsed::<MealCategory>(row, "category")?,
        calories: grams("calories")?,
        protein: grams("protein")?,
        carbs: grams("carbs")?,
        fat: grams("fat")?,
        image_url: row.try_get("image_url")?,
        recipe: row.try_get("recipe")?,
    })
}

#[async_trait]
impl MealStore for MealStoreImpl {
    async fn add_meal(&self, meal: &Meal) -> Result<()> {
        debug!("Storing meal {} ({})", meal.id, meal.name);
        let mut conn = self.connection.lock().await;
        sqlx::query(
            "INSERT INTO meals
            (id, name, description, category, calories, protein, carbs, fat, image_url, recipe)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(meal.id.to_string())
        .bind(&meal.name)
        .bind(&meal.description)
        .bind(meal.category.to_string())
        .bind(i64::from(meal.calories))
        .bind(i64::from(meal.protein))
        .bind(i64::from(meal.carbs))
        .bind(i64::from(meal.fat))
        .bind(&meal.image_url)
        .bind(&meal.recipe)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn list_meals(&self, filter: &MealFilter) -> Result<Vec<Meal>> {
        let mut conn = self.connection.lock().await;
        let rows = sqlx::query(
            "SELECT id, name, description, category, calories, protein, carbs, fat, image_url, recipe
            FROM meals WHERE ?1 IS NULL OR category = ?1 ORDER BY name, rowid",
        )
        .bind(filter.category.map(|c| c.to_string()))
        .fetch_all(&mut *conn)
        .await?;

        // SQLite lower() only folds ASCII, so the text search runs here
        let meals = rows.iter().map(meal_from_row).collect::<Result<Vec<_>>>()?;
        Ok(meals
            .into_iter()
            .filter(|meal| filter.matches(meal))
            .collect())
    }
}
