//! Category business logic.
//!
//! Categories are shared defaults plus whatever each user adds. Defaults are
//! seeded once from configuration and are read-only afterwards.

use crate::{
    config::settings::{CategoryConfig, DEFAULT_CATEGORY_COLOR},
    entities::{Category, category},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Condition, PaginatorTrait, QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Fields of a user category to be created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCategory {
    /// Display name
    pub name: String,
    /// Hex color; the default color when absent
    pub color: Option<String>,
}

/// A partial update of a user category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryChanges {
    /// New name
    pub name: Option<String>,
    /// New color
    pub color: Option<String>,
}

fn clean_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("name", "must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Inserts the default categories unless some already exist. Returns how many
/// were inserted.
pub async fn seed_default_categories<C>(db: &C, defaults: &[CategoryConfig]) -> Result<usize>
where
    C: ConnectionTrait,
{
    let existing = Category::find()
        .filter(category::Column::IsDefault.eq(true))
        .count(db)
        .await?;
    if existing > 0 {
        debug!(existing, "default categories already present");
        return Ok(0);
    }

    let now = Utc::now();
    for config in defaults {
        category::ActiveModel {
            user_id: Set(None),
            name: Set(clean_name(&config.name)?),
            color: Set(config.color.clone()),
            is_default: Set(true),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    info!(count = defaults.len(), "seeded default categories");
    Ok(defaults.len())
}

/// Defaults first, then the user's own categories, each in creation order.
pub async fn categories_for_user<C>(db: &C, user_id: &str) -> Result<Vec<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find()
        .filter(
            Condition::any()
                .add(category::Column::IsDefault.eq(true))
                .add(category::Column::UserId.eq(user_id)),
        )
        .order_by_desc(category::Column::IsDefault)
        .order_by_asc(category::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a category owned by `user_id`.
pub async fn create_category<C>(db: &C, user_id: &str, new: NewCategory) -> Result<category::Model>
where
    C: ConnectionTrait,
{
    let created = category::ActiveModel {
        user_id: Set(Some(user_id.to_string())),
        name: Set(clean_name(&new.name)?),
        color: Set(new
            .color
            .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string())),
        is_default: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created)
}

/// Loads a category the user may see and rejects defaults, which cannot change.
async fn find_editable<C>(db: &C, user_id: &str, id: i64) -> Result<category::Model>
where
    C: ConnectionTrait,
{
    let found = Category::find_by_id(id)
        .filter(
            Condition::any()
                .add(category::Column::IsDefault.eq(true))
                .add(category::Column::UserId.eq(user_id)),
        )
        .one(db)
        .await?
        .ok_or(Error::CategoryNotFound { id })?;

    if found.is_default {
        return Err(Error::DefaultCategoryReadOnly { name: found.name });
    }
    Ok(found)
}

/// Renames or recolors one of the user's categories.
///
/// Existing transactions keep the category name they were recorded with.
pub async fn update_category<C>(
    db: &C,
    user_id: &str,
    id: i64,
    changes: CategoryChanges,
) -> Result<category::Model>
where
    C: ConnectionTrait,
{
    let name = changes.name.as_deref().map(clean_name).transpose()?;
    let existing = find_editable(db, user_id, id).await?;

    let mut active: category::ActiveModel = existing.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(color) = changes.color {
        active.color = Set(color);
    }
    active.update(db).await.map_err(Into::into)
}

/// Deletes one of the user's categories.
pub async fn delete_category<C>(db: &C, user_id: &str, id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = find_editable(db, user_id, id).await?;
    existing.delete(db).await?;
    Ok(())
}
