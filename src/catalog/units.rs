use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;

use super::localized::clean_translation;
use super::pagination::{contains_text, fetch_page, ListParams, Page, UNITS_PER_PAGE};
use super::validation::{clean_name, ensure_unique_name, name_key, NamedKind};
use super::{delete_write_error, in_use, name_write_error, Catalog};
use crate::db::entities::{recipe_ingredient, unit};
use crate::error::{Result, ServerError};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UnitInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
}

impl Catalog {
    /// Units in alphabetical order, optionally filtered by a name fragment.
    pub async fn list_units(&self, params: &ListParams) -> Result<Page<unit::Model>> {
        let mut select = unit::Entity::find();
        if let Some(q) = params.search() {
            let name = contains_text((unit::Entity, unit::Column::NameKey), &name_key(q));
            select = select.filter(name);
        }
        let select = select
            .order_by_asc(unit::Column::NameKey)
            .order_by_asc(unit::Column::Id);

        fetch_page(self.db.as_ref(), select, UNITS_PER_PAGE, params.page.as_deref()).await
    }

    pub async fn get_unit(&self, id: i32) -> Result<unit::Model> {
        unit::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("Unit {}", id)))
    }

    pub async fn create_unit(&self, input: UnitInput) -> Result<unit::Model> {
        let name = clean_name(NamedKind::Unit, &input.name)?;
        ensure_unique_name(self.db.as_ref(), NamedKind::Unit, &name, None).await?;

        let created = unit::ActiveModel {
            name: Set(name.clone()),
            name_key: Set(name_key(&name)),
            name_en: Set(clean_translation(input.name_en)),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| name_write_error(e, NamedKind::Unit, &name))?;

        tracing::info!("Created unit {} \"{}\"", created.id, created.name);
        Ok(created)
    }

    pub async fn update_unit(&self, id: i32, input: UnitInput) -> Result<unit::Model> {
        let existing = self.get_unit(id).await?;
        let name = clean_name(NamedKind::Unit, &input.name)?;
        ensure_unique_name(self.db.as_ref(), NamedKind::Unit, &name, Some(id)).await?;

        let mut active: unit::ActiveModel = existing.into();
        active.name = Set(name.clone());
        active.name_key = Set(name_key(&name));
        active.name_en = Set(clean_translation(input.name_en));
        let updated = active
            .update(self.db.as_ref())
            .await
            .map_err(|e| name_write_error(e, NamedKind::Unit, &name))?;

        tracing::info!("Updated unit {} \"{}\"", updated.id, updated.name);
        Ok(updated)
    }

    /// Delete a unit no recipe refers to.
    pub async fn delete_unit(&self, id: i32) -> Result<unit::Model> {
        let existing = self.get_unit(id).await?;

        let uses = recipe_ingredient::Entity::find()
            .filter(recipe_ingredient::Column::UnitId.eq(id))
            .count(self.db.as_ref())
            .await?;
        if uses > 0 {
            return Err(in_use("Unit", &existing.name, uses));
        }

        unit::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| delete_write_error(e, "Unit", &existing.name))?;
        tracing::info!("Deleted unit {} \"{}\"", existing.id, existing.name);
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::catalog::testing::harness;

    fn input(name: &str) -> UnitInput {
        UnitInput {
            name: name.to_string(),
            name_en: None,
        }
    }

    #[tokio::test]
    async fn test_create_trims_and_rejects_case_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;

        let grams = h.catalog.create_unit(input("  g ")).await.unwrap();
        assert_eq!(grams.name, "g");

        let err = h.catalog.create_unit(input("G")).await.unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));
        assert_eq!(err.to_string(), "A unit named \"G\" already exists.");

        let err = h.catalog.create_unit(input("   ")).await.unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rename_to_own_name_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;

        let ml = h.catalog.create_unit(input("ml")).await.unwrap();
        h.catalog.create_unit(input("tbsp")).await.unwrap();

        let same = h.catalog.update_unit(ml.id, input("ML")).await.unwrap();
        assert_eq!(same.name, "ML");

        let err = h.catalog.update_unit(ml.id, input("TBSP")).await.unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));

        let err = h.catalog.update_unit(999, input("cup")).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_is_alphabetical_and_searchable() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;

        for name in ["tsp", "Cup", "g", "tbsp"] {
            h.catalog.create_unit(input(name)).await.unwrap();
        }

        let page = h.catalog.list_units(&ListParams::default()).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Cup", "g", "tbsp", "tsp"]);

        let params = ListParams {
            q: Some("SP".into()),
            ..Default::default()
        };
        let page = h.catalog.list_units(&params).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["tbsp", "tsp"]);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;

        for name in ["g", "ml", "cup", "c_s", "100%"] {
            h.catalog.create_unit(input(name)).await.unwrap();
        }

        let search = |q: &str| ListParams {
            q: Some(q.to_string()),
            ..Default::default()
        };
        let names = |page: Page<unit::Model>| -> Vec<String> {
            page.items.into_iter().map(|u| u.name).collect()
        };

        assert_eq!(names(h.catalog.list_units(&search("_")).await.unwrap()), vec!["c_s"]);
        assert_eq!(names(h.catalog.list_units(&search("%")).await.unwrap()), vec!["100%"]);
        assert_eq!(h.catalog.list_units(&search("\\")).await.unwrap().total, 0);
        assert_eq!(h.catalog.list_units(&search("c_")).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_delete_unused_unit() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;

        let cup = h.catalog.create_unit(input("cup")).await.unwrap();
        h.catalog.delete_unit(cup.id).await.unwrap();
        assert!(matches!(
            h.catalog.get_unit(cup.id).await,
            Err(ServerError::NotFound(_))
        ));
    }
}
