use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;

use super::images::{superseded, ImageChange, ImageUpload};
use super::localized::clean_translation;
use super::pagination::{contains_text, fetch_page, ListParams, Page, INGREDIENTS_PER_PAGE};
use super::validation::{ensure_unique_name, name_key, required, NamedKind};
use super::{delete_write_error, in_use, name_write_error, Catalog};
use crate::db::entities::{ingredient, recipe_ingredient};
use crate::error::{Result, ServerError, ValidationErrors};
use crate::storage::namespaces;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct IngredientInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub image: Option<ImageUpload>,
    #[serde(default)]
    pub remove_image: bool,
}

impl Catalog {
    pub async fn list_ingredients(&self, params: &ListParams) -> Result<Page<ingredient::Model>> {
        let mut select = ingredient::Entity::find();
        if let Some(q) = params.search() {
            select = select.filter(contains_text(
                (ingredient::Entity, ingredient::Column::NameKey),
                &name_key(q),
            ));
        }
        let select = select
            .order_by_asc(ingredient::Column::NameKey)
            .order_by_asc(ingredient::Column::Id);

        fetch_page(self.db.as_ref(), select, INGREDIENTS_PER_PAGE, params.page.as_deref()).await
    }

    pub async fn get_ingredient(&self, id: i32) -> Result<ingredient::Model> {
        ingredient::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("Ingredient {}", id)))
    }

    /// Name and image problems are reported together.
    fn validate_ingredient(&self, input: &IngredientInput) -> Result<(String, ImageChange)> {
        let mut errors = ValidationErrors::new();
        let name = required(&mut errors, "name", "Ingredient name", &input.name);
        let image = self
            .images
            .decode(input.image.as_ref(), input.remove_image, &mut errors);
        errors.into_result()?;
        Ok((name, image))
    }

    pub async fn create_ingredient(&self, input: IngredientInput) -> Result<ingredient::Model> {
        let (name, image) = self.validate_ingredient(&input)?;
        ensure_unique_name(self.db.as_ref(), NamedKind::Ingredient, &name, None).await?;

        let stored = match &image {
            ImageChange::Replace(decoded) => {
                Some(self.images.store(namespaces::INGREDIENTS, decoded).await?)
            }
            ImageChange::Keep | ImageChange::Remove => None,
        };

        let result = ingredient::ActiveModel {
            name: Set(name.clone()),
            name_key: Set(name_key(&name)),
            name_en: Set(clean_translation(input.name_en)),
            image: Set(stored.clone()),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await;

        match result {
            Ok(created) => {
                tracing::info!("Created ingredient {} \"{}\"", created.id, created.name);
                Ok(created)
            }
            Err(e) => {
                if let Some(reference) = &stored {
                    self.images.release_logged(reference).await;
                }
                Err(name_write_error(e, NamedKind::Ingredient, &name))
            }
        }
    }

    pub async fn update_ingredient(&self, id: i32, input: IngredientInput) -> Result<ingredient::Model> {
        let existing = self.get_ingredient(id).await?;
        let (name, image) = self.validate_ingredient(&input)?;
        ensure_unique_name(self.db.as_ref(), NamedKind::Ingredient, &name, Some(id)).await?;

        let old_image = existing.image.clone();
        let (new_image, stored) = match &image {
            ImageChange::Keep => (old_image.clone(), None),
            ImageChange::Remove => (None, None),
            ImageChange::Replace(decoded) => {
                let reference = self.images.store(namespaces::INGREDIENTS, decoded).await?;
                (Some(reference.clone()), Some(reference))
            }
        };

        let mut active: ingredient::ActiveModel = existing.into();
        active.name = Set(name.clone());
        active.name_key = Set(name_key(&name));
        active.name_en = Set(clean_translation(input.name_en));
        active.image = Set(new_image.clone());

        let updated = match active.update(self.db.as_ref()).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(reference) = &stored {
                    self.images.release_logged(reference).await;
                }
                return Err(name_write_error(e, NamedKind::Ingredient, &name));
            }
        };

        if let Some(old) = superseded(old_image.as_deref(), new_image.as_deref()) {
            self.images.release_logged(old).await;
        }
        tracing::info!("Updated ingredient {} \"{}\"", updated.id, updated.name);
        Ok(updated)
    }

    /// Delete an ingredient no recipe uses, together with its picture.
    pub async fn delete_ingredient(&self, id: i32) -> Result<ingredient::Model> {
        let existing = self.get_ingredient(id).await?;

        let uses = recipe_ingredient::Entity::find()
            .filter(recipe_ingredient::Column::IngredientId.eq(id))
            .count(self.db.as_ref())
            .await?;
        if uses > 0 {
            return Err(in_use("Ingredient", &existing.name, uses));
        }

        ingredient::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| delete_write_error(e, "Ingredient", &existing.name))?;
        if let Some(reference) = &existing.image {
            self.images.release_logged(reference).await;
        }
        tracing::info!("Deleted ingredient {} \"{}\"", existing.id, existing.name);
        Ok(existing)
    }
}
