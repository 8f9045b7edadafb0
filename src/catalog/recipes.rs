use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;

use super::images::{superseded, ImageChange, ImageUpload};
use super::localized::clean_translation;
use super::pagination::{contains_text, fetch_page, ListParams, Page, RECIPES_PER_PAGE};
use super::permissions::{authorize_recipe, Identity, RecipeAction};
use super::validation::{required, validate_ingredient_set, IngredientLine, IngredientLineInput};
use super::Catalog;
use crate::db::entities::{ingredient, recipe, recipe_ingredient, unit, user};
use crate::error::{Result, ServerError, ValidationErrors};
use crate::storage::namespaces;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecipeInput {
    pub title: String,
    pub title_en: Option<String>,
    pub description: String,
    pub description_en: Option<String>,
    pub instructions: String,
    pub instructions_en: Option<String>,
    pub ingredients: Vec<IngredientLineInput>,
    pub image: Option<ImageUpload>,
    pub remove_image: bool,
}

/// A submission that passed every check.
struct ValidRecipe {
    title: String,
    description: String,
    instructions: String,
    lines: Vec<IngredientLine>,
    image: ImageChange,
}

/// One ingredient row of a recipe, with its references resolved.
#[derive(Clone, Debug)]
pub struct RecipeLine {
    pub id: i32,
    pub ingredient: ingredient::Model,
    pub unit: unit::Model,
    pub quantity: String,
}

#[derive(Clone, Debug)]
pub struct RecipeDetail {
    pub recipe: recipe::Model,
    pub lines: Vec<RecipeLine>,
    pub author: Option<String>,
}

impl Catalog {
    /// Newest recipes first; `q` matches the title or the description.
    pub async fn list_recipes(&self, params: &ListParams) -> Result<Page<recipe::Model>> {
        let mut select = recipe::Entity::find();
        if let Some(q) = params.search() {
            select = select.filter(
                Condition::any()
                    .add(contains_text((recipe::Entity, recipe::Column::Title), q))
                    .add(contains_text((recipe::Entity, recipe::Column::Description), q)),
            );
        }
        let select = select
            .order_by_desc(recipe::Column::CreatedAt)
            .order_by_desc(recipe::Column::Id);

        fetch_page(self.db.as_ref(), select, RECIPES_PER_PAGE, params.page.as_deref()).await
    }

    pub async fn get_recipe(&self, id: i32) -> Result<recipe::Model> {
        recipe::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("Recipe {}", id)))
    }

    pub async fn recipe_detail(&self, id: i32) -> Result<RecipeDetail> {
        let recipe = self.get_recipe(id).await?;
        let lines = load_lines(self.db.as_ref(), recipe.id).await?;
        let author = match recipe.user_id {
            Some(user_id) => user::Entity::find_by_id(user_id)
                .one(self.db.as_ref())
                .await?
                .map(|u| u.username),
            None => None,
        };
        Ok(RecipeDetail { recipe, lines, author })
    }

    /// Usernames of the authors of `recipes`, keyed by user id.
    pub async fn author_names(&self, recipes: &[recipe::Model]) -> Result<HashMap<i32, String>> {
        let ids: Vec<i32> = recipes.iter().filter_map(|r| r.user_id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let users = user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(self.db.as_ref())
            .await?;
        Ok(users.into_iter().map(|u| (u.id, u.username)).collect())
    }

    /// Collect every problem with a submission before touching anything.
    async fn validate_recipe(&self, input: &RecipeInput) -> Result<ValidRecipe> {
        let mut errors = ValidationErrors::new();
        let title = required(&mut errors, "title", "Title", &input.title);
        let description = required(&mut errors, "description", "Description", &input.description);
        let instructions = required(&mut errors, "instructions", "Instructions", &input.instructions);
        let lines = validate_ingredient_set(self.db.as_ref(), &input.ingredients, &mut errors).await?;
        let image = self
            .images
            .decode(input.image.as_ref(), input.remove_image, &mut errors);

        if !errors.is_empty() {
            tracing::debug!("Rejected recipe submission with {} error(s)", errors.len());
        }
        errors.into_result()?;

        Ok(ValidRecipe {
            title,
            description,
            instructions,
            lines,
            image,
        })
    }

    pub async fn create_recipe(&self, identity: &Identity, input: RecipeInput) -> Result<RecipeDetail> {
        let valid = self.validate_recipe(&input).await?;
        let stored = match &valid.image {
            ImageChange::Replace(decoded) => Some(self.images.store(namespaces::RECIPES, decoded).await?),
            ImageChange::Keep | ImageChange::Remove => None,
        };

        let now = self.clock.now();
        let model = recipe::ActiveModel {
            title: Set(valid.title),
            title_en: Set(clean_translation(input.title_en)),
            description: Set(valid.description),
            description_en: Set(clean_translation(input.description_en)),
            instructions: Set(valid.instructions),
            instructions_en: Set(clean_translation(input.instructions_en)),
            image: Set(stored.clone()),
            user_id: Set(Some(identity.user_id)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = match self.insert_with_lines(model, &valid.lines).await {
            Ok(created) => created,
            Err(e) => {
                if let Some(reference) = &stored {
                    self.images.release_logged(reference).await;
                }
                return Err(e);
            }
        };

        tracing::info!(
            "{} created recipe {} \"{}\" with {} ingredient(s)",
            identity.username,
            created.id,
            created.title,
            valid.lines.len()
        );
        self.recipe_detail(created.id).await
    }

    async fn insert_with_lines(
        &self,
        model: recipe::ActiveModel,
        lines: &[IngredientLine],
    ) -> Result<recipe::Model> {
        let txn = self.db.begin().await?;
        let created = model.insert(&txn).await?;
        insert_lines(&txn, created.id, lines).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Replace the recipe's fields and its whole ingredient set.
    pub async fn update_recipe(
        &self,
        identity: &Identity,
        id: i32,
        input: RecipeInput,
    ) -> Result<RecipeDetail> {
        let existing = self.get_recipe(id).await?;
        authorize_recipe(identity, &existing, RecipeAction::Edit)?;
        let valid = self.validate_recipe(&input).await?;

        let old_image = existing.image.clone();
        let (new_image, stored) = match &valid.image {
            ImageChange::Keep => (old_image.clone(), None),
            ImageChange::Remove => (None, None),
            ImageChange::Replace(decoded) => {
                let reference = self.images.store(namespaces::RECIPES, decoded).await?;
                (Some(reference.clone()), Some(reference))
            }
        };

        let mut active: recipe::ActiveModel = existing.into();
        active.title = Set(valid.title);
        active.title_en = Set(clean_translation(input.title_en));
        active.description = Set(valid.description);
        active.description_en = Set(clean_translation(input.description_en));
        active.instructions = Set(valid.instructions);
        active.instructions_en = Set(clean_translation(input.instructions_en));
        active.image = Set(new_image.clone());
        active.updated_at = Set(self.clock.now());

        let updated = match self.update_with_lines(active, &valid.lines).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(reference) = &stored {
                    self.images.release_logged(reference).await;
                }
                return Err(e);
            }
        };

        if let Some(old) = superseded(old_image.as_deref(), new_image.as_deref()) {
            self.images.release_logged(old).await;
        }
        tracing::info!("{} updated recipe {} \"{}\"", identity.username, updated.id, updated.title);
        self.recipe_detail(updated.id).await
    }

    async fn update_with_lines(
        &self,
        active: recipe::ActiveModel,
        lines: &[IngredientLine],
    ) -> Result<recipe::Model> {
        let txn = self.db.begin().await?;
        let updated = active.update(&txn).await?;
        recipe_ingredient::Entity::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.eq(updated.id))
            .exec(&txn)
            .await?;
        insert_lines(&txn, updated.id, lines).await?;
        txn.commit().await?;
        Ok(updated)
    }

    pub async fn delete_recipe(&self, identity: &Identity, id: i32) -> Result<recipe::Model> {
        let existing = self.get_recipe(id).await?;
        authorize_recipe(identity, &existing, RecipeAction::Delete)?;

        let txn = self.db.begin().await?;
        recipe_ingredient::Entity::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;
        recipe::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        if let Some(reference) = &existing.image {
            self.images.release_logged(reference).await;
        }
        tracing::info!("{} deleted recipe {} \"{}\"", identity.username, existing.id, existing.title);
        Ok(existing)
    }
}

async fn insert_lines<C: ConnectionTrait>(db: &C, recipe_id: i32, lines: &[IngredientLine]) -> Result<()> {
    if lines.is_empty() {
        return Err(ServerError::Internal(format!(
            "refusing to save recipe {} without ingredients",
            recipe_id
        )));
    }
    let rows = lines.iter().map(|line| recipe_ingredient::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(line.ingredient_id),
        quantity: Set(line.quantity.to_string()),
        unit_id: Set(line.unit_id),
        ..Default::default()
    });
    recipe_ingredient::Entity::insert_many(rows).exec(db).await?;
    Ok(())
}

async fn load_lines<C: ConnectionTrait>(db: &C, recipe_id: i32) -> Result<Vec<RecipeLine>> {
    let rows = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .order_by_asc(recipe_ingredient::Column::Id)
        .all(db)
        .await?;

    let ingredients: HashMap<i32, ingredient::Model> = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(rows.iter().map(|r| r.ingredient_id).collect::<Vec<_>>()))
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();
    let units: HashMap<i32, unit::Model> = unit::Entity::find()
        .filter(unit::Column::Id.is_in(rows.iter().map(|r| r.unit_id).collect::<Vec<_>>()))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    rows.into_iter()
        .map(|row| {
            let dangling = || {
                ServerError::Internal(format!("recipe line {} references a missing row", row.id))
            };
            Ok(RecipeLine {
                id: row.id,
                ingredient: ingredients.get(&row.ingredient_id).cloned().ok_or_else(dangling)?,
                unit: units.get(&row.unit_id).cloned().ok_or_else(dangling)?,
                quantity: row.quantity.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::PaginatorTrait;
    use tempfile::TempDir;

    use crate::catalog::images::testing::png_upload;
    use crate::catalog::permissions::{identity, CHANGE_RECIPE, COOK_GROUP, MANAGER_GROUP};
    use crate::catalog::testing::{harness, user, Harness};
    use crate::catalog::delete_write_error;
    use crate::catalog::validation::QuantityInput;
    use crate::catalog::{IngredientInput, UnitInput};

    struct Pantry {
        flour: i32,
        egg: i32,
        grams: i32,
        piece: i32,
    }

    async fn pantry(h: &Harness) -> Pantry {
        let ingredient = |name: &str| IngredientInput {
            name: name.to_string(),
            ..Default::default()
        };
        let unit = |name: &str| UnitInput {
            name: name.to_string(),
            name_en: None,
        };
        Pantry {
            flour: h.catalog.create_ingredient(ingredient("Flour")).await.unwrap().id,
            egg: h.catalog.create_ingredient(ingredient("Egg")).await.unwrap().id,
            grams: h.catalog.create_unit(unit("g")).await.unwrap().id,
            piece: h.catalog.create_unit(unit("piece")).await.unwrap().id,
        }
    }

    fn line(ingredient_id: i32, quantity: &str, unit_id: i32) -> IngredientLineInput {
        IngredientLineInput {
            ingredient_id,
            quantity: Some(QuantityInput::Text(quantity.to_string())),
            unit_id: Some(unit_id),
        }
    }

    fn pancakes(lines: Vec<IngredientLineInput>) -> RecipeInput {
        RecipeInput {
            title: "Pancakes".into(),
            description: "Fluffy".into(),
            instructions: "1. Mix 2. Cook".into(),
            ingredients: lines,
            ..Default::default()
        }
    }

    async fn recipe_count(h: &Harness) -> u64 {
        recipe::Entity::find().count(h.db.as_ref()).await.unwrap()
    }

    async fn line_count(h: &Harness) -> u64 {
        recipe_ingredient::Entity::find().count(h.db.as_ref()).await.unwrap()
    }

    #[tokio::test]
    async fn test_pancakes_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;
        let p = pantry(&h).await;
        let cook_id = user(h.db.as_ref(), "cook").await;
        let cook = identity(cook_id, &[COOK_GROUP], &[]);

        let created = h
            .catalog
            .create_recipe(&cook, pancakes(vec![line(p.flour, "200", p.grams)]))
            .await
            .unwrap();
        assert_eq!(created.recipe.user_id, Some(cook_id));
        assert_eq!(created.author.as_deref(), Some("cook"));
        assert_eq!(created.lines.len(), 1);
        assert_eq!(created.lines[0].ingredient.name, "Flour");
        assert_eq!(created.lines[0].quantity, "200");
        let created_at = created.recipe.created_at;

        h.clock.advance(60);
        let updated = h
            .catalog
            .update_recipe(
                &cook,
                created.recipe.id,
                pancakes(vec![line(p.flour, "150", p.grams), line(p.egg, "2", p.piece)]),
            )
            .await
            .unwrap();

        let rows: Vec<_> = updated
            .lines
            .iter()
            .map(|l| (l.ingredient.name.as_str(), l.quantity.as_str(), l.unit.name.as_str()))
            .collect();
        assert_eq!(rows, vec![("Flour", "150", "g"), ("Egg", "2", "piece")]);
        assert_eq!(updated.recipe.created_at, created_at);
        assert_eq!(updated.recipe.updated_at, created_at + 60);
        assert_eq!(line_count(&h).await, 2);
    }

    #[tokio::test]
    async fn test_empty_ingredient_list_persists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;
        let cook = identity(user(h.db.as_ref(), "cook").await, &[COOK_GROUP], &[]);

        let err = h
            .catalog
            .create_recipe(&cook, pancakes(Vec::new()))
            .await
            .unwrap_err();

        match err {
            ServerError::Validation(errors) => assert_eq!(
                errors.messages().collect::<Vec<_>>(),
                vec!["At least one ingredient is required."]
            ),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(recipe_count(&h).await, 0);
    }

    #[tokio::test]
    async fn test_all_errors_collected_and_quantity_cites_ingredient() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;
        let p = pantry(&h).await;
        let cook = identity(user(h.db.as_ref(), "cook").await, &[COOK_GROUP], &[]);

        let input = RecipeInput {
            title: "  ".into(),
            ..pancakes(vec![line(p.flour, "abc", p.grams)])
        };
        let err = h.catalog.create_recipe(&cook, input).await.unwrap_err();

        match err {
            ServerError::Validation(errors) => assert_eq!(
                errors.messages().collect::<Vec<_>>(),
                vec!["Title is required.", "Invalid quantity for ingredient Flour."]
            ),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(recipe_count(&h).await, 0);
    }

    #[tokio::test]
    async fn test_failed_edit_leaves_recipe_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;
        let p = pantry(&h).await;
        let cook = identity(user(h.db.as_ref(), "cook").await, &[COOK_GROUP], &[]);

        let created = h
            .catalog
            .create_recipe(&cook, pancakes(vec![line(p.flour, "200", p.grams)]))
            .await
            .unwrap();

        let bad = pancakes(vec![line(p.egg, "-2", p.piece)]);
        assert!(h.catalog.update_recipe(&cook, created.recipe.id, bad).await.is_err());

        let detail = h.catalog.recipe_detail(created.recipe.id).await.unwrap();
        assert_eq!(detail.lines.len(), 1);
        assert_eq!(detail.lines[0].ingredient.id, p.flour);
    }

    #[tokio::test]
    async fn test_edit_without_image_keeps_it() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;
        let p = pantry(&h).await;
        let cook = identity(user(h.db.as_ref(), "cook").await, &[COOK_GROUP], &[]);

        let created = h
            .catalog
            .create_recipe(
                &cook,
                RecipeInput {
                    image: Some(png_upload()),
                    ..pancakes(vec![line(p.flour, "200", p.grams)])
                },
            )
            .await
            .unwrap();
        let image = created.recipe.image.clone().unwrap();

        let updated = h
            .catalog
            .update_recipe(&cook, created.recipe.id, pancakes(vec![line(p.flour, "250", p.grams)]))
            .await
            .unwrap();

        assert_eq!(updated.recipe.image.as_deref(), Some(image.as_str()));
        assert!(h.storage.deleted().is_empty());
        assert_eq!(h.storage.stored(), vec![image]);
    }

    #[tokio::test]
    async fn test_replacing_image_releases_old_one() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;
        let p = pantry(&h).await;
        let manager = identity(user(h.db.as_ref(), "boss").await, &[MANAGER_GROUP], &[]);

        let created = h
            .catalog
            .create_recipe(
                &manager,
                RecipeInput {
                    image: Some(png_upload()),
                    ..pancakes(vec![line(p.flour, "200", p.grams)])
                },
            )
            .await
            .unwrap();
        let old = created.recipe.image.clone().unwrap();

        let updated = h
            .catalog
            .update_recipe(
                &manager,
                created.recipe.id,
                RecipeInput {
                    image: Some(png_upload()),
                    ..pancakes(vec![line(p.flour, "200", p.grams)])
                },
            )
            .await
            .unwrap();

        let new = updated.recipe.image.unwrap();
        assert_ne!(old, new);
        assert_eq!(h.storage.deleted(), vec![old]);
        assert_eq!(h.storage.stored(), vec![new]);
    }

    #[tokio::test]
    async fn test_delete_cascades_and_releases_image_once() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;
        let p = pantry(&h).await;
        let cook = identity(user(h.db.as_ref(), "cook").await, &[COOK_GROUP], &[]);

        let created = h
            .catalog
            .create_recipe(
                &cook,
                RecipeInput {
                    image: Some(png_upload()),
                    ..pancakes(vec![line(p.flour, "200", p.grams), line(p.egg, "2", p.piece)])
                },
            )
            .await
            .unwrap();
        let image = created.recipe.image.clone().unwrap();
        assert_eq!(line_count(&h).await, 2);

        h.catalog.delete_recipe(&cook, created.recipe.id).await.unwrap();

        assert_eq!(recipe_count(&h).await, 0);
        assert_eq!(line_count(&h).await, 0);
        assert_eq!(h.storage.deleted(), vec![image]);
        assert!(matches!(
            h.catalog.get_recipe(created.recipe.id).await,
            Err(ServerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_permission_matrix() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;
        let p = pantry(&h).await;
        let alice = identity(user(h.db.as_ref(), "alice").await, &[COOK_GROUP], &[]);
        let bob = identity(user(h.db.as_ref(), "bob").await, &[COOK_GROUP], &[]);
        let manager = identity(user(h.db.as_ref(), "boss").await, &[MANAGER_GROUP], &[]);
        let editor = identity(user(h.db.as_ref(), "editor").await, &[], &[CHANGE_RECIPE]);

        let recipe = h
            .catalog
            .create_recipe(&alice, pancakes(vec![line(p.flour, "200", p.grams)]))
            .await
            .unwrap()
            .recipe;
        let edit = || pancakes(vec![line(p.egg, "3", p.piece)]);

        assert!(matches!(
            h.catalog.update_recipe(&bob, recipe.id, edit()).await,
            Err(ServerError::PermissionDenied)
        ));
        assert!(matches!(
            h.catalog.delete_recipe(&bob, recipe.id).await,
            Err(ServerError::PermissionDenied)
        ));
        assert!(matches!(
            h.catalog.delete_recipe(&editor, recipe.id).await,
            Err(ServerError::PermissionDenied)
        ));

        h.catalog.update_recipe(&alice, recipe.id, edit()).await.unwrap();
        h.catalog.update_recipe(&editor, recipe.id, edit()).await.unwrap();
        h.catalog.update_recipe(&manager, recipe.id, edit()).await.unwrap();
        h.catalog.delete_recipe(&manager, recipe.id).await.unwrap();
        assert_eq!(recipe_count(&h).await, 0);
    }

    #[tokio::test]
    async fn test_referenced_unit_and_ingredient_cannot_be_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;
        let p = pantry(&h).await;
        let cook = identity(user(h.db.as_ref(), "cook").await, &[COOK_GROUP], &[]);

        h.catalog
            .create_recipe(&cook, pancakes(vec![line(p.flour, "200", p.grams)]))
            .await
            .unwrap();

        let err = h.catalog.delete_unit(p.grams).await.unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));
        assert_eq!(err.to_string(), "Unit \"g\" is used by 1 recipe and cannot be deleted.");
        assert!(matches!(
            h.catalog.delete_ingredient(p.flour).await,
            Err(ServerError::Conflict(_))
        ));

        h.catalog.delete_unit(p.piece).await.unwrap();
        h.catalog.delete_ingredient(p.egg).await.unwrap();
    }

    #[tokio::test]
    async fn test_foreign_key_rejection_maps_to_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;
        let p = pantry(&h).await;
        let cook = identity(user(h.db.as_ref(), "cook").await, &[COOK_GROUP], &[]);

        h.catalog
            .create_recipe(&cook, pancakes(vec![line(p.flour, "200", p.grams)]))
            .await
            .unwrap();

        // Skip the reference count, as a concurrent recipe insert would.
        let err = unit::Entity::delete_by_id(p.grams)
            .exec(h.db.as_ref())
            .await
            .unwrap_err();
        let err = delete_write_error(err, "Unit", "g");
        assert!(matches!(err, ServerError::Conflict(_)));
        assert_eq!(err.to_string(), "Unit \"g\" is used by a recipe and cannot be deleted.");

        let err = ingredient::Entity::delete_by_id(p.flour)
            .exec(h.db.as_ref())
            .await
            .unwrap_err();
        assert!(matches!(
            delete_write_error(err, "Ingredient", "Flour"),
            ServerError::Conflict(_)
        ));
        assert!(h.catalog.get_unit(p.grams).await.is_ok());
    }

    #[tokio::test]
    async fn test_numeric_quantities_stored_exactly() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;
        let p = pantry(&h).await;
        let cook = identity(user(h.db.as_ref(), "cook").await, &[COOK_GROUP], &[]);

        let lines: Vec<IngredientLineInput> = serde_json::from_str(&format!(
            r#"[{{"ingredient_id": {}, "quantity": 0.0000001, "unit_id": {}}},
                {{"ingredient_id": {}, "quantity": 100000000000000000000000, "unit_id": {}}}]"#,
            p.flour, p.grams, p.egg, p.piece
        ))
        .unwrap();
        let created = h.catalog.create_recipe(&cook, pancakes(lines)).await.unwrap();

        let detail = h.catalog.recipe_detail(created.recipe.id).await.unwrap();
        let quantities: Vec<_> = detail.lines.iter().map(|l| l.quantity.as_str()).collect();
        assert_eq!(quantities, vec!["0.0000001", "100000000000000000000000"]);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_search() {
        let temp_dir = TempDir::new().unwrap();
        let h = harness(temp_dir.path()).await;
        let p = pantry(&h).await;
        let cook = identity(user(h.db.as_ref(), "cook").await, &[COOK_GROUP], &[]);

        for title in ["Crêpes", "Omelette", "Quiche"] {
            h.catalog
                .create_recipe(
                    &cook,
                    RecipeInput {
                        title: title.into(),
                        ..pancakes(vec![line(p.egg, "2", p.piece)])
                    },
                )
                .await
                .unwrap();
            h.clock.advance(1);
        }

        let page = h.catalog.list_recipes(&ListParams::default()).await.unwrap();
        let titles: Vec<_> = page.items.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Quiche", "Omelette", "Crêpes"]);

        let params = ListParams {
            q: Some("omel".into()),
            ..Default::default()
        };
        let page = h.catalog.list_recipes(&params).await.unwrap();
        assert_eq!(page.total, 1);

        let params = ListParams {
            q: Some("_".into()),
            ..Default::default()
        };
        assert_eq!(h.catalog.list_recipes(&params).await.unwrap().total, 0);

        let authors = h.catalog.author_names(&page.items).await.unwrap();
        assert_eq!(authors.get(&cook.user_id).map(String::as_str), Some("cook"));
    }
}
