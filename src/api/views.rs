//! JSON shapes returned by the API, with display strings resolved for the
//! request language.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::catalog::instructions::split_steps;
use crate::catalog::permissions::{can_modify_recipe, Identity, RecipeAction, Role};
use crate::catalog::{Language, Page, RecipeDetail, RecipeLine};
use crate::db::entities::{ingredient, recipe, unit, user};

fn media_url(reference: Option<&str>) -> Option<String> {
    reference.map(|r| format!("/media/{}", r))
}

#[derive(Serialize)]
pub struct UnitView {
    pub id: i32,
    /// Display name in the request language
    pub name: String,
    pub name_fr: String,
    pub name_en: Option<String>,
}

impl UnitView {
    pub fn new(unit: &unit::Model, lang: Language) -> Self {
        Self {
            id: unit.id,
            name: unit.localized_name().resolve(lang).to_string(),
            name_fr: unit.name.clone(),
            name_en: unit.name_en.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct IngredientView {
    pub id: i32,
    pub name: String,
    pub name_fr: String,
    pub name_en: Option<String>,
    pub image_url: Option<String>,
}

impl IngredientView {
    pub fn new(ingredient: &ingredient::Model, lang: Language) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.localized_name().resolve(lang).to_string(),
            name_fr: ingredient.name.clone(),
            name_en: ingredient.name_en.clone(),
            image_url: media_url(ingredient.image.as_deref()),
        }
    }
}

#[derive(Serialize)]
pub struct RecipeSummary {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl RecipeSummary {
    pub fn new(recipe: &recipe::Model, authors: &HashMap<i32, String>, lang: Language) -> Self {
        Self {
            id: recipe.id,
            title: recipe.localized_title().resolve(lang).to_string(),
            description: recipe.localized_description().resolve(lang).to_string(),
            image_url: media_url(recipe.image.as_deref()),
            author: recipe.user_id.and_then(|id| authors.get(&id).cloned()),
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct LineView {
    pub id: i32,
    pub ingredient_id: i32,
    pub ingredient: String,
    pub ingredient_image_url: Option<String>,
    pub quantity: String,
    pub unit_id: i32,
    pub unit: String,
}

impl LineView {
    fn new(line: &RecipeLine, lang: Language) -> Self {
        Self {
            id: line.id,
            ingredient_id: line.ingredient.id,
            ingredient: line.ingredient.localized_name().resolve(lang).to_string(),
            ingredient_image_url: media_url(line.ingredient.image.as_deref()),
            quantity: line.quantity.clone(),
            unit_id: line.unit.id,
            unit: line.unit.localized_name().resolve(lang).to_string(),
        }
    }
}

/// Untranslated values, so a client can prefill an edit form.
#[derive(Serialize)]
pub struct RecipeSource {
    pub title: String,
    pub title_en: Option<String>,
    pub description: String,
    pub description_en: Option<String>,
    pub instructions: String,
    pub instructions_en: Option<String>,
}

#[derive(Serialize)]
pub struct RecipeView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub instructions: String,
    pub steps: Vec<String>,
    pub ingredients: Vec<LineView>,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub can_edit: bool,
    pub can_delete: bool,
    pub source: RecipeSource,
}

impl RecipeView {
    pub fn new(detail: &RecipeDetail, viewer: Option<&Identity>, lang: Language) -> Self {
        let recipe = &detail.recipe;
        let allowed = |action: RecipeAction| {
            viewer.is_some_and(|v| can_modify_recipe(v, recipe.user_id, action))
        };
        let instructions = recipe.localized_instructions().resolve(lang);

        Self {
            id: recipe.id,
            title: recipe.localized_title().resolve(lang).to_string(),
            description: recipe.localized_description().resolve(lang).to_string(),
            instructions: instructions.to_string(),
            steps: split_steps(instructions),
            ingredients: detail.lines.iter().map(|l| LineView::new(l, lang)).collect(),
            image_url: media_url(recipe.image.as_deref()),
            author: detail.author.clone(),
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
            can_edit: allowed(RecipeAction::Edit),
            can_delete: allowed(RecipeAction::Delete),
            source: RecipeSource {
                title: recipe.title.clone(),
                title_en: recipe.title_en.clone(),
                description: recipe.description.clone(),
                description_en: recipe.description_en.clone(),
                instructions: recipe.instructions.clone(),
                instructions_en: recipe.instructions_en.clone(),
            },
        }
    }
}

#[derive(Serialize)]
pub struct AccountView {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub groups: Vec<String>,
    pub role: Role,
    pub capabilities: BTreeSet<String>,
    pub created_at: i64,
}

impl AccountView {
    pub fn new(user: &user::Model, identity: &Identity) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            groups: identity.groups.clone(),
            role: identity.role(),
            capabilities: identity.capabilities.iter().cloned().collect(),
            created_at: user.created_at,
        }
    }
}

/// Group and capability state of a user after an administrative change.
#[derive(Serialize)]
pub struct MembershipView {
    pub username: String,
    pub groups: Vec<String>,
    pub role: Role,
    pub capabilities: BTreeSet<String>,
}

impl From<Identity> for MembershipView {
    fn from(identity: Identity) -> Self {
        Self {
            role: identity.role(),
            capabilities: identity.capabilities.into_iter().collect(),
            username: identity.username,
            groups: identity.groups,
        }
    }
}

/// A page of views plus the language they were resolved in.
#[derive(Serialize)]
pub struct PageView<T: Serialize> {
    pub lang: &'static str,
    #[serde(flatten)]
    pub page: Page<T>,
}

impl<T: Serialize> PageView<T> {
    pub fn new(page: Page<T>, lang: Language) -> Self {
        Self {
            lang: lang.code(),
            page,
        }
    }
}
