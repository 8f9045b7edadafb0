//! Unit, ingredient and recipe endpoints.
//!
//! Reads are public. Every mutation needs an authenticated caller; recipe
//! edits and deletes are further checked against the recipe's owner.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::handlers::{created, current_identity, request_language, require_identity, AppState, LangQuery};
use super::views::{IngredientView, PageView, RecipeSummary, RecipeView, UnitView};
use crate::catalog::{IngredientInput, ListParams, RecipeInput, UnitInput};
use crate::error::Result;

// ============================================================================
// Units
// ============================================================================

pub async fn list_units(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
    Query(lang): Query<LangQuery>,
    headers: HeaderMap,
) -> Result<Json<PageView<UnitView>>> {
    let lang = request_language(&lang, &headers);
    let page = state.catalog.list_units(&params).await?;
    Ok(Json(PageView::new(page.map(|u| UnitView::new(&u, lang)), lang)))
}

pub async fn get_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(lang): Query<LangQuery>,
    headers: HeaderMap,
) -> Result<Json<UnitView>> {
    let lang = request_language(&lang, &headers);
    let unit = state.catalog.get_unit(id).await?;
    Ok(Json(UnitView::new(&unit, lang)))
}

pub async fn create_unit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<UnitInput>,
) -> Result<Response> {
    require_identity(&state, &headers).await?;
    let unit = state.catalog.create_unit(input).await?;
    Ok(created(UnitView::new(&unit, Default::default())))
}

pub async fn update_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(input): Json<UnitInput>,
) -> Result<Json<UnitView>> {
    require_identity(&state, &headers).await?;
    let unit = state.catalog.update_unit(id, input).await?;
    Ok(Json(UnitView::new(&unit, Default::default())))
}

pub async fn delete_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<Response> {
    require_identity(&state, &headers).await?;
    state.catalog.delete_unit(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ============================================================================
// Ingredients
// ============================================================================

pub async fn list_ingredients(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
    Query(lang): Query<LangQuery>,
    headers: HeaderMap,
) -> Result<Json<PageView<IngredientView>>> {
    let lang = request_language(&lang, &headers);
    let page = state.catalog.list_ingredients(&params).await?;
    Ok(Json(PageView::new(page.map(|i| IngredientView::new(&i, lang)), lang)))
}

pub async fn get_ingredient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(lang): Query<LangQuery>,
    headers: HeaderMap,
) -> Result<Json<IngredientView>> {
    let lang = request_language(&lang, &headers);
    let ingredient = state.catalog.get_ingredient(id).await?;
    Ok(Json(IngredientView::new(&ingredient, lang)))
}

pub async fn create_ingredient(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<IngredientInput>,
) -> Result<Response> {
    require_identity(&state, &headers).await?;
    let ingredient = state.catalog.create_ingredient(input).await?;
    Ok(created(IngredientView::new(&ingredient, Default::default())))
}

pub async fn update_ingredient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(input): Json<IngredientInput>,
) -> Result<Json<IngredientView>> {
    require_identity(&state, &headers).await?;
    let ingredient = state.catalog.update_ingredient(id, input).await?;
    Ok(Json(IngredientView::new(&ingredient, Default::default())))
}

pub async fn delete_ingredient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<Response> {
    require_identity(&state, &headers).await?;
    state.catalog.delete_ingredient(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ============================================================================
// Recipes
// ============================================================================

pub async fn list_recipes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
    Query(lang): Query<LangQuery>,
    headers: HeaderMap,
) -> Result<Json<PageView<RecipeSummary>>> {
    let lang = request_language(&lang, &headers);
    let page = state.catalog.list_recipes(&params).await?;
    let authors = state.catalog.author_names(&page.items).await?;
    Ok(Json(PageView::new(
        page.map(|r| RecipeSummary::new(&r, &authors, lang)),
        lang,
    )))
}

pub async fn get_recipe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(lang): Query<LangQuery>,
    headers: HeaderMap,
) -> Result<Json<RecipeView>> {
    let lang = request_language(&lang, &headers);
    let viewer = current_identity(&state, &headers).await?;
    let detail = state.catalog.recipe_detail(id).await?;
    Ok(Json(RecipeView::new(&detail, viewer.as_ref(), lang)))
}

pub async fn create_recipe(
    State(state): State<Arc<AppState>>,
    Query(lang): Query<LangQuery>,
    headers: HeaderMap,
    Json(input): Json<RecipeInput>,
) -> Result<Response> {
    let lang = request_language(&lang, &headers);
    let identity = require_identity(&state, &headers).await?;
    let detail = state.catalog.create_recipe(&identity, input).await?;
    Ok(created(RecipeView::new(&detail, Some(&identity), lang)))
}

pub async fn update_recipe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(lang): Query<LangQuery>,
    headers: HeaderMap,
    Json(input): Json<RecipeInput>,
) -> Result<Json<RecipeView>> {
    let lang = request_language(&lang, &headers);
    let identity = require_identity(&state, &headers).await?;
    let detail = state.catalog.update_recipe(&identity, id, input).await?;
    Ok(Json(RecipeView::new(&detail, Some(&identity), lang)))
}

pub async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<Response> {
    let identity = require_identity(&state, &headers).await?;
    state.catalog.delete_recipe(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
