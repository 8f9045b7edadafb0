pub mod account;
pub mod auth;
pub mod catalog;
pub mod handlers;
pub mod views;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

pub use handlers::AppState;

/// Every route of the service.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health))
        // Accounts
        .route("/api/auth/register", post(account::register))
        .route("/api/auth/login", post(account::login))
        .route("/api/auth/logout", post(account::logout))
        .route("/api/account", get(account::get_account).put(account::update_account))
        .route("/api/account/password", post(account::change_password))
        .route("/api/users/:username/groups", post(account::add_group))
        .route("/api/users/:username/groups/:group", delete(account::remove_group))
        .route("/api/users/:username/permissions", post(account::grant_permission))
        // Catalog
        .route("/api/units", get(catalog::list_units).post(catalog::create_unit))
        .route(
            "/api/units/:id",
            get(catalog::get_unit)
                .put(catalog::update_unit)
                .delete(catalog::delete_unit),
        )
        .route(
            "/api/ingredients",
            get(catalog::list_ingredients).post(catalog::create_ingredient),
        )
        .route(
            "/api/ingredients/:id",
            get(catalog::get_ingredient)
                .put(catalog::update_ingredient)
                .delete(catalog::delete_ingredient),
        )
        .route("/api/recipes", get(catalog::list_recipes).post(catalog::create_recipe))
        .route(
            "/api/recipes/:id",
            get(catalog::get_recipe)
                .put(catalog::update_recipe)
                .delete(catalog::delete_recipe),
        )
        .route("/media/:namespace/:key", get(handlers::media))
}
