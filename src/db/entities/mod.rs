//! Database entities

pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod session;
pub mod unit;
pub mod user;
pub mod user_group;
pub mod user_permission;

