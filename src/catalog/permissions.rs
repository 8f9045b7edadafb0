//! Who may edit or delete a recipe.
//!
//! This is the only place the rule lives: request handlers call
//! [`authorize_recipe`] before mutating, and recipe views use
//! [`can_modify_recipe`] to tell clients which actions to offer.

use std::collections::HashSet;

use crate::db::entities::recipe;
use crate::error::{Result, ServerError};

pub const MANAGER_GROUP: &str = "Manager";
pub const COOK_GROUP: &str = "Cook";
pub const KNOWN_GROUPS: &[&str] = &[MANAGER_GROUP, COOK_GROUP];

pub const CHANGE_RECIPE: &str = "change_recipe";
pub const DELETE_RECIPE: &str = "delete_recipe";
pub const KNOWN_CAPABILITIES: &[&str] = &[CHANGE_RECIPE, DELETE_RECIPE];

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Cook,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecipeAction {
    Edit,
    Delete,
}

impl RecipeAction {
    /// Capability that lets a user without a recognized role do this anyway.
    pub fn capability(self) -> &'static str {
        match self {
            RecipeAction::Edit => CHANGE_RECIPE,
            RecipeAction::Delete => DELETE_RECIPE,
        }
    }
}

/// The authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub username: String,
    pub groups: Vec<String>,
    pub capabilities: HashSet<String>,
}

impl Identity {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Manager outranks Cook when a user is in both.
    pub fn role(&self) -> Role {
        if self.in_group(MANAGER_GROUP) {
            Role::Manager
        } else if self.in_group(COOK_GROUP) {
            Role::Cook
        } else {
            Role::Other
        }
    }

    pub fn has_capability(&self, codename: &str) -> bool {
        self.capabilities.contains(codename)
    }
}

pub fn can_modify_recipe(identity: &Identity, owner_id: Option<i32>, action: RecipeAction) -> bool {
    match identity.role() {
        Role::Manager => true,
        Role::Cook => owner_id == Some(identity.user_id),
        Role::Other => identity.has_capability(action.capability()),
    }
}

pub fn authorize_recipe(identity: &Identity, recipe: &recipe::Model, action: RecipeAction) -> Result<()> {
    if can_modify_recipe(identity, recipe.user_id, action) {
        Ok(())
    } else {
        tracing::debug!(
            "{:?} of recipe {} denied to {} ({:?})",
            action,
            recipe.id,
            identity.username,
            identity.role()
        );
        Err(ServerError::PermissionDenied)
    }
}

/// Account administration is reserved to managers.
pub fn require_manager(identity: &Identity) -> Result<()> {
    if identity.role() == Role::Manager {
        Ok(())
    } else {
        Err(ServerError::PermissionDenied)
    }
}

#[cfg(test)]
pub fn identity(user_id: i32, groups: &[&str], capabilities: &[&str]) -> Identity {
    Identity {
        user_id,
        username: format!("user{}", user_id),
        groups: groups.iter().map(|g| g.to_string()).collect(),
        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
    }
}
