//! The recipe catalog: units, ingredients, recipes and the rules guarding
//! every change to them.

pub mod clock;
pub mod images;
pub mod instructions;
pub mod localized;
pub mod pagination;
pub mod permissions;
pub mod validation;

mod ingredients;
mod recipes;
mod units;

use std::sync::Arc;

use sea_orm::{DatabaseConnection, DbErr, SqlErr};

use crate::error::{FieldError, ServerError};

pub use clock::{Clock, SystemClock};
pub use images::ImageStore;
pub use ingredients::IngredientInput;
pub use localized::Language;
pub use pagination::{ListParams, Page};
pub use permissions::{Identity, Role};
pub use recipes::{RecipeDetail, RecipeInput, RecipeLine};
pub use units::UnitInput;

use validation::{duplicate_name, NamedKind};

/// Entry point for every catalog read and write.
#[derive(Clone)]
pub struct Catalog {
    db: Arc<DatabaseConnection>,
    images: ImageStore,
    clock: Arc<dyn Clock>,
}

impl Catalog {
    pub fn new(db: Arc<DatabaseConnection>, images: ImageStore, clock: Arc<dyn Clock>) -> Self {
        Self { db, images, clock }
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }
}

/// A write that lost a race against the uniqueness check still reads as a
/// duplicate name, not a database failure.
fn name_write_error(err: DbErr, kind: NamedKind, name: &str) -> ServerError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_name(kind, name),
        _ => ServerError::Database(err),
    }
}

/// A delete that slipped past the reference count is still refused by the
/// `RESTRICT` foreign key; report it like the counted case.
fn delete_write_error(err: DbErr, kind: &str, name: &str) -> ServerError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => ServerError::Conflict(FieldError::new(
            "id",
            format!("{} \"{}\" is used by a recipe and cannot be deleted.", kind, name),
        )),
        _ => ServerError::Database(err),
    }
}

fn in_use(kind: &str, name: &str, recipes: u64) -> ServerError {
    ServerError::Conflict(FieldError::new(
        "id",
        format!(
            "{} \"{}\" is used by {} recipe{} and cannot be deleted.",
            kind,
            name,
            recipes,
            if recipes == 1 { "" } else { "s" }
        ),
    ))
}

#[cfg(test)]
pub mod testing {
    use std::path::Path;
    use std::sync::Arc;

    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

    use super::clock::ManualClock;
    use super::images::testing::RecordingStorage;
    use super::{Catalog, ImageStore};
    use crate::db::entities::user;
    use crate::db::test_database;

    pub struct Harness {
        pub catalog: Catalog,
        pub db: Arc<DatabaseConnection>,
        pub storage: Arc<RecordingStorage>,
        pub clock: Arc<ManualClock>,
    }

    pub async fn harness(dir: &Path) -> Harness {
        let db = Arc::new(test_database(dir).await);
        let storage = Arc::new(RecordingStorage::default());
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let catalog = Catalog::new(
            db.clone(),
            ImageStore::new(storage.clone(), 1024 * 1024),
            clock.clone(),
        );
        Harness { catalog, db, storage, clock }
    }

    /// Insert a bare user row and return its id.
    pub async fn user(db: &DatabaseConnection, username: &str) -> i32 {
        user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(String::new()),
            created_at: Set(0),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }
}
