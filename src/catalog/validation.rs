//! Input checks that run before anything is written.
//!
//! Nothing in here mutates the database: the services call these, and only
//! persist once they pass.

use std::str::FromStr;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Deserialize;

use crate::db::entities::{ingredient, unit};
use crate::error::{FieldError, Result, ServerError, ValidationErrors};

/// Entities whose name must be unique regardless of case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamedKind {
    Unit,
    Ingredient,
}

impl NamedKind {
    fn label(self) -> &'static str {
        match self {
            NamedKind::Unit => "unit",
            NamedKind::Ingredient => "ingredient",
        }
    }
}

/// Folded form used for the uniqueness comparison and the unique index.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Trim `value`, recording a "required" error when nothing is left.
pub fn required(errors: &mut ValidationErrors, field: &str, label: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, format!("{} is required.", label));
    }
    trimmed.to_string()
}

/// Trimmed, non-empty name for a unit or ingredient.
pub fn clean_name(kind: NamedKind, raw: &str) -> Result<String> {
    let mut errors = ValidationErrors::new();
    let label = match kind {
        NamedKind::Unit => "Unit name",
        NamedKind::Ingredient => "Ingredient name",
    };
    let name = required(&mut errors, "name", label, raw);
    errors.into_result()?;
    Ok(name)
}

/// Fail with a conflict when another row of `kind` already has this name,
/// ignoring case. `exclude` is the row being edited.
pub async fn ensure_unique_name<C: ConnectionTrait>(
    db: &C,
    kind: NamedKind,
    name: &str,
    exclude: Option<i32>,
) -> Result<()> {
    let key = name_key(name);
    let taken = match kind {
        NamedKind::Unit => {
            let mut query = unit::Entity::find().filter(unit::Column::NameKey.eq(key.as_str()));
            if let Some(id) = exclude {
                query = query.filter(unit::Column::Id.ne(id));
            }
            query.count(db).await? > 0
        }
        NamedKind::Ingredient => {
            let mut query =
                ingredient::Entity::find().filter(ingredient::Column::NameKey.eq(key.as_str()));
            if let Some(id) = exclude {
                query = query.filter(ingredient::Column::Id.ne(id));
            }
            query.count(db).await? > 0
        }
    };

    if taken {
        return Err(duplicate_name(kind, name));
    }
    Ok(())
}

pub fn duplicate_name(kind: NamedKind, name: &str) -> ServerError {
    ServerError::Conflict(FieldError::new(
        "name",
        format!("A {} named \"{}\" already exists.", kind.label(), name.trim()),
    ))
}

/// A quantity as submitted: JSON clients may send `200` or `"200"`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Number(serde_json::Number),
    Text(String),
}

impl QuantityInput {
    /// Strictly positive, normalized value; `None` when invalid.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            QuantityInput::Number(n) => parse_quantity(&n.to_string()),
            QuantityInput::Text(s) => parse_quantity(s),
        }
    }
}

const MAX_QUANTITY_TEXT: usize = 64;

/// Parse a strictly positive decimal, accepting `,` as the decimal separator
/// and exponent notation. The result is normalized ("0200,50" -> 200.5).
pub fn parse_quantity(raw: &str) -> Option<Decimal> {
    let mut text = raw.trim().replace(',', ".");
    if text.is_empty()
        || text.len() > MAX_QUANTITY_TEXT
        || !text.bytes().all(|b| b.is_ascii_digit() || b"+-.eE".contains(&b))
    {
        return None;
    }
    if text.starts_with('.') {
        text.insert(0, '0');
    }
    if text.ends_with('.') {
        text.push('0');
    }

    let value = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()?;
    (value > Decimal::ZERO).then(|| value.normalize())
}

/// One submitted (ingredient, quantity, unit) triple.
#[derive(Clone, Debug, Deserialize)]
pub struct IngredientLineInput {
    pub ingredient_id: i32,
    #[serde(default)]
    pub quantity: Option<QuantityInput>,
    #[serde(default)]
    pub unit_id: Option<i32>,
}

/// A triple that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngredientLine {
    pub ingredient_id: i32,
    pub quantity: Decimal,
    pub unit_id: i32,
}

/// Validate the whole ingredient set of a recipe submission.
///
/// Every problem is pushed onto `errors`; lines are only returned when this
/// set on its own produced no error.
pub async fn validate_ingredient_set<C: ConnectionTrait>(
    db: &C,
    lines: &[IngredientLineInput],
    errors: &mut ValidationErrors,
) -> Result<Vec<IngredientLine>> {
    if lines.is_empty() {
        errors.push("ingredients", "At least one ingredient is required.");
        return Ok(Vec::new());
    }

    let ingredient_ids: Vec<i32> = lines.iter().map(|l| l.ingredient_id).collect();
    let ingredients = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ingredient_ids))
        .all(db)
        .await?;

    let unit_ids: Vec<i32> = lines.iter().filter_map(|l| l.unit_id).collect();
    let known_units: Vec<i32> = unit::Entity::find()
        .filter(unit::Column::Id.is_in(unit_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| u.id)
        .collect();

    let errors_before = errors.len();
    let mut seen = Vec::with_capacity(lines.len());
    let mut valid = Vec::with_capacity(lines.len());

    for (index, line) in lines.iter().enumerate() {
        let field = format!("ingredients[{}]", index);
        let display = match ingredients.iter().find(|i| i.id == line.ingredient_id) {
            Some(found) => found.name.clone(),
            None => {
                errors.push(&field, format!("Unknown ingredient #{}.", line.ingredient_id));
                format!("#{}", line.ingredient_id)
            }
        };

        if seen.contains(&line.ingredient_id) {
            errors.push(&field, format!("Ingredient {} is listed more than once.", display));
        }
        seen.push(line.ingredient_id);

        let quantity = line.quantity.as_ref().and_then(QuantityInput::to_decimal);
        if quantity.is_none() {
            errors.push(&field, format!("Invalid quantity for ingredient {}.", display));
        }

        match line.unit_id {
            None => errors.push(&field, format!("Missing unit for ingredient {}.", display)),
            Some(unit_id) if !known_units.contains(&unit_id) => errors.push(
                &field,
                format!("Unknown unit #{} for ingredient {}.", unit_id, display),
            ),
            Some(_) => {}
        }

        if let (Some(quantity), Some(unit_id)) = (quantity, line.unit_id) {
            valid.push(IngredientLine {
                ingredient_id: line.ingredient_id,
                quantity,
                unit_id,
            });
        }
    }

    if errors.len() > errors_before {
        return Ok(Vec::new());
    }
    Ok(valid)
}
