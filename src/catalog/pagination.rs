//! Page-at-a-time listing.

use sea_orm::sea_query::{Expr, IntoColumnRef, LikeExpr, SimpleExpr};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Select};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const RECIPES_PER_PAGE: u64 = 6;
pub const INGREDIENTS_PER_PAGE: u64 = 9;
pub const UNITS_PER_PAGE: u64 = 8;

/// Query string shared by every list endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListParams {
    /// Kept as text: anything that is not a number means page 1
    pub page: Option<String>,
    /// Search text
    pub q: Option<String>,
}

impl ListParams {
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based
    pub page: u64,
    pub num_pages: u64,
    pub total: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            num_pages: self.num_pages,
            total: self.total,
            has_previous: self.has_previous,
            has_next: self.has_next,
        }
    }
}

/// `column LIKE '%q%'` with `q` matched literally: `%` and `_` in the
/// search text are not wildcards.
pub fn contains_text(column: impl IntoColumnRef, q: &str) -> SimpleExpr {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Expr::col(column).like(LikeExpr::new(pattern).escape('\\'))
}

/// Which page to serve: non-numeric or missing means the first page,
/// anything out of range means the last one.
pub fn resolve_page(requested: Option<&str>, num_pages: u64) -> u64 {
    let num_pages = num_pages.max(1);
    match requested.map(|p| p.trim().parse::<i64>()) {
        None | Some(Err(_)) => 1,
        Some(Ok(n)) if n >= 1 && (n as u64) <= num_pages => n as u64,
        Some(Ok(_)) => num_pages,
    }
}

pub async fn fetch_page<'db, C, E>(
    db: &'db C,
    select: Select<E>,
    per_page: u64,
    requested: Option<&str>,
) -> Result<Page<E::Model>>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Send + Sync + 'db,
{
    let paginator = select.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let num_pages = total.div_ceil(per_page).max(1);
    let page = resolve_page(requested, num_pages);
    let items = paginator.fetch_page(page - 1).await?;

    Ok(Page {
        items,
        page,
        num_pages,
        total,
        has_previous: page > 1,
        has_next: page < num_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ActiveModelTrait, QueryOrder, Set};
    use tempfile::TempDir;

    use crate::db::entities::unit;
    use crate::db::test_database;

    #[test]
    fn test_resolve_page() {
        assert_eq!(resolve_page(None, 3), 1);
        assert_eq!(resolve_page(Some("abc"), 3), 1);
        assert_eq!(resolve_page(Some("2"), 3), 2);
        assert_eq!(resolve_page(Some(" 3 "), 3), 3);
        assert_eq!(resolve_page(Some("4"), 3), 3);
        assert_eq!(resolve_page(Some("0"), 3), 3);
        assert_eq!(resolve_page(Some("-1"), 3), 3);
        assert_eq!(resolve_page(Some("2"), 0), 1);
    }

    #[tokio::test]
    async fn test_fetch_page() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_database(temp_dir.path()).await;

        for name in ["a", "b", "c", "d", "e"] {
            unit::ActiveModel {
                name: Set(name.to_string()),
                name_key: Set(name.to_string()),
                ..Default::default()
            }
            .insert(&db)
            .await
            .unwrap();
        }

        let select = || unit::Entity::find().order_by_asc(unit::Column::NameKey);

        let page = fetch_page(&db, select(), 2, Some("2")).await.unwrap();
        assert_eq!(page.items.iter().map(|u| u.name.as_str()).collect::<Vec<_>>(), vec!["c", "d"]);
        assert_eq!((page.page, page.num_pages, page.total), (2, 3, 5));
        assert!(page.has_previous && page.has_next);

        let last = fetch_page(&db, select(), 2, Some("99")).await.unwrap();
        assert_eq!(last.page, 3);
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_next);
    }

    #[tokio::test]
    async fn test_empty_list_has_one_page() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_database(temp_dir.path()).await;

        let page = fetch_page(&db, unit::Entity::find(), 8, Some("5")).await.unwrap();
        assert_eq!((page.page, page.num_pages, page.total), (1, 1, 0));
        assert!(page.items.is_empty());
    }
}
