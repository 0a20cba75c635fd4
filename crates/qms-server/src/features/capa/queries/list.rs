//! List CAPAs query

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::features::capa::models::{Capa, CapaStatus, CAPA_COLUMNS};

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 1000;

/// Offset-paged CAPA listing, newest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListCapasQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<CapaStatus>,
    pub assignee_id: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListCapasError {
    #[error("skip must be >= 0")]
    InvalidSkip,
    #[error("limit must be between 1 and {}", MAX_LIST_LIMIT)]
    InvalidLimit,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListCapasResponse {
    pub items: Vec<Capa>,
    pub skip: i64,
    pub limit: i64,
}

impl ListCapasQuery {
    /// Resolved `(skip, limit)`
    pub fn page(&self) -> Result<(i64, i64), ListCapasError> {
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if skip < 0 {
            return Err(ListCapasError::InvalidSkip);
        }
        if !(1..=MAX_LIST_LIMIT).contains(&limit) {
            return Err(ListCapasError::InvalidLimit);
        }
        Ok((skip, limit))
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: &PgPool, query: ListCapasQuery) -> Result<ListCapasResponse, ListCapasError> {
    let (skip, limit) = query.page()?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {} FROM capas WHERE TRUE", CAPA_COLUMNS));

    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(assignee_id) = query.assignee_id {
        builder.push(" AND assignee_id = ").push_bind(assignee_id);
    }

    builder
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(skip);

    let items = builder.build_query_as::<Capa>().fetch_all(pool).await?;

    tracing::debug!(count = items.len(), "Listed CAPAs");

    Ok(ListCapasResponse { items, skip, limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_bounds() {
        assert_eq!(ListCapasQuery::default().page().unwrap(), (0, DEFAULT_LIST_LIMIT));

        let zero = ListCapasQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert!(matches!(zero.page(), Err(ListCapasError::InvalidLimit)));

        let negative = ListCapasQuery {
            skip: Some(-3),
            ..Default::default()
        };
        assert!(matches!(negative.page(), Err(ListCapasError::InvalidSkip)));
    }
}
