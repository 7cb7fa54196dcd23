use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::fmt;

use crate::models::tenant::Tenant;
use crate::tenancy::error::StoreError;
use crate::tenancy::store::{ResourceTenants, TenantStore};
use crate::types::TenantId;

const SELECT_TENANT: &str = r#"
    SELECT id, name, active, parent_id, last_updated
    FROM tenant
    WHERE id = $1
"#;

const SELECT_CHILDREN: &str = r#"
    SELECT id FROM tenant WHERE parent_id = $1 ORDER BY id
"#;

// Both walks run one level past the depth limit so an overrun shows up as a row.
// `path` holds the ids visited so far; the row that revisits one is flagged and
// ends its branch.
const SELECT_ANCESTORS: &str = r#"
    WITH RECURSIVE chain AS (
        SELECT id, name, active, parent_id, last_updated, 0 AS depth,
               ARRAY[id] AS path, false AS cycle
        FROM tenant WHERE id = $1
      UNION ALL
        SELECT t.id, t.name, t.active, t.parent_id, t.last_updated, chain.depth + 1,
               chain.path || t.id, t.id = ANY(chain.path)
        FROM tenant t JOIN chain ON chain.parent_id = t.id
        WHERE chain.depth <= $2 AND NOT chain.cycle
    )
    SELECT id, name, active, parent_id, last_updated, depth, cycle FROM chain ORDER BY depth
"#;

const SELECT_SUBTREE: &str = r#"
    WITH RECURSIVE q AS (
        SELECT id, name, active, parent_id, last_updated, 0 AS depth,
               ARRAY[id] AS path, false AS cycle
        FROM tenant WHERE id = $1
      UNION ALL
        SELECT t.id, t.name, t.active, t.parent_id, t.last_updated, q.depth + 1,
               q.path || t.id, t.id = ANY(q.path)
        FROM tenant t JOIN q ON q.id = t.parent_id
        WHERE q.depth <= $2 AND NOT q.cycle
    )
    SELECT id, name, active, parent_id, last_updated, depth, cycle FROM q ORDER BY depth, id
"#;

/// One row of a recursive walk
#[derive(Debug, FromRow)]
struct WalkRow {
    #[sqlx(flatten)]
    tenant: Tenant,
    depth: i32,
    cycle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Ancestors,
    Descendants,
}

impl fmt::Display for Walk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Walk::Ancestors => f.write_str("ancestors"),
            Walk::Descendants => f.write_str("descendants"),
        }
    }
}

/// Apply the same corruption rules as the default trait walks: a revisited
/// tenant, a tenant deeper than `max_depth`, or an ancestor chain that stops
/// short of a root
fn finish_walk(
    id: TenantId,
    rows: Vec<WalkRow>,
    max_depth: u32,
    walk: Walk,
) -> Result<Vec<Tenant>, StoreError> {
    if let Some(row) = rows.iter().find(|row| row.cycle) {
        return Err(StoreError::Corrupt(format!(
            "cycle through tenant {} while walking {} of {}",
            row.tenant.id, walk, id
        )));
    }
    if rows.iter().any(|row| i64::from(row.depth) > i64::from(max_depth)) {
        return Err(StoreError::Corrupt(format!(
            "{} of tenant {} exceed depth {}",
            walk, id, max_depth
        )));
    }

    let tenants: Vec<Tenant> = rows.into_iter().map(|row| row.tenant).collect();
    if walk == Walk::Ancestors {
        if let Some(last) = tenants.last() {
            if let Some(parent) = last.parent_id {
                return Err(StoreError::Corrupt(format!(
                    "tenant {} references missing parent {}",
                    last.id, parent
                )));
            }
        }
    }
    Ok(tenants)
}

/// Tenant tree backed by the Traffic Ops `tenant` table
#[derive(Clone)]
pub struct PgTenantStore {
    pool: PgPool,
    max_depth: u32,
}

impl PgTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            max_depth: crate::config::config().tenancy.max_tree_depth,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn fetch_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        let tenant = sqlx::query_as::<_, Tenant>(SELECT_TENANT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    async fn fetch_children(&self, id: TenantId) -> Result<Vec<TenantId>, StoreError> {
        let rows: Vec<(TenantId,)> = sqlx::query_as(SELECT_CHILDREN)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    fn max_depth(&self) -> u32 {
        self.max_depth
    }

    async fn fetch_ancestors(&self, id: TenantId) -> Result<Vec<Tenant>, StoreError> {
        let rows = sqlx::query_as::<_, WalkRow>(SELECT_ANCESTORS)
            .bind(id)
            .bind(self.max_depth as i32)
            .fetch_all(&self.pool)
            .await?;
        finish_walk(id, rows, self.max_depth, Walk::Ancestors)
    }

    async fn fetch_subtree(&self, id: TenantId) -> Result<Vec<Tenant>, StoreError> {
        let rows = sqlx::query_as::<_, WalkRow>(SELECT_SUBTREE)
            .bind(id)
            .bind(self.max_depth as i32)
            .fetch_all(&self.pool)
            .await?;
        finish_walk(id, rows, self.max_depth, Walk::Descendants)
    }
}

/// Resource lookups against the Traffic Ops schema
#[derive(Clone)]
pub struct PgResourceTenants {
    pool: PgPool,
}

impl PgResourceTenants {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceTenants for PgResourceTenants {
    async fn delivery_service_tenant_by_xml_id(
        &self,
        xml_id: &str,
    ) -> Result<Option<Option<TenantId>>, StoreError> {
        let row: Option<(Option<TenantId>,)> =
            sqlx::query_as("SELECT tenant_id FROM deliveryservice WHERE xml_id = $1")
                .bind(xml_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(tenant_id,)| tenant_id))
    }

    async fn delivery_service_tenant_by_id(
        &self,
        id: i64,
    ) -> Result<Option<Option<TenantId>>, StoreError> {
        let row: Option<(Option<TenantId>,)> =
            sqlx::query_as("SELECT tenant_id FROM deliveryservice WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(tenant_id,)| tenant_id))
    }

    async fn user_tenant(&self, user_id: i64) -> Result<Option<Option<TenantId>>, StoreError> {
        let row: Option<(Option<TenantId>,)> =
            sqlx::query_as("SELECT tenant_id FROM tm_user WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(tenant_id,)| tenant_id))
    }
}
