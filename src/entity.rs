use serde_json::{json, Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ErrorKind;
use crate::models::{ParameterNullable, Role, TenantNullable};

/// Field-level validation failures, keyed by JSON field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<&'static str, String> {
        &self.0
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::User
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn require_text(&mut self, field: &'static str, value: &Option<String>) {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            self.add(field, "cannot be blank");
        }
    }

    fn require<T>(&mut self, field: &'static str, value: &Option<T>) {
        if value.is_none() {
            self.add(field, "is required");
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(|(k, v)| format!("{} {}", k, v)).collect();
        f.write_str(&joined.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// What a generic CRUD layer needs to know about a stored entity
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    /// Name used in logs and change-log entries
    const TYPE_NAME: &'static str;

    /// Base `SELECT` without a `WHERE` clause
    const SELECT: &'static str;

    /// Columns identifying one row
    fn key_fields() -> &'static [&'static str];

    /// Values of the key fields, or `None` while the entity has not been stored
    fn keys(&self) -> Option<Map<String, Value>>;

    /// Human-readable identity for change-log messages
    fn audit_name(&self) -> String;

    fn validate(&self) -> Result<(), ValidationErrors>;

    /// Column values for an insert or update
    fn to_row(&self) -> Map<String, Value>;
}

/// Load one entity by its `id` column
pub async fn fetch_by_id<E: Entity>(pool: &PgPool, id: i64) -> Result<Option<E>, sqlx::Error> {
    let query = format!("SELECT * FROM ({}) AS entity WHERE entity.id = $1", E::SELECT);
    sqlx::query_as::<_, E>(&query).bind(id).fetch_optional(pool).await
}

fn row(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Map<String, Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn id_keys(id: Option<i64>) -> Option<Map<String, Value>> {
    id.map(|id| row([("id", json!(id))]))
}

fn audit_name(name: &Option<String>, id: Option<i64>, fallback: &str) -> String {
    name.clone()
        .or_else(|| id.map(|id| id.to_string()))
        .unwrap_or_else(|| fallback.to_string())
}

impl Entity for Role {
    const TYPE_NAME: &'static str = "role";
    const SELECT: &'static str = "SELECT id, name, description, priv_level, \
        ARRAY(SELECT rc.cap_name FROM role_capability AS rc WHERE rc.role_id = role.id) AS capabilities \
        FROM role";

    fn key_fields() -> &'static [&'static str] {
        &["id"]
    }

    fn keys(&self) -> Option<Map<String, Value>> {
        id_keys(self.id)
    }

    fn audit_name(&self) -> String {
        audit_name(&self.name, self.id, "0")
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        errs.require_text("name", &self.name);
        errs.require_text("description", &self.description);
        errs.require("privLevel", &self.priv_level);
        errs.into_result()
    }

    fn to_row(&self) -> Map<String, Value> {
        row([
            ("id", json!(self.id)),
            ("name", json!(self.name)),
            ("description", json!(self.description)),
            ("priv_level", json!(self.priv_level)),
        ])
    }
}

impl Entity for ParameterNullable {
    const TYPE_NAME: &'static str = "param";
    const SELECT: &'static str = "SELECT p.config_file, p.id, p.last_updated, p.name, p.value, p.secure, \
        ARRAY(SELECT pr.name FROM profile_parameter pp JOIN profile pr ON pp.profile = pr.id \
        WHERE pp.parameter = p.id) AS profiles \
        FROM parameter p";

    fn key_fields() -> &'static [&'static str] {
        &["id"]
    }

    fn keys(&self) -> Option<Map<String, Value>> {
        id_keys(self.id)
    }

    fn audit_name(&self) -> String {
        audit_name(&self.name, self.id, "unknown")
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        errs.require_text("name", &self.name);
        errs.require_text("configFile", &self.config_file);
        errs.into_result()
    }

    fn to_row(&self) -> Map<String, Value> {
        row([
            ("id", json!(self.id)),
            ("name", json!(self.name)),
            ("config_file", json!(self.config_file)),
            ("value", json!(self.value)),
            ("secure", json!(self.secure)),
        ])
    }
}

impl Entity for TenantNullable {
    const TYPE_NAME: &'static str = "tenant";
    const SELECT: &'static str = "SELECT t.id, t.name, t.active, t.parent_id, p.name AS parent_name, t.last_updated \
        FROM tenant t LEFT JOIN tenant p ON t.parent_id = p.id";

    fn key_fields() -> &'static [&'static str] {
        &["id"]
    }

    fn keys(&self) -> Option<Map<String, Value>> {
        id_keys(self.id)
    }

    fn audit_name(&self) -> String {
        audit_name(&self.name, self.id, "unknown")
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        errs.require_text("name", &self.name);
        errs.require("active", &self.active);
        if matches!(self.parent_id, Some(parent) if parent < 1) {
            errs.add("parentId", "must be no less than 1");
        }
        errs.into_result()
    }

    fn to_row(&self) -> Map<String, Value> {
        row([
            ("id", json!(self.id)),
            ("name", json!(self.name)),
            ("active", json!(self.active)),
            ("parent_id", json!(self.parent_id)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_requires_name_description_and_level() {
        let err = Role::default().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "description cannot be blank, name cannot be blank, privLevel is required"
        );

        let role = Role {
            name: Some("ops".into()),
            description: Some("operators".into()),
            priv_level: Some(20),
            ..Default::default()
        };
        assert!(role.validate().is_ok());
        assert_eq!(role.keys(), None);
        assert_eq!(role.audit_name(), "ops");
    }

    #[test]
    fn parameter_requires_name_and_config_file() {
        let param = ParameterNullable {
            name: Some("  ".into()),
            ..Default::default()
        };
        let err = param.validate().unwrap_err();
        assert_eq!(err.fields().keys().copied().collect::<Vec<_>>(), vec!["configFile", "name"]);
        assert_eq!(param.audit_name(), "  ");
        assert_eq!(ParameterNullable::default().audit_name(), "unknown");
    }

    #[test]
    fn tenant_parent_must_be_positive() {
        let mut tenant = TenantNullable {
            name: Some("east".into()),
            active: Some(true),
            parent_id: Some(0),
            ..Default::default()
        };
        assert!(tenant.validate().unwrap_err().fields().contains_key("parentId"));
        tenant.parent_id = Some(1);
        assert!(tenant.validate().is_ok());
    }

    #[test]
    fn rows_use_column_names() {
        let tenant = TenantNullable {
            id: Some(5),
            name: Some("east".into()),
            parent_id: Some(1),
            ..Default::default()
        };
        let row = tenant.to_row();
        assert_eq!(row["parent_id"], json!(1));
        assert_eq!(row["active"], Value::Null);
        assert_eq!(tenant.keys().unwrap()["id"], json!(5));
        assert_eq!(TenantNullable::key_fields(), &["id"]);
    }
}
