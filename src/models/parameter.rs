use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::config::config;
use crate::convert::{ConversionError, Downgrade, Upgrade};

/// Parameter as served before API 4.0, also the row type of the `parameter` table.
///
/// `profiles` comes from an aggregate over `profile_parameter` and is absent when
/// the row is read without that join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ParameterNullable {
    pub config_file: Option<String>,
    pub id: Option<i64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub name: Option<String>,
    #[sqlx(default)]
    pub profiles: Option<Vec<String>>,
    pub secure: Option<bool>,
    pub value: Option<String>,
}

/// Parameter as served by API 4.0 and later
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub config_file: String,
    pub id: i64,
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
    pub name: String,
    pub profiles: Option<Vec<String>>,
    pub secure: bool,
    pub value: String,
}

impl ParameterNullable {
    pub fn is_secure(&self) -> bool {
        self.secure.unwrap_or(false)
    }

    /// The parameter as a user with `priv_level` may see it: secure values are
    /// replaced for anyone below admin
    pub fn masked_for(&self, priv_level: i32) -> Self {
        let security = &config().security;
        let mut visible = self.clone();
        if self.is_secure() && priv_level < security.admin_priv_level {
            visible.value = Some(security.hidden_value.clone());
        }
        visible
    }

    /// Creates and updates store an empty string rather than a NULL value
    pub fn with_default_value(mut self) -> Self {
        if self.value.is_none() {
            self.value = Some(String::new());
        }
        self
    }
}

impl Parameter {
    pub fn masked_for(&self, priv_level: i32) -> Self {
        let security = &config().security;
        let mut visible = self.clone();
        if self.secure && priv_level < security.admin_priv_level {
            visible.value = security.hidden_value.clone();
        }
        visible
    }
}

impl Upgrade for ParameterNullable {
    type Current = Parameter;

    fn upgrade(&self) -> Result<Parameter, ConversionError> {
        Ok(Parameter {
            config_file: self.config_file.clone().unwrap_or_default(),
            id: self.id.unwrap_or_default(),
            last_updated: self.last_updated.unwrap_or_default(),
            name: self.name.clone().unwrap_or_default(),
            profiles: self.profiles.clone(),
            secure: self.secure.unwrap_or_default(),
            value: self.value.clone().unwrap_or_default(),
        })
    }
}

impl Downgrade for Parameter {
    type Legacy = ParameterNullable;

    fn downgrade(&self) -> Result<ParameterNullable, ConversionError> {
        Ok(ParameterNullable {
            config_file: Some(self.config_file.clone()),
            id: Some(self.id),
            last_updated: Some(self.last_updated),
            name: Some(self.name.clone()),
            profiles: self.profiles.clone(),
            secure: Some(self.secure),
            value: Some(self.value.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::priv_level;

    fn secret() -> ParameterNullable {
        ParameterNullable {
            config_file: Some("records.config".into()),
            id: Some(12),
            name: Some("api_key".into()),
            secure: Some(true),
            value: Some("s3cr3t".into()),
            ..Default::default()
        }
    }

    #[test]
    fn masks_secure_values_below_admin() {
        let hidden = &config().security.hidden_value;
        assert_eq!(secret().masked_for(priv_level::OPERATIONS).value.as_ref(), Some(hidden));
        assert_eq!(secret().masked_for(priv_level::ADMIN).value.as_deref(), Some("s3cr3t"));

        let plain = ParameterNullable {
            secure: Some(false),
            ..secret()
        };
        assert_eq!(plain.masked_for(priv_level::READ_ONLY).value.as_deref(), Some("s3cr3t"));
    }

    #[test]
    fn masking_applies_to_current_shape() {
        let current = secret().upgrade().unwrap();
        assert_eq!(current.masked_for(priv_level::READ_ONLY).value, config().security.hidden_value);
        assert_eq!(current.value, "s3cr3t");
    }

    #[test]
    fn absent_value_defaults_to_empty() {
        let param = ParameterNullable {
            value: None,
            ..secret()
        };
        assert_eq!(param.with_default_value().value.as_deref(), Some(""));
        assert_eq!(secret().with_default_value().value.as_deref(), Some("s3cr3t"));
    }

    #[test]
    fn profiles_keep_null_versus_empty() {
        let mut current = secret().upgrade().unwrap();
        assert_eq!(current.downgrade().unwrap().profiles, None);
        current.profiles = Some(vec![]);
        assert_eq!(current.downgrade().unwrap().profiles, Some(vec![]));
    }
}
