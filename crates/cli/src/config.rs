//! Configuration loading from entity_access.toml.

use access::{EntityAccessHandler, PermissionTable};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Entity type the handler is built for.
    #[serde(default)]
    pub entity_type: Option<EntityTypeConfig>,

    /// Role and account grants.
    #[serde(flatten)]
    pub permissions: PermissionTable,
}

/// Entity type definition.
#[derive(Debug, Deserialize)]
pub struct EntityTypeConfig {
    /// Entity type identifier, e.g. "node".
    pub id: String,

    /// Permission that grants every operation on the type.
    pub admin_permission: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Build the access handler for `entity_type`, or for the configured
    /// entity type when none is given.
    pub fn handler(self, entity_type: Option<&str>) -> Result<EntityAccessHandler, ConfigError> {
        let (id, admin_permission) = match (entity_type, self.entity_type) {
            (Some(id), Some(configured)) if configured.id == id => {
                (configured.id, configured.admin_permission)
            }
            (Some(id), _) => (id.to_string(), None),
            (None, Some(configured)) => (configured.id, configured.admin_permission),
            (None, None) => return Err(ConfigError::MissingEntityType),
        };

        let mut builder = EntityAccessHandler::builder(id, Arc::new(self.permissions));
        if let Some(permission) = admin_permission {
            builder = builder.admin_permission(permission);
        }
        Ok(builder.build())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("entity type not configured: pass --entity-type or set [entity_type] id")]
    MissingEntityType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use access::{Account, EntitySnapshot};

    const CONFIG: &str = r#"
[entity_type]
id = "node"
admin_permission = "administer nodes"

[roles]
authenticated = ["view any article node"]
administrator = ["administer nodes"]
writer = ["update own article node"]

[accounts.3]
roles = ["writer"]
"#;

    #[test]
    fn test_parse_config() {
        let config = Config::parse(CONFIG).unwrap();
        let entity_type = config.entity_type.as_ref().unwrap();
        assert_eq!(entity_type.id, "node");
        assert_eq!(entity_type.admin_permission.as_deref(), Some("administer nodes"));
        assert!(config.permissions.roles.contains_key("authenticated"));
        assert!(config.permissions.accounts.contains_key("3"));
    }

    #[test]
    fn test_handler_from_config() {
        let handler = Config::parse(CONFIG).unwrap().handler(None).unwrap();
        assert_eq!(handler.entity_type_id(), "node");

        let entity = EntitySnapshot::new("node", Some("article")).with_id("1").with_owner(3);
        assert!(handler.check_access(&entity, "update", &Account::new(3)).unwrap().is_allowed());
        assert!(handler.check_access(&entity, "update", &Account::new(4)).unwrap().is_neutral());

        let admin = Account::new(1).with_roles(["administrator"]);
        assert!(handler.check_access(&entity, "delete", &admin).unwrap().is_allowed());
    }

    #[test]
    fn test_other_entity_type_skips_admin_permission() {
        let handler = Config::parse(CONFIG).unwrap().handler(Some("comment")).unwrap();
        assert_eq!(handler.entity_type_id(), "comment");

        let entity = EntitySnapshot::new("comment", None).with_id("1");
        let admin = Account::new(1).with_roles(["administrator"]);
        assert!(handler.check_access(&entity, "delete", &admin).unwrap().is_neutral());
    }

    #[test]
    fn test_missing_entity_type() {
        let Err(err) = Config::default().handler(None) else {
            panic!("expected missing entity type");
        };
        assert!(matches!(err, ConfigError::MissingEntityType));
    }
}
