//! Typed configuration attached to a handle

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::Result;

type Entry = Arc<dyn Any + Send + Sync>;

/// Registry of configuration objects, one per type.
///
/// Entries are created from `Default` on first access. Clones share the same
/// entries; use [`ConfigRegistry::fork`] for an independent copy.
#[derive(Clone, Default)]
pub struct ConfigRegistry {
    entries: Arc<RwLock<HashMap<TypeId, Entry>>>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the configuration of type `T`, creating the default if absent
    pub fn get<T>(&self) -> Arc<T>
    where
        T: Any + Send + Sync + Default,
    {
        let key = TypeId::of::<T>();
        if let Some(entry) = self.entries.read().get(&key) {
            if let Ok(config) = entry.clone().downcast::<T>() {
                return config;
            }
        }

        let entry = self
            .entries
            .write()
            .entry(key)
            .or_insert_with(|| {
                tracing::debug!(config = std::any::type_name::<T>(), "creating default config");
                Arc::new(T::default()) as Entry
            })
            .clone();
        entry.downcast::<T>().unwrap_or_else(|_| Arc::new(T::default()))
    }

    /// Replace the configuration of type `T`
    pub fn set<T>(&self, config: T)
    where
        T: Any + Send + Sync,
    {
        self.entries
            .write()
            .insert(TypeId::of::<T>(), Arc::new(config) as Entry);
    }

    /// Modify a copy of the current `T` and store it back
    pub fn update<T>(&self, f: impl FnOnce(&mut T))
    where
        T: Any + Send + Sync + Default + Clone,
    {
        let mut config = (*self.get::<T>()).clone();
        f(&mut config);
        self.set(config);
    }

    /// Create an independent copy; later changes on either side are not shared
    pub fn fork(&self) -> Self {
        let entries = self.entries.read().clone();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }
}

impl std::fmt::Debug for ConfigRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigRegistry")
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

/// Defaults applied to every statement created from a handle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlStatements {
    /// Query timeout in seconds
    pub query_timeout_secs: Option<u64>,
    /// Template attributes available to every statement
    pub attributes: BTreeMap<String, String>,
}

impl SqlStatements {
    /// Parse statement settings from TOML
    ///
    /// ```
    /// use zqlz_core::SqlStatements;
    ///
    /// let settings = SqlStatements::from_toml_str(r#"
    ///     query_timeout_secs = 30
    ///     [attributes]
    ///     schema = "billing"
    /// "#).unwrap();
    ///
    /// assert_eq!(settings.query_timeout_secs, Some(30));
    /// assert_eq!(settings.attributes["schema"], "billing");
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_secs.map(Duration::from_secs)
    }

    pub fn with_query_timeout(mut self, secs: u64) -> Self {
        self.query_timeout_secs = Some(secs);
        self
    }

    pub fn define(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct FetchSize(usize);

    #[test]
    fn test_get_creates_default() {
        let config = ConfigRegistry::new();
        assert_eq!(*config.get::<FetchSize>(), FetchSize(0));
    }

    #[test]
    fn test_set_and_update() {
        let config = ConfigRegistry::new();
        config.set(FetchSize(10));
        config.update::<FetchSize>(|size| size.0 += 5);

        assert_eq!(*config.get::<FetchSize>(), FetchSize(15));
    }

    #[test]
    fn test_clones_share_entries() {
        let config = ConfigRegistry::new();
        let shared = config.clone();
        shared.set(FetchSize(3));

        assert_eq!(*config.get::<FetchSize>(), FetchSize(3));
    }

    #[test]
    fn test_fork_is_independent() {
        let config = ConfigRegistry::new();
        config.set(FetchSize(1));
        let forked = config.fork();
        forked.set(FetchSize(2));

        assert_eq!(*config.get::<FetchSize>(), FetchSize(1));
        assert_eq!(*forked.get::<FetchSize>(), FetchSize(2));
    }

    #[test]
    fn test_sql_statements_from_toml() {
        let settings = SqlStatements::from_toml_str(
            r#"
            query_timeout_secs = 5

            [attributes]
            schema = "accounts"
            "#,
        )
        .unwrap();

        assert_eq!(settings.query_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(
            settings.attributes.get("schema").map(String::as_str),
            Some("accounts")
        );
    }

    #[test]
    fn test_sql_statements_from_json_defaults() {
        let settings = SqlStatements::from_json_str("{}").unwrap();
        assert_eq!(settings, SqlStatements::default());
    }

    #[test]
    fn test_sql_statements_invalid_toml() {
        let err = SqlStatements::from_toml_str("query_timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, crate::ZqlzError::Toml(_)));
    }
}
