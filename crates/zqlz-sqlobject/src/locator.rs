//! Locating the SQL text of a SQL object method

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use zqlz_core::{ConfigRegistry, Result, ZqlzError};

use crate::method::MethodDescriptor;
use crate::reflect::TypeDecl;

/// Resolves the SQL text for a method of a SQL object type.
///
/// Called on every invocation; implementations must return the same text
/// for the same method under an unchanged configuration.
pub trait SqlLocator: Send + Sync + std::fmt::Debug {
    fn locate(
        &self,
        sql_object_type: &TypeDecl,
        method: &MethodDescriptor,
        config: &ConfigRegistry,
    ) -> Result<String>;
}

/// Name used to look up a method's SQL: the annotation value, or the method
/// name when the value is empty.
fn sql_name(method: &MethodDescriptor) -> &str {
    match method.sql_call_value() {
        Some(value) if !value.trim().is_empty() => value,
        _ => method.name(),
    }
}

/// Takes the SQL text straight from the method annotation
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotationSqlLocator;

impl SqlLocator for AnnotationSqlLocator {
    fn locate(
        &self,
        _sql_object_type: &TypeDecl,
        method: &MethodDescriptor,
        _config: &ConfigRegistry,
    ) -> Result<String> {
        Ok(sql_name(method).to_string())
    }
}

/// Reads SQL from `<root>/<TypeName>/<name>.sql`.
///
/// `name` is the annotation value, or the method name when the value is
/// empty. Files are read on every lookup.
#[derive(Debug, Clone)]
pub struct DirectorySqlLocator {
    root: PathBuf,
}

impl DirectorySqlLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, sql_object_type: &TypeDecl, method: &MethodDescriptor) -> Result<PathBuf> {
        let directory = path_segment(sql_object_type.name(), method)?;
        let file = path_segment(sql_name(method), method)?;
        Ok(self.root.join(directory).join(format!("{}.sql", file)))
    }
}

/// `value` as a single file name below the root; separators, `..` and
/// absolute paths are rejected.
fn path_segment<'a>(value: &'a str, method: &MethodDescriptor) -> Result<&'a str> {
    let mut components = Path::new(value).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single || value.contains(['/', '\\']) {
        return Err(ZqlzError::Configuration(format!(
            "'{}' of {} is not a valid sql file name",
            value, method
        )));
    }
    Ok(value)
}

impl SqlLocator for DirectorySqlLocator {
    fn locate(
        &self,
        sql_object_type: &TypeDecl,
        method: &MethodDescriptor,
        _config: &ConfigRegistry,
    ) -> Result<String> {
        let path = self.path_for(sql_object_type, method)?;
        tracing::debug!(path = %path.display(), method = %method, "reading sql file");

        let sql = match std::fs::read_to_string(&path) {
            Ok(sql) => sql,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ZqlzError::NotFound(format!(
                    "sql for {} ({})",
                    method,
                    path.display()
                )));
            }
            Err(err) => return Err(err.into()),
        };

        let sql = sql.trim();
        if sql.is_empty() {
            return Err(ZqlzError::NotFound(format!(
                "sql file {} is empty",
                path.display()
            )));
        }
        Ok(sql.to_string())
    }
}

/// SQL object configuration
#[derive(Debug, Clone)]
pub struct SqlObjects {
    locator: Arc<dyn SqlLocator>,
}

impl SqlObjects {
    pub fn locator(&self) -> &Arc<dyn SqlLocator> {
        &self.locator
    }

    pub fn with_locator(mut self, locator: impl SqlLocator + 'static) -> Self {
        self.locator = Arc::new(locator);
        self
    }
}

impl Default for SqlObjects {
    fn default() -> Self {
        Self {
            locator: Arc::new(AnnotationSqlLocator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodAnnotation;

    fn dao() -> TypeDecl {
        TypeDecl::new("AccountDao")
    }

    #[test]
    fn test_annotation_value() {
        let method = MethodDescriptor::new("transfer", &dao())
            .annotate(MethodAnnotation::sql_call("CALL transfer(?, ?, ?)"));

        let sql = AnnotationSqlLocator
            .locate(&dao(), &method, &ConfigRegistry::new())
            .unwrap();
        assert_eq!(sql, "CALL transfer(?, ?, ?)");
    }

    #[test]
    fn test_empty_annotation_uses_method_name() {
        let method =
            MethodDescriptor::new("close_month", &dao()).annotate(MethodAnnotation::sql_call(""));

        let sql = AnnotationSqlLocator
            .locate(&dao(), &method, &ConfigRegistry::new())
            .unwrap();
        assert_eq!(sql, "close_month");
    }

    #[test]
    fn test_directory_locator_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("AccountDao")).unwrap();
        std::fs::write(
            dir.path().join("AccountDao").join("close_month.sql"),
            "CALL close_month(:month)\n",
        )
        .unwrap();

        let locator = DirectorySqlLocator::new(dir.path());
        let method =
            MethodDescriptor::new("close_month", &dao()).annotate(MethodAnnotation::sql_call(""));

        let sql = locator.locate(&dao(), &method, &ConfigRegistry::new()).unwrap();
        assert_eq!(sql, "CALL close_month(:month)");
    }

    #[test]
    fn test_directory_locator_uses_annotation_as_file_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("AccountDao")).unwrap();
        std::fs::write(
            dir.path().join("AccountDao").join("monthly.sql"),
            "CALL monthly()",
        )
        .unwrap();

        let locator = DirectorySqlLocator::new(dir.path());
        let method = MethodDescriptor::new("close_month", &dao())
            .annotate(MethodAnnotation::sql_call("monthly"));

        let sql = locator.locate(&dao(), &method, &ConfigRegistry::new()).unwrap();
        assert_eq!(sql, "CALL monthly()");
    }

    #[test]
    fn test_directory_locator_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let locator = DirectorySqlLocator::new(dir.path());
        let method = MethodDescriptor::new("missing", &dao());

        let err = locator
            .locate(&dao(), &method, &ConfigRegistry::new())
            .unwrap_err();
        assert!(matches!(err, ZqlzError::NotFound(_)));
    }

    #[test]
    fn test_directory_locator_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("AccountDao")).unwrap();
        std::fs::write(dir.path().join("AccountDao").join("blank.sql"), "  \n").unwrap();

        let locator = DirectorySqlLocator::new(dir.path());
        let method = MethodDescriptor::new("blank", &dao());

        let err = locator
            .locate(&dao(), &method, &ConfigRegistry::new())
            .unwrap_err();
        assert!(matches!(err, ZqlzError::NotFound(_)));
    }

    #[test]
    fn test_directory_locator_stays_below_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sql");
        std::fs::create_dir_all(root.join("AccountDao")).unwrap();
        std::fs::write(dir.path().join("secret.sql"), "CALL leak()").unwrap();

        let locator = DirectorySqlLocator::new(&root);
        let outside = dir.path().join("secret");
        for name in ["../../secret", "nested/file", "..", outside.to_str().unwrap()] {
            let method = MethodDescriptor::new("close_month", &dao())
                .annotate(MethodAnnotation::sql_call(name));
            let err = locator
                .locate(&dao(), &method, &ConfigRegistry::new())
                .unwrap_err();
            assert!(matches!(err, ZqlzError::Configuration(_)), "{name}: {err:?}");
        }
    }

    #[test]
    fn test_default_config_uses_annotation_locator() {
        let config = ConfigRegistry::new();
        let objects = config.get::<SqlObjects>();
        assert!(format!("{:?}", objects.locator()).contains("AnnotationSqlLocator"));
    }
}
