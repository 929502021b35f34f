//! Statement templating with MiniJinja
//!
//! Attributes defined on a statement are substituted into its SQL text
//! before execution, e.g. `CALL {{ schema }}.transfer(?, ?)`.

use minijinja::{Environment, UndefinedBehavior};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::Result;

static ENVIRONMENT: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_filter("sqlquote", |value: String| sqlquote(&value));
    env.add_filter("identifier", |value: String| identifier(&value));
    env
});

/// Quote a string literal for SQL
pub fn sqlquote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote an identifier (procedure, schema or column name)
pub fn identifier(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Whether the SQL text contains template syntax
pub fn is_template(sql: &str) -> bool {
    sql.contains("{{") || sql.contains("{%")
}

/// Render `sql` with the given attributes.
///
/// Plain SQL is returned as-is. Referencing an attribute that was never
/// defined is an error.
pub fn render_statement(sql: &str, attributes: &BTreeMap<String, String>) -> Result<String> {
    if !is_template(sql) {
        return Ok(sql.to_string());
    }

    let rendered = ENVIRONMENT.render_str(sql, attributes)?;
    tracing::debug!(template = %sql, sql = %rendered, "rendered statement template");
    Ok(rendered)
}
