//! Call statements for stored procedure invocation

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::template::render_statement;
use crate::{Connection, OutParameters, Result, SqlType, Value, ZqlzError};

/// Key of a statement parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    /// 0-based parameter position
    Position(usize),
    /// Named parameter (`:name`)
    Name(String),
}

impl std::fmt::Display for ParamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKey::Position(position) => write!(f, "#{}", position),
            ParamKey::Name(name) => write!(f, ":{}", name),
        }
    }
}

/// Arguments bound to a statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binding {
    positional: BTreeMap<usize, Value>,
    named: BTreeMap<String, Value>,
}

impl Binding {
    pub fn bind(&mut self, position: usize, value: impl Into<Value>) {
        self.positional.insert(position, value.into());
    }

    pub fn bind_by_name(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.named.insert(name.into(), value.into());
    }

    pub fn get(&self, key: &ParamKey) -> Option<&Value> {
        match key {
            ParamKey::Position(position) => self.positional.get(position),
            ParamKey::Name(name) => self.named.get(name),
        }
    }

    pub fn positional(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.positional.iter().map(|(position, value)| (*position, value))
    }

    pub fn named(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.named.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// An output parameter registered on a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutParameterSpec {
    pub key: ParamKey,
    pub sql_type: SqlType,
}

/// A stored procedure call, ready to be customized and executed.
///
/// Customization happens through `&mut Call`; only the owner can
/// [`invoke`](Call::invoke) it, which consumes the statement.
pub struct Call {
    sql: String,
    binding: Binding,
    out_parameters: Vec<OutParameterSpec>,
    attributes: BTreeMap<String, String>,
    query_timeout: Option<Duration>,
    connection: Arc<dyn Connection>,
}

impl Call {
    pub fn new(connection: Arc<dyn Connection>, sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binding: Binding::default(),
            out_parameters: Vec::new(),
            attributes: BTreeMap::new(),
            query_timeout: None,
            connection,
        }
    }

    /// SQL text; rendered with the defined attributes once invoked
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn out_parameters(&self) -> &[OutParameterSpec] {
        &self.out_parameters
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    /// Bind a positional argument (0-based)
    pub fn bind(&mut self, position: usize, value: impl Into<Value>) -> &mut Self {
        self.binding.bind(position, value);
        self
    }

    /// Bind a named argument
    pub fn bind_by_name(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.binding.bind_by_name(name, value);
        self
    }

    /// Register a positional output parameter
    pub fn register_out_parameter(&mut self, position: usize, sql_type: SqlType) -> &mut Self {
        self.push_out_parameter(ParamKey::Position(position), sql_type)
    }

    /// Register a named output parameter
    pub fn register_out_parameter_by_name(
        &mut self,
        name: impl Into<String>,
        sql_type: SqlType,
    ) -> &mut Self {
        self.push_out_parameter(ParamKey::Name(name.into()), sql_type)
    }

    fn push_out_parameter(&mut self, key: ParamKey, sql_type: SqlType) -> &mut Self {
        self.out_parameters.retain(|spec| spec.key != key);
        self.out_parameters.push(OutParameterSpec { key, sql_type });
        self
    }

    /// Define a template attribute
    pub fn define(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn set_query_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Execute the call once and return its output parameters as the
    /// connection reported them.
    pub async fn invoke(mut self) -> Result<OutParameters> {
        self.sql = render_statement(&self.sql, &self.attributes)?;
        let connection = Arc::clone(&self.connection);

        tracing::debug!(
            driver = connection.driver_name(),
            sql = %self.sql,
            out_parameters = self.out_parameters.len(),
            "invoking call statement"
        );

        let out = match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, connection.call(&self))
                .await
                .map_err(|_| {
                    ZqlzError::Timeout(format!("call did not complete within {:?}", limit))
                })??,
            None => connection.call(&self).await?,
        };

        tracing::debug!(values = out.len(), "call statement completed");
        Ok(out)
    }
}

impl std::fmt::Debug for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call")
            .field("sql", &self.sql)
            .field("binding", &self.binding)
            .field("out_parameters", &self.out_parameters)
            .field("attributes", &self.attributes)
            .field("query_timeout", &self.query_timeout)
            .field("driver", &self.connection.driver_name())
            .finish()
    }
}
