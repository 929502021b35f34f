//! Connection trait and handles

use crate::{Call, ConfigRegistry, OutParameters, Result, SqlStatements};
use async_trait::async_trait;
use std::sync::Arc;

/// A database connection able to execute stored procedure calls
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "postgresql", "mysql", "mssql")
    fn driver_name(&self) -> &str;

    /// Execute a call statement and collect its output parameters
    ///
    /// The SQL text of `call` has already been rendered.
    async fn call(&self, call: &Call) -> Result<OutParameters>;
}

/// A live connection together with its configuration
#[derive(Clone)]
pub struct Handle {
    connection: Arc<dyn Connection>,
    config: ConfigRegistry,
}

impl Handle {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self::with_config(connection, ConfigRegistry::new())
    }

    pub fn with_config(connection: Arc<dyn Connection>, config: ConfigRegistry) -> Self {
        tracing::debug!(driver = connection.driver_name(), "opening handle");
        Self { connection, config }
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn config(&self) -> &ConfigRegistry {
        &self.config
    }

    /// Create a call statement carrying the configured [`SqlStatements`] defaults
    pub fn create_call(&self, sql: impl Into<String>) -> Call {
        let defaults = self.config.get::<SqlStatements>();
        let mut call = Call::new(Arc::clone(&self.connection), sql);
        for (key, value) in &defaults.attributes {
            call.define(key.as_str(), value.as_str());
        }
        if let Some(timeout) = defaults.query_timeout() {
            call.set_query_timeout(timeout);
        }
        tracing::debug!(sql = %call.sql(), "created call statement");
        call
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("driver", &self.connection.driver_name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParamKey, SqlType, Value, ZqlzError};
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Records each executed call and replies with fixed output parameters
    #[derive(Default)]
    struct StubConnection {
        reply: OutParameters,
        delay: Option<Duration>,
        executed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Connection for StubConnection {
        fn driver_name(&self) -> &str {
            "stub"
        }

        async fn call(&self, call: &Call) -> Result<OutParameters> {
            self.executed.lock().push(call.sql().to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_create_call_applies_defaults() {
        let handle = Handle::new(Arc::new(StubConnection::default()));
        handle
            .config()
            .set(SqlStatements::default().with_query_timeout(3).define("schema", "ops"));

        let call = handle.create_call("CALL {{ schema }}.cleanup()");

        assert_eq!(call.query_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(call.attributes().get("schema").map(String::as_str), Some("ops"));
    }

    #[tokio::test]
    async fn test_invoke_renders_and_executes_once() {
        let connection = Arc::new(StubConnection {
            reply: OutParameters::new().with(1, Some("total"), 9i64),
            ..Default::default()
        });
        let handle = Handle::new(connection.clone());

        let mut call = handle.create_call("CALL {{ schema }}.totals(?, ?)");
        call.define("schema", "sales")
            .bind(0, "EU")
            .register_out_parameter(1, SqlType::BigInt);
        let out = call.invoke().await.unwrap();

        assert_eq!(out.get_i64("total"), Some(9));
        assert_eq!(*connection.executed.lock(), vec!["CALL sales.totals(?, ?)"]);
    }

    #[tokio::test]
    async fn test_binding_and_registration() {
        let handle = Handle::new(Arc::new(StubConnection::default()));
        let mut call = handle.create_call("CALL open_account(:owner, ?)");
        call.bind_by_name("owner", "alice")
            .bind(1, 5i32)
            .register_out_parameter_by_name("id", SqlType::Integer)
            .register_out_parameter_by_name("id", SqlType::BigInt);

        assert_eq!(
            call.binding().get(&ParamKey::Name("owner".into())),
            Some(&Value::from("alice"))
        );
        assert_eq!(call.binding().get(&ParamKey::Position(1)), Some(&Value::Int32(5)));
        assert_eq!(call.out_parameters().len(), 1);
        assert_eq!(call.out_parameters()[0].sql_type, SqlType::BigInt);
    }

    #[tokio::test]
    async fn test_out_parameters_returned_as_reported() {
        let reply = OutParameters::new().with(0, Some("id"), 5i64);
        let connection = Arc::new(StubConnection {
            reply: reply.clone(),
            ..Default::default()
        });
        let handle = Handle::new(connection.clone());
        let mut call = handle.create_call("CALL next_id(?)");
        call.register_out_parameter_by_name("id", SqlType::Integer);

        let out = call.invoke().await.unwrap();
        assert_eq!(out, reply);
        assert_eq!(out.get("id"), Some(&Value::Int64(5)));
        assert_eq!(connection.executed.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_timeout() {
        let connection = Arc::new(StubConnection {
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        });
        let handle = Handle::new(connection);
        let mut call = handle.create_call("CALL slow()");
        call.set_query_timeout(Duration::from_secs(1));

        let err = call.invoke().await.unwrap_err();
        assert!(matches!(err, ZqlzError::Timeout(_)));
    }
}
