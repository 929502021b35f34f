//! SQL object assembly and dispatch

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use zqlz_core::{Handle, Result, Value, ZqlzError};

use crate::handler::{Handler, HandlerFactory, ReturnValue};
use crate::method::{MethodAnnotation, MethodDescriptor};
use crate::reflect::TypeDecl;
use crate::sql_call::SqlCallFactory;

static SQL_CALL_FACTORY: LazyLock<Arc<dyn HandlerFactory>> =
    LazyLock::new(|| Arc::new(SqlCallFactory));

/// Factory responsible for the SQL method annotation on `method`
fn handler_factory_for(method: &MethodDescriptor) -> Result<Arc<dyn HandlerFactory>> {
    let mut sql_methods = method
        .annotations()
        .iter()
        .filter(|annotation| annotation.is_sql_method());

    let factory = match sql_methods.next() {
        Some(MethodAnnotation::SqlCall { .. }) => Arc::clone(&SQL_CALL_FACTORY),
        _ => {
            return Err(ZqlzError::Configuration(format!(
                "method {} has no SQL method annotation",
                method
            )));
        }
    };

    if sql_methods.next().is_some() {
        return Err(ZqlzError::Configuration(format!(
            "method {} has more than one SQL method annotation",
            method
        )));
    }
    Ok(factory)
}

/// A SQL object interface and the methods it exposes
#[derive(Debug, Clone, PartialEq)]
pub struct SqlObjectDefinition {
    sql_object_type: Arc<TypeDecl>,
    methods: Vec<MethodDescriptor>,
}

impl SqlObjectDefinition {
    pub fn new(sql_object_type: Arc<TypeDecl>) -> Self {
        Self {
            sql_object_type,
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn sql_object_type(&self) -> &Arc<TypeDecl> {
        &self.sql_object_type
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }
}

/// Handlers of every method of a SQL object type, keyed by method name
#[derive(Debug)]
pub struct HandlerTable {
    definition: SqlObjectDefinition,
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerTable {
    /// Build a handler for each method. The first invalid method aborts
    /// the whole table.
    pub fn build(definition: &SqlObjectDefinition) -> Result<Self> {
        let sql_object_type = Arc::clone(definition.sql_object_type());
        let mut handlers: HashMap<String, Arc<dyn Handler>> = HashMap::new();

        for method in definition.methods() {
            if handlers.contains_key(method.name()) {
                return Err(ZqlzError::Configuration(format!(
                    "{} declares method '{}' more than once",
                    sql_object_type.name(),
                    method.name()
                )));
            }
            let factory = handler_factory_for(method)?;
            let handler = factory.build_handler(&sql_object_type, method)?;
            handlers.insert(method.name().to_string(), handler);
        }

        tracing::info!(
            sql_object = sql_object_type.name(),
            methods = handlers.len(),
            "assembled sql object handlers"
        );
        Ok(Self {
            definition: definition.clone(),
            handlers,
        })
    }

    pub fn sql_object_type(&self) -> &Arc<TypeDecl> {
        self.definition.sql_object_type()
    }

    /// The definition this table was assembled from
    pub fn definition(&self) -> &SqlObjectDefinition {
        &self.definition
    }

    pub fn get(&self, method: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(method)
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Creates SQL objects, assembling each type's handlers only once
#[derive(Debug, Default)]
pub struct SqlObjectFactory {
    tables: RwLock<HashMap<String, Arc<HandlerTable>>>,
}

impl SqlObjectFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler table for the definition's type, built on first request.
    ///
    /// A type name can only be assembled from one definition; asking again
    /// with a different definition under the same name is a configuration
    /// error.
    pub fn handler_table(&self, definition: &SqlObjectDefinition) -> Result<Arc<HandlerTable>> {
        let name = definition.sql_object_type().name();
        if let Some(table) = self.tables.read().get(name) {
            return Self::cached(table, definition);
        }

        let table = Arc::new(HandlerTable::build(definition)?);
        let mut tables = self.tables.write();
        let table = tables.entry(name.to_string()).or_insert(table);
        Self::cached(table, definition)
    }

    fn cached(
        table: &Arc<HandlerTable>,
        definition: &SqlObjectDefinition,
    ) -> Result<Arc<HandlerTable>> {
        if table.definition() != definition {
            tracing::warn!(
                sql_object = definition.sql_object_type().name(),
                "conflicting definition for assembled sql object type"
            );
            return Err(ZqlzError::Configuration(format!(
                "{} is already assembled from a different definition",
                definition.sql_object_type().name()
            )));
        }
        Ok(Arc::clone(table))
    }

    /// Attach a SQL object of the definition's type to `handle`
    pub fn attach(&self, definition: &SqlObjectDefinition, handle: Handle) -> Result<SqlObject> {
        let table = self.handler_table(definition)?;
        Ok(SqlObject { table, handle })
    }
}

/// A SQL object attached to a handle
#[derive(Debug, Clone)]
pub struct SqlObject {
    table: Arc<HandlerTable>,
    handle: Handle,
}

impl SqlObject {
    pub fn sql_object_type(&self) -> &TypeDecl {
        self.table.sql_object_type()
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Invoke `method` with `args`
    pub async fn invoke(&self, method: &str, args: &[Value]) -> Result<ReturnValue> {
        let handler = self.table.get(method).ok_or_else(|| {
            tracing::warn!(
                sql_object = self.sql_object_type().name(),
                method,
                "no handler for method"
            );
            ZqlzError::NotFound(format!(
                "method '{}' on {}",
                method,
                self.sql_object_type().name()
            ))
        })?;

        tracing::debug!(
            sql_object = self.sql_object_type().name(),
            method,
            "invoking sql object method"
        );
        handler.invoke(self, args, &self.handle).await
    }
}
