//! Stored procedure calls for SQL object methods
//!
//! A method annotated with `SqlCall` is executed as a call statement. Its
//! return type decides what the caller gets back and is checked once, when
//! the handler is built:
//!
//! - `()` - the output parameters are discarded
//! - `OutParameters` (or a subtype) - the output parameters are returned
//!
//! Any other return type is rejected with a configuration error.

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use zqlz_core::{Result, Value, ZqlzError};

use crate::customizer::{StatementCustomizer, StatementCustomizers};
use crate::handler::{HandleSupplier, Handler, HandlerFactory, ReturnValue};
use crate::locator::SqlObjects;
use crate::method::MethodDescriptor;
use crate::reflect::{ErasedType, OUT_PARAMETERS_TYPE, TypeDecl, erase, resolve_type};

/// How the result of a call maps to the method's return value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnClassification {
    /// Nothing is returned
    Void,
    /// The output parameters are returned
    OutParameters,
}

impl ReturnClassification {
    /// Classify the return type of `method` as seen from `sql_object_type`
    pub fn classify(sql_object_type: &TypeDecl, method: &MethodDescriptor) -> Result<Self> {
        let resolved = resolve_type(method.return_type(), sql_object_type, method.declaring_type());
        match erase(&resolved) {
            ErasedType::Unit => Ok(ReturnClassification::Void),
            erased if erased.is_assignable_to(OUT_PARAMETERS_TYPE) => {
                Ok(ReturnClassification::OutParameters)
            }
            erased => Err(ZqlzError::Configuration(format!(
                "SqlCall method {} returns {}; only () or {} are supported",
                method, erased, OUT_PARAMETERS_TYPE
            ))),
        }
    }
}

/// Builds [`CallHandler`]s. Stateless; one instance serves every SQL object type.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlCallFactory;

impl HandlerFactory for SqlCallFactory {
    fn build_handler(
        &self,
        sql_object_type: &Arc<TypeDecl>,
        method: &MethodDescriptor,
    ) -> Result<Arc<dyn Handler>> {
        let handler = CallHandler::new(Arc::clone(sql_object_type), method.clone())?;
        Ok(Arc::new(handler))
    }
}

/// Executes a stored procedure call for one method
#[derive(Debug)]
pub struct CallHandler {
    sql_object_type: Arc<TypeDecl>,
    method: MethodDescriptor,
    customizer: Arc<dyn StatementCustomizer>,
    classification: ReturnClassification,
}

impl CallHandler {
    /// Build a handler customizing statements from the method's annotations
    pub fn new(sql_object_type: Arc<TypeDecl>, method: MethodDescriptor) -> Result<Self> {
        let classification = ReturnClassification::classify(&sql_object_type, &method)?;
        let customizer = Arc::new(StatementCustomizers::for_method(&method)?);
        Ok(Self::assemble(sql_object_type, method, customizer, classification))
    }

    /// Build a handler with its own statement customizer
    pub fn with_customizer(
        sql_object_type: Arc<TypeDecl>,
        method: MethodDescriptor,
        customizer: Arc<dyn StatementCustomizer>,
    ) -> Result<Self> {
        let classification = ReturnClassification::classify(&sql_object_type, &method)?;
        Ok(Self::assemble(sql_object_type, method, customizer, classification))
    }

    fn assemble(
        sql_object_type: Arc<TypeDecl>,
        method: MethodDescriptor,
        customizer: Arc<dyn StatementCustomizer>,
        classification: ReturnClassification,
    ) -> Self {
        tracing::debug!(
            method = %method,
            sql_object = sql_object_type.name(),
            classification = ?classification,
            "built call handler"
        );
        Self {
            sql_object_type,
            method,
            customizer,
            classification,
        }
    }

    pub fn classification(&self) -> ReturnClassification {
        self.classification
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub fn sql_object_type(&self) -> &Arc<TypeDecl> {
        &self.sql_object_type
    }
}

#[async_trait]
impl Handler for CallHandler {
    async fn invoke(
        &self,
        _target: &(dyn Any + Send + Sync),
        args: &[Value],
        handle: &dyn HandleSupplier,
    ) -> Result<ReturnValue> {
        let objects = handle.config().get::<SqlObjects>();
        let sql = objects
            .locator()
            .locate(&self.sql_object_type, &self.method, handle.config())?;

        let mut call = handle.handle().create_call(sql);
        self.customizer.customize(&mut call, args)?;

        let out = call.invoke().await?;
        match self.classification {
            ReturnClassification::OutParameters => Ok(ReturnValue::OutParameters(out)),
            ReturnClassification::Void => Ok(ReturnValue::Nothing),
        }
    }
}
