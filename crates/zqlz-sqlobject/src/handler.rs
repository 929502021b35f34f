//! Handler traits for SQL object methods

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use zqlz_core::{ConfigRegistry, Handle, OutParameters, Result, Value};

use crate::method::MethodDescriptor;
use crate::reflect::TypeDecl;

/// What a SQL object method hands back to its caller
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    /// The method returns `()`
    Nothing,
    OutParameters(OutParameters),
}

impl ReturnValue {
    pub fn is_nothing(&self) -> bool {
        matches!(self, ReturnValue::Nothing)
    }

    pub fn into_out_parameters(self) -> Option<OutParameters> {
        match self {
            ReturnValue::OutParameters(out) => Some(out),
            ReturnValue::Nothing => None,
        }
    }
}

/// Supplies the live handle and its configuration for one invocation
pub trait HandleSupplier: Send + Sync {
    fn handle(&self) -> &Handle;

    fn config(&self) -> &ConfigRegistry {
        self.handle().config()
    }
}

impl HandleSupplier for Handle {
    fn handle(&self) -> &Handle {
        self
    }
}

/// Executes one SQL object method.
///
/// Handlers are built once per method and shared by every invocation, so
/// they must not hold per-call state.
#[async_trait]
pub trait Handler: Send + Sync + std::fmt::Debug {
    async fn invoke(
        &self,
        target: &(dyn Any + Send + Sync),
        args: &[Value],
        handle: &dyn HandleSupplier,
    ) -> Result<ReturnValue>;
}

/// Builds the handler for a method when a SQL object type is assembled
pub trait HandlerFactory: Send + Sync {
    /// Validate `method` and build its handler. Fails with
    /// `ZqlzError::Configuration` when the method cannot be supported.
    fn build_handler(
        &self,
        sql_object_type: &Arc<TypeDecl>,
        method: &MethodDescriptor,
    ) -> Result<Arc<dyn Handler>>;
}
