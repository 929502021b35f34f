//! ZQLZ SQL objects - declarative stored procedure calls
//!
//! A SQL object is an interface whose methods are bound to SQL statements.
//! Each method is described by a [`MethodDescriptor`]; when the interface is
//! assembled, every method gets a [`Handler`] built by the factory of its
//! SQL method annotation. Handlers are validated eagerly, so a method that
//! cannot be supported fails assembly instead of its first call.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zqlz_core::SqlType;
//! use zqlz_sqlobject::{
//!     MethodAnnotation, MethodDescriptor, ParameterDescriptor, SqlObjectDefinition,
//!     SqlObjectFactory, TypeDecl, TypeRef,
//! };
//!
//! let dao = Arc::new(TypeDecl::new("AccountDao"));
//! let definition = SqlObjectDefinition::new(dao.clone()).method(
//!     MethodDescriptor::new("transfer", &dao)
//!         .returns(TypeRef::out_parameters())
//!         .param(ParameterDescriptor::named("from"))
//!         .param(ParameterDescriptor::named("to"))
//!         .annotate(MethodAnnotation::sql_call("CALL transfer(:from, :to, :moved)"))
//!         .annotate(MethodAnnotation::out_parameter("moved", SqlType::BigInt)),
//! );
//!
//! let accounts = SqlObjectFactory::new().attach(&definition, handle)?;
//! let out = accounts
//!     .invoke("transfer", &["A-1".into(), "B-2".into()])
//!     .await?
//!     .into_out_parameters();
//! ```

pub mod customizer;
mod handler;
pub mod locator;
mod method;
mod object;
pub mod reflect;
pub mod sql_call;

pub use customizer::{StatementCustomizer, StatementCustomizers};
pub use handler::{HandleSupplier, Handler, HandlerFactory, ReturnValue};
pub use locator::{AnnotationSqlLocator, DirectorySqlLocator, SqlLocator, SqlObjects};
pub use method::{MethodAnnotation, MethodDescriptor, ParameterAnnotation, ParameterDescriptor};
pub use object::{HandlerTable, SqlObject, SqlObjectDefinition, SqlObjectFactory};
pub use reflect::{ErasedType, TypeDecl, TypeRef};
pub use sql_call::{CallHandler, ReturnClassification, SqlCallFactory};
