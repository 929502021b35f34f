//! Method descriptors for SQL object interfaces

use std::fmt;
use std::time::Duration;
use zqlz_core::SqlType;

use crate::reflect::{TypeDecl, TypeRef};

/// Annotation on a SQL object method
#[derive(Debug, Clone, PartialEq)]
pub enum MethodAnnotation {
    /// Execute the method as a stored procedure call. An empty value means
    /// the SQL is located by method name.
    SqlCall { value: String },
    /// Register a named output parameter
    OutParameter { name: String, sql_type: SqlType },
    /// Query timeout for the statement
    QueryTimeout(Duration),
    /// Fixed template attribute
    Define { key: String, value: String },
}

impl MethodAnnotation {
    pub fn sql_call(value: impl Into<String>) -> Self {
        MethodAnnotation::SqlCall {
            value: value.into(),
        }
    }

    pub fn out_parameter(name: impl Into<String>, sql_type: SqlType) -> Self {
        MethodAnnotation::OutParameter {
            name: name.into(),
            sql_type,
        }
    }

    /// Whether this annotation selects the handler for the method
    pub fn is_sql_method(&self) -> bool {
        matches!(self, MethodAnnotation::SqlCall { .. })
    }
}

/// Annotation on a SQL object method parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterAnnotation {
    /// Bind the argument. With a name it is bound by that name only,
    /// otherwise by position and by the parameter name if there is one.
    Bind(Option<String>),
    /// Use the argument as a template attribute, keyed by the given name or
    /// the parameter name.
    Define(Option<String>),
}

/// A parameter of a SQL object method
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterDescriptor {
    name: Option<String>,
    annotations: Vec<ParameterAnnotation>,
}

impl ParameterDescriptor {
    pub fn positional() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            annotations: Vec::new(),
        }
    }

    pub fn annotate(mut self, annotation: ParameterAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn annotations(&self) -> &[ParameterAnnotation] {
        &self.annotations
    }
}

/// A method of a SQL object interface
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    name: String,
    declaring_type: String,
    return_type: TypeRef,
    parameters: Vec<ParameterDescriptor>,
    annotations: Vec<MethodAnnotation>,
}

impl MethodDescriptor {
    /// A method named `name` declared by `declaring_type`, returning `()`
    pub fn new(name: impl Into<String>, declaring_type: &TypeDecl) -> Self {
        Self {
            name: name.into(),
            declaring_type: declaring_type.name().to_string(),
            return_type: TypeRef::Unit,
            parameters: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn returns(mut self, return_type: TypeRef) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn param(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn annotate(mut self, annotation: MethodAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the interface that declares the method
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// Return type as written, before resolution
    pub fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn annotations(&self) -> &[MethodAnnotation] {
        &self.annotations
    }

    /// Value of the `SqlCall` annotation, if present
    pub fn sql_call_value(&self) -> Option<&str> {
        self.annotations.iter().find_map(|annotation| match annotation {
            MethodAnnotation::SqlCall { value } => Some(value.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let dao = TypeDecl::new("AccountDao");
        let method = MethodDescriptor::new("transfer", &dao)
            .returns(TypeRef::out_parameters())
            .param(ParameterDescriptor::named("from"))
            .param(ParameterDescriptor::positional().annotate(ParameterAnnotation::Bind(None)))
            .annotate(MethodAnnotation::sql_call("CALL transfer(:from, ?)"));

        assert_eq!(method.to_string(), "AccountDao.transfer");
        assert_eq!(method.parameters().len(), 2);
        assert_eq!(method.parameters()[0].name(), Some("from"));
        assert_eq!(method.sql_call_value(), Some("CALL transfer(:from, ?)"));
        assert!(method.annotations()[0].is_sql_method());
    }

    #[test]
    fn test_defaults_to_unit_return() {
        let dao = TypeDecl::new("AccountDao");
        let method = MethodDescriptor::new("purge", &dao);

        assert_eq!(method.return_type(), &TypeRef::Unit);
        assert_eq!(method.sql_call_value(), None);
    }
}
