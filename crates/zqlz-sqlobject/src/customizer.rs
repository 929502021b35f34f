//! Statement customization from method and parameter annotations

use std::collections::HashSet;
use std::time::Duration;
use zqlz_core::{Call, Result, SqlType, Value, ZqlzError};

use crate::method::{MethodAnnotation, MethodDescriptor, ParameterAnnotation};

/// Prepares a statement from the arguments of one invocation.
///
/// Customizers bind arguments and set options on the call. They cannot
/// execute it.
pub trait StatementCustomizer: Send + Sync + std::fmt::Debug {
    fn customize(&self, call: &mut Call, args: &[Value]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
enum MethodCustomizer {
    OutParameter { name: String, sql_type: SqlType },
    QueryTimeout(Duration),
    Define { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
enum ParameterCustomizer {
    Bind {
        position: usize,
        name: Option<String>,
    },
    BindName(String),
    Define(String),
}

/// The customizers of one method, derived once from its annotations
#[derive(Debug, Clone, PartialEq)]
pub struct StatementCustomizers {
    method: String,
    arity: usize,
    method_level: Vec<MethodCustomizer>,
    parameters: Vec<(usize, ParameterCustomizer)>,
}

impl StatementCustomizers {
    /// Derive the customizers for `method`.
    ///
    /// Unannotated parameters are bound by position, and by name when the
    /// parameter has one.
    pub fn for_method(method: &MethodDescriptor) -> Result<Self> {
        let method_level = method
            .annotations()
            .iter()
            .filter_map(|annotation| match annotation {
                MethodAnnotation::SqlCall { .. } => None,
                MethodAnnotation::OutParameter { name, sql_type } => {
                    Some(MethodCustomizer::OutParameter {
                        name: name.clone(),
                        sql_type: *sql_type,
                    })
                }
                MethodAnnotation::QueryTimeout(timeout) => {
                    Some(MethodCustomizer::QueryTimeout(*timeout))
                }
                MethodAnnotation::Define { key, value } => Some(MethodCustomizer::Define {
                    key: key.clone(),
                    value: value.clone(),
                }),
            })
            .collect();

        let mut parameters = Vec::new();
        let mut bound_names = HashSet::new();
        for (index, parameter) in method.parameters().iter().enumerate() {
            let mut customizers = Vec::new();
            for annotation in parameter.annotations() {
                match annotation {
                    ParameterAnnotation::Bind(Some(name)) => {
                        customizers.push(ParameterCustomizer::BindName(name.clone()));
                    }
                    ParameterAnnotation::Bind(None) => {
                        customizers.push(ParameterCustomizer::Bind {
                            position: index,
                            name: parameter.name().map(str::to_string),
                        });
                    }
                    ParameterAnnotation::Define(key) => {
                        let key = key.as_deref().or(parameter.name()).ok_or_else(|| {
                            ZqlzError::Configuration(format!(
                                "parameter {} of {} is defined as an attribute but has no name",
                                index, method
                            ))
                        })?;
                        customizers.push(ParameterCustomizer::Define(key.to_string()));
                    }
                }
            }
            if customizers.is_empty() {
                customizers.push(ParameterCustomizer::Bind {
                    position: index,
                    name: parameter.name().map(str::to_string),
                });
            }

            for customizer in customizers {
                let bound_name = match &customizer {
                    ParameterCustomizer::BindName(name) => Some(name),
                    ParameterCustomizer::Bind { name, .. } => name.as_ref(),
                    ParameterCustomizer::Define(_) => None,
                };
                if let Some(name) = bound_name {
                    if !bound_names.insert(name.clone()) {
                        return Err(ZqlzError::Configuration(format!(
                            "{} binds the name '{}' more than once",
                            method, name
                        )));
                    }
                }
                parameters.push((index, customizer));
            }
        }

        Ok(Self {
            method: method.to_string(),
            arity: method.parameters().len(),
            method_level,
            parameters,
        })
    }

    /// Number of arguments the method takes
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl StatementCustomizer for StatementCustomizers {
    fn customize(&self, call: &mut Call, args: &[Value]) -> Result<()> {
        if args.len() != self.arity {
            return Err(ZqlzError::Binding(format!(
                "{} expects {} arguments, got {}",
                self.method,
                self.arity,
                args.len()
            )));
        }

        for customizer in &self.method_level {
            match customizer {
                MethodCustomizer::OutParameter { name, sql_type } => {
                    call.register_out_parameter_by_name(name.as_str(), *sql_type);
                }
                MethodCustomizer::QueryTimeout(timeout) => {
                    call.set_query_timeout(*timeout);
                }
                MethodCustomizer::Define { key, value } => {
                    call.define(key.as_str(), value.as_str());
                }
            }
        }

        for (index, customizer) in &self.parameters {
            let value = &args[*index];
            match customizer {
                ParameterCustomizer::Bind { position, name } => {
                    call.bind(*position, value.clone());
                    if let Some(name) = name {
                        call.bind_by_name(name.as_str(), value.clone());
                    }
                }
                ParameterCustomizer::BindName(name) => {
                    call.bind_by_name(name.as_str(), value.clone());
                }
                ParameterCustomizer::Define(key) => {
                    if !value.is_scalar() {
                        return Err(ZqlzError::Binding(format!(
                            "argument {} of {} cannot be used as attribute '{}'",
                            index, self.method, key
                        )));
                    }
                    call.define(key.as_str(), value.to_string());
                }
            }
        }

        tracing::debug!(
            method = %self.method,
            arguments = args.len(),
            "applied statement customizers"
        );
        Ok(())
    }
}
