//! Type model for SQL object interfaces
//!
//! A SQL object interface is described by a [`TypeDecl`]: a name, its type
//! parameters and the supertypes it extends (with their type arguments).
//! Method return types are [`TypeRef`]s that may mention type variables of
//! the interface declaring the method. [`resolve_type`] substitutes those
//! variables from the point of view of a concrete SQL object type, and
//! [`erase`] reduces the result to something that can be checked.
//!
//! ```text
//! trait Procedures<R>            { fn run(&self) -> R; }
//! trait AccountDao: Procedures<OutParameters> {}
//!
//! resolve(R, AccountDao, "Procedures") == OutParameters
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Name of the built-in output parameters type
pub const OUT_PARAMETERS_TYPE: &str = "OutParameters";

static OUT_PARAMETERS: LazyLock<Arc<TypeDecl>> =
    LazyLock::new(|| Arc::new(TypeDecl::new(OUT_PARAMETERS_TYPE)));

/// Declaration of an interface or class
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TypeDecl {
    name: String,
    type_params: Vec<String>,
    supertypes: Vec<TypeRef>,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            supertypes: Vec::new(),
        }
    }

    /// The shared declaration of `OutParameters`
    pub fn out_parameters() -> Arc<TypeDecl> {
        Arc::clone(&OUT_PARAMETERS)
    }

    pub fn with_type_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Add a supertype; type arguments may refer to this type's parameters
    pub fn extends(mut self, supertype: TypeRef) -> Self {
        self.supertypes.push(supertype);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_params(&self) -> &[String] {
        &self.type_params
    }

    pub fn supertypes(&self) -> &[TypeRef] {
        &self.supertypes
    }

    /// Whether this type is `name` or transitively extends it
    pub fn is_subtype_of(&self, name: &str) -> bool {
        self.name == name
            || self.supertypes.iter().any(|supertype| match supertype {
                TypeRef::Class { decl, .. } => decl.is_subtype_of(name),
                _ => false,
            })
    }
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.type_params.is_empty() {
            write!(f, "<{}>", self.type_params.join(", "))?;
        }
        Ok(())
    }
}

/// A (possibly generic) type as written in a method signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// The "no value" type
    Unit,
    /// A declared type with its type arguments
    Class {
        decl: Arc<TypeDecl>,
        args: Vec<TypeRef>,
    },
    /// A type variable
    Var(String),
}

impl TypeRef {
    pub fn unit() -> Self {
        TypeRef::Unit
    }

    pub fn class(decl: &Arc<TypeDecl>) -> Self {
        TypeRef::Class {
            decl: Arc::clone(decl),
            args: Vec::new(),
        }
    }

    pub fn generic(decl: &Arc<TypeDecl>, args: Vec<TypeRef>) -> Self {
        TypeRef::Class {
            decl: Arc::clone(decl),
            args,
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        TypeRef::Var(name.into())
    }

    pub fn out_parameters() -> Self {
        TypeRef::class(&OUT_PARAMETERS)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Unit => f.write_str("()"),
            TypeRef::Var(name) => f.write_str(name),
            TypeRef::Class { decl, args } => {
                f.write_str(decl.name())?;
                if !args.is_empty() {
                    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// A resolved type reduced to what can be checked at runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErasedType {
    Unit,
    Class(Arc<TypeDecl>),
    /// A type variable with no binding
    Unresolved(String),
}

impl ErasedType {
    pub fn is_assignable_to(&self, name: &str) -> bool {
        match self {
            ErasedType::Class(decl) => decl.is_subtype_of(name),
            _ => false,
        }
    }
}

impl fmt::Display for ErasedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErasedType::Unit => f.write_str("()"),
            ErasedType::Class(decl) => f.write_str(decl.name()),
            ErasedType::Unresolved(name) => write!(f, "unresolved type variable {}", name),
        }
    }
}

/// Resolve `ty`, written inside `declaring_type`, as seen from `context`.
///
/// Type variables are replaced by the arguments `context` (directly or
/// through its supertypes) passes to `declaring_type`. Variables that are
/// never bound are left in place.
pub fn resolve_type(ty: &TypeRef, context: &TypeDecl, declaring_type: &str) -> TypeRef {
    match type_arguments(context, declaring_type) {
        Some(bindings) => substitute(ty, &bindings),
        None => {
            tracing::warn!(
                context = context.name(),
                declaring_type,
                "declaring type is not a supertype of the sql object type"
            );
            ty.clone()
        }
    }
}

/// Erase a resolved type
pub fn erase(ty: &TypeRef) -> ErasedType {
    match ty {
        TypeRef::Unit => ErasedType::Unit,
        TypeRef::Class { decl, .. } => ErasedType::Class(Arc::clone(decl)),
        TypeRef::Var(name) => ErasedType::Unresolved(name.clone()),
    }
}

/// Bindings of `target`'s type parameters, expressed in `context`'s terms
fn type_arguments(context: &TypeDecl, target: &str) -> Option<HashMap<String, TypeRef>> {
    if context.name == target {
        return Some(
            context
                .type_params
                .iter()
                .map(|param| (param.clone(), TypeRef::Var(param.clone())))
                .collect(),
        );
    }

    context.supertypes.iter().find_map(|supertype| {
        let TypeRef::Class { decl, args } = supertype else {
            return None;
        };
        let inner = type_arguments(decl, target)?;
        let local: HashMap<String, TypeRef> = decl
            .type_params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        Some(
            inner
                .into_iter()
                .map(|(param, ty)| (param, substitute(&ty, &local)))
                .collect(),
        )
    })
}

fn substitute(ty: &TypeRef, bindings: &HashMap<String, TypeRef>) -> TypeRef {
    match ty {
        TypeRef::Unit => TypeRef::Unit,
        TypeRef::Var(name) => bindings.get(name).cloned().unwrap_or_else(|| ty.clone()),
        TypeRef::Class { decl, args } => TypeRef::Class {
            decl: Arc::clone(decl),
            args: args.iter().map(|arg| substitute(arg, bindings)).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn procedures() -> Arc<TypeDecl> {
        Arc::new(TypeDecl::new("Procedures").with_type_params(["R"]))
    }

    #[test]
    fn test_resolve_direct_argument() {
        let procedures = procedures();
        let dao = TypeDecl::new("AccountDao")
            .extends(TypeRef::generic(&procedures, vec![TypeRef::out_parameters()]));

        let resolved = resolve_type(&TypeRef::var("R"), &dao, "Procedures");
        assert_eq!(resolved, TypeRef::out_parameters());
    }

    #[test]
    fn test_resolve_through_intermediate_interface() {
        let procedures = procedures();
        let audited = Arc::new(
            TypeDecl::new("Audited")
                .with_type_params(["T"])
                .extends(TypeRef::generic(&procedures, vec![TypeRef::var("T")])),
        );
        let dao =
            TypeDecl::new("LedgerDao").extends(TypeRef::generic(&audited, vec![TypeRef::Unit]));

        let resolved = resolve_type(&TypeRef::var("R"), &dao, "Procedures");
        assert_eq!(resolved, TypeRef::Unit);
    }

    #[test]
    fn test_resolve_nested_arguments() {
        let procedures = procedures();
        let holder = Arc::new(TypeDecl::new("Holder").with_type_params(["V"]));
        let dao = TypeDecl::new("HolderDao")
            .extends(TypeRef::generic(&procedures, vec![TypeRef::out_parameters()]));

        let written = TypeRef::generic(&holder, vec![TypeRef::var("R")]);
        let resolved = resolve_type(&written, &dao, "Procedures");
        assert_eq!(resolved.to_string(), "Holder<OutParameters>");
        assert_eq!(erase(&resolved), ErasedType::Class(holder));
    }

    #[test]
    fn test_unbound_variable_stays_unresolved() {
        let procedures = procedures();
        let raw = TypeDecl::new("RawDao").extends(TypeRef::class(&procedures));

        let resolved = resolve_type(&TypeRef::var("R"), &raw, "Procedures");
        assert_eq!(erase(&resolved), ErasedType::Unresolved("R".into()));
    }

    #[test]
    fn test_unrelated_declaring_type() {
        let dao = TypeDecl::new("Standalone");
        let resolved = resolve_type(&TypeRef::var("X"), &dao, "Elsewhere");
        assert_eq!(resolved, TypeRef::var("X"));
    }

    #[test]
    fn test_subtype_assignability() {
        let custom = Arc::new(
            TypeDecl::new("TransferResult").extends(TypeRef::out_parameters()),
        );
        let string = Arc::new(TypeDecl::new("String"));

        assert!(ErasedType::Class(custom).is_assignable_to(OUT_PARAMETERS_TYPE));
        assert!(
            ErasedType::Class(TypeDecl::out_parameters()).is_assignable_to(OUT_PARAMETERS_TYPE)
        );
        assert!(!ErasedType::Class(string).is_assignable_to(OUT_PARAMETERS_TYPE));
        assert!(!ErasedType::Unit.is_assignable_to(OUT_PARAMETERS_TYPE));
    }

    #[test]
    fn test_display() {
        assert_eq!(procedures().to_string(), "Procedures<R>");
        assert_eq!(TypeRef::Unit.to_string(), "()");
    }
}
