use thiserror::Error;

use crate::{
    binding::Lifecycle,
    types::{DynError, TypeInfo},
};

/// Broad classification of a [`DiError`], for callers that branch on the kind of mistake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required reference (type, source object, value) was not supplied
    ArgumentNull,
    /// A supplied value is structurally wrong for the operation
    ArgumentInvalid,
    /// Construction was attempted but could not be carried out
    InjectionFailure,
    /// A once-only configuration was repeated, or a binding's contract was violated
    ConfigurationConflict,
}

/// Errors while binding, resolving or calling
#[derive(Error, Debug)]
pub enum DiError {
    #[error("No contract type was supplied")]
    NullType,
    #[error("No source instance was supplied")]
    NullSource,
    #[error("'{0}' is bound to an empty constant")]
    EmptyConstant(TypeInfo),

    #[error("The method name is empty")]
    EmptyMethodName,
    #[error("'{target}' has no method named '{method}'")]
    MethodNotFound { target: TypeInfo, method: String },
    #[error("'{target}::{method}' is not a public instance method")]
    MethodInaccessible { target: TypeInfo, method: String },
    #[error("'{method}' does not return '{wanted}'")]
    ReturnTypeMismatch {
        method: String,
        wanted: &'static str,
    },
    #[error("'{0}' is neither bound nor constructible")]
    Unresolvable(TypeInfo),
    #[error("No constructor of '{target}' can be satisfied{}", unresolved_suffix(.unresolved))]
    NoMatchingConstructor {
        target: TypeInfo,
        unresolved: Option<TypeInfo>,
    },
    #[error("Constructor of '{target}' asked for '{wanted}' but no arguments are left")]
    MissingArgument {
        target: TypeInfo,
        wanted: &'static str,
    },
    #[error("Constructor of '{target}' asked for '{wanted}' but was given '{actual}'")]
    ArgumentMismatch {
        target: TypeInfo,
        wanted: &'static str,
        actual: &'static str,
    },

    #[error("'{0}' has no public constructor")]
    NoPublicConstructor(TypeInfo),
    #[error("Constructor for '{target}' failed - error: {error}")]
    ConstructionFailed { target: TypeInfo, error: DynError },

    #[error("Lifecycle of '{contract}' is already {current:?}")]
    LifecycleAlreadySet {
        contract: TypeInfo,
        current: Lifecycle,
    },
    /// The binder outlived its binding, which was replaced or disposed
    #[error("The binding of '{0}' is no longer part of the registry")]
    BindingDetached(TypeInfo),
    #[error("A '{actual}' can not be used as constant for '{contract}'")]
    ConstantNotAssignable {
        contract: TypeInfo,
        actual: TypeInfo,
    },
    #[error("Can not bind to an interface as a construction target: '{0}'")]
    InterfaceTarget(TypeInfo),
    #[error("Parameter '{parameter}' of '{method}' can not be resolved")]
    UnresolvableMethodParameter { method: String, parameter: TypeInfo },
    #[error("A circular dependency exists: {}", display_chain(.chain))]
    CircularDependency { chain: Vec<TypeInfo> },
}

impl DiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiError::NullType | DiError::NullSource | DiError::EmptyConstant(_) => {
                ErrorKind::ArgumentNull
            }
            DiError::EmptyMethodName
            | DiError::MethodNotFound { .. }
            | DiError::MethodInaccessible { .. }
            | DiError::ReturnTypeMismatch { .. }
            | DiError::Unresolvable(_)
            | DiError::NoMatchingConstructor { .. }
            | DiError::MissingArgument { .. }
            | DiError::ArgumentMismatch { .. } => ErrorKind::ArgumentInvalid,
            DiError::NoPublicConstructor(_) | DiError::ConstructionFailed { .. } => {
                ErrorKind::InjectionFailure
            }
            DiError::LifecycleAlreadySet { .. }
            | DiError::BindingDetached(_)
            | DiError::ConstantNotAssignable { .. }
            | DiError::InterfaceTarget(_)
            | DiError::UnresolvableMethodParameter { .. }
            | DiError::CircularDependency { .. } => ErrorKind::ConfigurationConflict,
        }
    }

    /// Unwraps registry errors raised inside a constructor, wraps everything else
    pub(crate) fn from_construction(target: TypeInfo, error: DynError) -> DiError {
        match error.downcast::<DiError>() {
            Ok(inner) => *inner,
            Err(error) => DiError::ConstructionFailed { target, error },
        }
    }
}

fn unresolved_suffix(unresolved: &Option<TypeInfo>) -> String {
    match unresolved {
        Some(info) => format!(" - '{info}' is neither bound nor constructible"),
        None => String::new(),
    }
}

pub(crate) fn display_chain(chain: &[TypeInfo]) -> String {
    chain
        .iter()
        .map(|info| info.type_name)
        .collect::<Vec<_>>()
        .join(" -> ")
}
