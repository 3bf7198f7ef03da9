use stash_di::TypeInfo;

/// Errors when trying to acquire a config
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GetConfigError {
    /// The required Config is not known
    #[error("Config '{0}' is not registered")]
    Missing(TypeInfo),
}

/// Errors when trying to register a config
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterConfigError {
    /// The required Config is already registered
    #[error("Config '{0}' is already registered")]
    AlreadyRegistered(TypeInfo),
}
