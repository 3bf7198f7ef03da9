//! Stash Config provides a registry of typed configs that can be injected into the rest of the
//! application.
//!
//! Stash Config is split into two major parts:
//! 1. ConfigProvider: Used to create the registry of all configs
//! 2. Config<T>: A wrapper type to be able to resolve and retrieve configs
//!
//! # Examples
//!
//! ```rust
//! use stash_config::provider::ConfigProvider;
//!
//! #[derive(Clone)]
//! struct StashConfig {
//!     name: String,
//!     slots: u32,
//! }
//!
//! let stash_config = StashConfig {
//!     name: "Ender Chest".to_string(),
//!     slots: 27,
//! };
//!
//! let mut config_provider = ConfigProvider::new();
//! config_provider.add_config(stash_config.clone()).unwrap();
//!
//! let retrieved_config = config_provider.get_config::<StashConfig>().unwrap();
//!
//! assert_eq!(stash_config.name, retrieved_config.name);
//! assert_eq!(stash_config.slots, retrieved_config.slots);
//! ```
//!
//! The provider itself is usually bound as a constant in the
//! [`Dependencies`](stash_di::Dependencies) registry of the composition root, so
//! constructors can ask for [`Config<T>`](config::Config).

pub mod config;
pub mod errors;
pub mod provider;

pub use config::Config;
pub use errors::{GetConfigError, RegisterConfigError};
pub use provider::ConfigProvider;
