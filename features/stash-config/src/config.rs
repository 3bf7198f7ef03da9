use std::{ops::Deref, rc::Rc};

use stash_di::{Constructors, DynError, Injectable, Param};

use crate::provider::ConfigProvider;

/// A wrapper type to allow for config injections
///
/// This provides a simple way to retrieve configs from the config registry,
/// and inject them into a constructor as a dependency
///
/// # Example
/// ```rust
/// use std::rc::Rc;
/// use stash_config::{config::Config, provider::ConfigProvider};
/// use stash_di::{Constructors, Dependencies, Injectable, Param};
///
/// pub struct SorterConfig {
///     enabled: bool,
/// }
///
/// struct Sorter {
///     enabled: bool,
/// }
/// impl Injectable for Sorter {
///     fn constructors() -> Constructors<Self> {
///         Constructors::new().public([Param::of::<Config<SorterConfig>>()], |args| {
///             let config: Rc<Config<SorterConfig>> = args.next()?;
///             Ok(Sorter {
///                 enabled: config.enabled,
///             })
///         })
///     }
/// }
///
/// let mut config_provider = ConfigProvider::new();
/// config_provider
///     .add_config(SorterConfig { enabled: true })
///     .unwrap();
///
/// let deps = Dependencies::new();
/// deps.bind_instance(Rc::new(config_provider)).unwrap();
///
/// assert!(deps.resolve::<Sorter>().unwrap().enabled);
/// ```
pub struct Config<T> {
    inner: Rc<T>,
}
impl<T> Clone for Config<T> {
    fn clone(&self) -> Self {
        Config {
            inner: self.inner.clone(),
        }
    }
}
impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl<T> Config<T> {
    pub fn inner(&self) -> Rc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Rc<T> {
        self.inner
    }
}

impl<T: 'static> Injectable for Config<T> {
    fn constructors() -> Constructors<Self> {
        Constructors::new().public([Param::of::<ConfigProvider>()], |args| {
            let config_provider: Rc<ConfigProvider> = args.next()?;
            let config = config_provider.get_config::<T>().map_err(DynError::from)?;

            Ok(Config { inner: config })
        })
    }
}
