//! Configuration used when initializing the loader [`State`].
//!
//! [`State`]: crate::State

use crate::resolver::{self, BoxedResolver, Resolver};
use serde::Deserialize;

/// The extension of compiled modules, appended to a module path to locate the module file.
pub const DEFAULT_MODULE_EXTENSION: &str = ".js";

/// Settings for the loader that can be read from a configuration file.
///
/// # Examples
///
/// ```
/// use qrl_load::Config;
///
/// let config: Config = toml::from_str(r#"module_extension = ".mjs""#)?;
/// assert_eq!(config.module_extension, ".mjs");
///
/// let defaults: Config = toml::from_str("")?;
/// assert_eq!(defaults, Config::default());
///
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct Config {
    /// Appended to every module path to form the locator of the module file, must match what the bundler emits.
    pub module_extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            module_extension: DEFAULT_MODULE_EXTENSION.to_string(),
        }
    }
}

/// Collects the settings and the resolver used to construct a [`State`].
///
/// [`State`]: crate::State
#[derive(Debug, Default)]
pub struct Initializer {
    pub(crate) config: Config,
    pub(crate) resolver: Option<BoxedResolver>,
}

impl Initializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self { config, resolver: None }
    }

    pub fn set_resolver<R: Resolver + 'static>(&mut self, resolver: R) -> &mut Self {
        self.resolver = Some(resolver::boxed(resolver));
        self
    }

    pub fn set_module_extension<E: Into<String>>(&mut self, extension: E) -> &mut Self {
        self.config.module_extension = extension.into();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
