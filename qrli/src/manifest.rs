//! Chunk manifests, listing the modules emitted by a bundler along with the values that they export.
//!
//! ```toml
//! [modules."widgets/button.js"]
//! default = "Button"
//! onClick = { handler = "click", prevent_default = true }
//! ```
//!
//! Module locators are resolved against the base location given on the command line.

use async_trait::async_trait;
use qrl::identifier::InvalidIdentifier;
use qrl::{Anchor, Identifier, LocatorError, ModuleSpecifier, Url};
use qrl_load::module::{Exports, Value};
use qrl_load::Resolver;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ManifestError {
    #[error("could not read manifest {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse manifest: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("module {module:?} is not a valid locator: {source}")]
    Locator {
        module: String,
        #[source]
        source: LocatorError,
    },
    #[error("module {module:?} exports an invalid symbol {name:?}: {source}")]
    Export {
        module: String,
        name: String,
        #[source]
        source: InvalidIdentifier,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    modules: BTreeMap<String, toml::Table>,
}

impl Manifest {
    pub fn from_toml(text: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(text)?)
    }

    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Resolves the locator of every module against the base location of the anchor.
    pub fn into_resolver<A: Anchor + ?Sized>(self, anchor: &A) -> Result<ManifestResolver, ManifestError> {
        let mut modules = rustc_hash::FxHashMap::default();

        for (module, table) in self.modules {
            let locator = qrl::locator::resolve(anchor, module.as_str()).map_err(|source| ManifestError::Locator {
                module: module.clone(),
                source,
            })?;

            let mut exports = Exports::new();
            for (name, value) in table {
                let name = Identifier::try_from(name.as_str()).map_err(|source| ManifestError::Export {
                    module: module.clone(),
                    name: name.clone(),
                    source,
                })?;
                exports.insert(name, Value::new(value));
            }

            tracing::trace!(%locator, exports = exports.len(), "added module from manifest");
            modules.insert(locator, exports);
        }

        Ok(ManifestResolver { modules })
    }
}

/// Resolves modules from the contents of a chunk manifest.
#[derive(Debug)]
pub struct ManifestResolver {
    modules: rustc_hash::FxHashMap<Url, Exports>,
}

impl ManifestResolver {
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

#[async_trait]
impl Resolver for ManifestResolver {
    type Error = std::convert::Infallible;

    async fn load_module(&self, specifier: &ModuleSpecifier) -> Result<Option<Exports>, Self::Error> {
        Ok(self.modules.get(specifier.as_url()).cloned())
    }
}

/// Formats an exported value, which is shown in TOML syntax when it came from a manifest.
pub fn display_value(value: &Value) -> String {
    match value.downcast_ref::<toml::Value>() {
        Some(value) => value.to_string(),
        None => String::from("<opaque>"),
    }
}
