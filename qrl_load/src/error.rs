//! Contains types representing errors encountered during loading.

use qrl::{Identifier, ModulePath, ModuleSpecifier};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// A shared boxed error type.
///
/// Every caller waiting on the same load receives a copy of the same error, so the boxed error is reference counted.
#[derive(Clone)]
#[repr(transparent)]
pub struct GenericError(Arc<dyn std::error::Error + Send + Sync>);

impl GenericError {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Self(Arc::new(error))
    }

    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }

    /// Attempts to downcast the boxed error to a concrete type.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref()
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for GenericError {
    fn from(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self(Arc::from(error))
    }
}

impl std::fmt::Debug for GenericError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}

impl Display for GenericError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for GenericError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// The error type used when a module does not export the requested symbol.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("module {module} does not export a symbol named {symbol:?}")]
pub struct SymbolNotFoundError {
    module: ModulePath,
    symbol: Identifier,
}

impl SymbolNotFoundError {
    pub(crate) fn new(module: ModulePath, symbol: Identifier) -> Self {
        Self { module, symbol }
    }

    pub fn module(&self) -> &ModulePath {
        &self.module
    }

    pub fn symbol(&self) -> &Identifier {
        &self.symbol
    }
}

/// The error type used when loading a symbol fails.
///
/// Every caller sharing a pending load observes the same error. Failed loads are not cached, so resolving the same
/// reference again retries the load.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The resolver could not retrieve or evaluate the module.
    #[error("failed to load module {specifier}")]
    Retrieval {
        specifier: ModuleSpecifier,
        #[source]
        source: GenericError,
    },
    /// The resolver has no module corresponding to the specifier.
    #[error("module {0} could not be found")]
    ModuleNotFound(ModuleSpecifier),
    #[error(transparent)]
    SymbolNotFound(#[from] SymbolNotFoundError),
}

impl LoadError {
    /// Gets the boxed error produced by the resolver, if the module failed to load.
    pub fn retrieval_error(&self) -> Option<&GenericError> {
        match self {
            Self::Retrieval { source, .. } => Some(source),
            _ => None,
        }
    }
}
