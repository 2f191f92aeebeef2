//! Module for retrieving the modules that symbols are loaded from.

use crate::error::GenericError;
use crate::module::Exports;
use async_trait::async_trait;
use qrl::ModuleSpecifier;
use std::future::Future;
use std::sync::Arc;

/// Trait for retrieving modules from module specifiers, used to load the modules containing symbols.
///
/// Implementations provide the environment's "load module by locator" primitive, the loader only decides when to call it
/// and what to extract from the result.
#[async_trait]
pub trait Resolver: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Retrieves the module corresponding to the specified module specifier.
    ///
    /// Returns `Ok(Some)` when a module is successfully retrieved, `Ok(None)` if no corresponding module was found, or `Err` if
    /// an error occured while retrieving or evaluating the module.
    async fn load_module(&self, specifier: &ModuleSpecifier) -> Result<Option<Exports>, Self::Error>;
}

#[async_trait]
impl<R: Resolver + ?Sized> Resolver for Box<R> {
    type Error = R::Error;

    async fn load_module(&self, specifier: &ModuleSpecifier) -> Result<Option<Exports>, Self::Error> {
        R::load_module(self, specifier).await
    }
}

#[async_trait]
impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    type Error = R::Error;

    async fn load_module(&self, specifier: &ModuleSpecifier) -> Result<Option<Exports>, Self::Error> {
        R::load_module(self, specifier).await
    }
}

/// A module resolver that never successfully retrieves a module.
///
/// Obtained by calling [`unsuccessful()`].
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct Unsuccessful;

/// Constructs a resolver that never succeeds.
#[must_use]
pub fn unsuccessful() -> Unsuccessful {
    Unsuccessful
}

#[async_trait]
impl Resolver for Unsuccessful {
    type Error = std::convert::Infallible;

    async fn load_module(&self, _: &ModuleSpecifier) -> Result<Option<Exports>, Self::Error> {
        Ok(None)
    }
}

/// A module resolver backed by a closure.
///
/// Obtained by calling [`from_fn()`].
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct FromFn<F>(F);

/// Constructs a resolver that calls the closure to retrieve each module.
///
/// # Examples
///
/// ```
/// use qrl_load::module::Exports;
/// use qrl_load::resolver;
///
/// let resolver = resolver::from_fn(|specifier| async move {
///     Ok::<_, std::io::Error>(Some(Exports::new().with("default", specifier.to_string())))
/// });
/// # let _ = resolver;
/// ```
#[must_use]
pub fn from_fn<F, Fut, E>(f: F) -> FromFn<F>
where
    F: Fn(ModuleSpecifier) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Exports>, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    FromFn(f)
}

#[async_trait]
impl<F, Fut, E> Resolver for FromFn<F>
where
    F: Fn(ModuleSpecifier) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Exports>, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    async fn load_module(&self, specifier: &ModuleSpecifier) -> Result<Option<Exports>, E> {
        (self.0)(specifier.clone()).await
    }
}

#[repr(transparent)]
struct BoxedResolverInternals<R>(R);

#[async_trait]
impl<R: Resolver> Resolver for BoxedResolverInternals<R> {
    type Error = GenericError;

    async fn load_module(&self, specifier: &ModuleSpecifier) -> Result<Option<Exports>, Self::Error> {
        self.0.load_module(specifier).await.map_err(GenericError::new)
    }
}

/// A type-erased resolver, shared between every load started by a [`State`].
///
/// [`State`]: crate::State
#[derive(Clone)]
#[repr(transparent)]
pub struct BoxedResolver(Arc<dyn Resolver<Error = GenericError>>);

#[async_trait]
impl Resolver for BoxedResolver {
    type Error = GenericError;

    async fn load_module(&self, specifier: &ModuleSpecifier) -> Result<Option<Exports>, Self::Error> {
        self.0.load_module(specifier).await
    }
}

impl std::fmt::Debug for BoxedResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("BoxedResolver")
    }
}

pub fn boxed<R: Resolver + 'static>(resolver: R) -> BoxedResolver {
    BoxedResolver(Arc::new(BoxedResolverInternals(resolver)))
}
