//! Module for managing loader state.

use crate::config::Initializer;
use crate::error::LoadError;
use crate::module::{Module, Value};
use crate::resolver::{self, BoxedResolver, Resolver};
use futures::future::{self, BoxFuture, Either, FutureExt as _, Shared};
use parking_lot::Mutex;
use qrl::{Anchor, Identifier, LocatorError, ModulePath, Reference, SymbolReference};
use std::collections::hash_map;
use std::fmt::{Debug, Formatter};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

type SharedLoad<T> = Shared<BoxFuture<'static, Result<T, LoadError>>>;

/// A handle to a value that is still being loaded.
///
/// Clones of a [`Deferred`] share the same underlying load, which only makes progress while some handle is polled.
/// Dropping every handle does not cancel the load: the loader keeps its own handle, so the load stays parked until the
/// next caller resolving the same symbol or module polls it again.
#[derive(Clone)]
#[must_use = "deferred values do nothing unless awaited"]
pub struct Deferred<T = Value> {
    load: SharedLoad<T>,
}

impl<T: Clone + Send + Sync + 'static> Deferred<T> {
    fn settled(result: Result<T, LoadError>) -> Self {
        Self {
            load: future::ready(result).boxed().shared(),
        }
    }

    /// Gets the result of the load if it has already settled.
    pub fn peek(&self) -> Option<&Result<T, LoadError>> {
        self.load.peek()
    }

    pub fn is_settled(&self) -> bool {
        self.peek().is_some()
    }

    /// Returns `true` if both handles share the same underlying load.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        a.load.ptr_eq(&b.load)
    }
}

impl<T: Clone> Future for Deferred<T> {
    type Output = Result<T, LoadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.load).poll(cx)
    }
}

impl<T> Debug for Deferred<T> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

/// The result of resolving a reference, either the value itself or a handle to the pending load.
#[derive(Clone, Debug)]
#[must_use]
pub enum Resolution {
    /// The value was already loaded.
    Ready(Value),
    /// The value is still loading, or has failed to load.
    Pending(Deferred),
}

impl Resolution {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Gets the value if it was already loaded.
    pub fn ready(self) -> Option<Value> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) => None,
        }
    }
}

impl IntoFuture for Resolution {
    type Output = Result<Value, LoadError>;
    type IntoFuture = Either<future::Ready<Result<Value, LoadError>>, Deferred>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Ready(value) => Either::Left(future::ready(Ok(value))),
            Self::Pending(deferred) => Either::Right(deferred),
        }
    }
}

/// Counts how resolutions were served, see [`State::statistics`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct Statistics {
    /// Resolutions answered with an already loaded value.
    pub hits: u64,
    /// Resolutions that joined a load that was still pending.
    pub joins: u64,
    /// Resolutions that had to start extracting a new symbol.
    pub misses: u64,
    /// Module loads handed to the resolver.
    pub loads: u64,
    /// Module loads or symbol extractions that failed.
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    joins: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Statistics {
        Statistics {
            hits: self.hits.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

enum Slot<T> {
    Resolved(T),
    /// The generation identifies the load that created the slot, so that a load settling after the slot was invalidated
    /// and recreated does not overwrite the newer slot. The module generation identifies the module load that the slot
    /// waits on, which for module slots is the slot's own generation.
    Pending {
        generation: u64,
        module_generation: u64,
        load: SharedLoad<T>,
    },
}

type SymbolKey = (ModulePath, Identifier);

#[derive(Default)]
struct Caches {
    symbols: rustc_hash::FxHashMap<SymbolKey, Slot<Value>>,
    modules: rustc_hash::FxHashMap<ModulePath, Slot<Arc<Module>>>,
}

/// Settles a pending slot, keeping the value on success and removing the slot on failure so the load can be retried.
fn settle<K, T>(slots: &mut rustc_hash::FxHashMap<K, Slot<T>>, key: &K, generation: u64, result: &Result<T, LoadError>) -> bool
where
    K: Eq + std::hash::Hash + Clone,
    T: Clone,
{
    let current = matches!(slots.get(key), Some(Slot::Pending { generation: pending, .. }) if *pending == generation);
    if !current {
        return false;
    }

    match result {
        Ok(value) => {
            slots.insert(key.clone(), Slot::Resolved(value.clone()));
        }
        Err(_) => {
            slots.remove(key);
        }
    }

    true
}

enum ModuleLoad {
    Loaded(Arc<Module>),
    Pending { generation: u64, load: SharedLoad<Arc<Module>> },
}

/// The cache of loaded symbols and modules.
///
/// A [`State`] is constructed once per application and shared by reference with everything that resolves references.
/// Symbols are cached by module path and symbol name, while the modules themselves are cached by module path, so every
/// module is loaded at most once no matter how many of its symbols are requested.
pub struct State {
    caches: Mutex<Caches>,
    resolver: BoxedResolver,
    module_extension: String,
    generation: AtomicU64,
    counters: Counters,
}

impl State {
    pub fn initialize(initializer: Initializer) -> Arc<Self> {
        let Initializer { config, resolver } = initializer;
        Arc::new(Self {
            caches: Mutex::default(),
            resolver: resolver.unwrap_or_else(|| resolver::boxed(resolver::unsuccessful())),
            module_extension: config.module_extension,
            generation: AtomicU64::new(0),
            counters: Counters::default(),
        })
    }

    pub fn with_resolver<R: Resolver + 'static>(resolver: R) -> Arc<Self> {
        let mut initializer = Initializer::new();
        initializer.set_resolver(resolver);
        Self::initialize(initializer)
    }

    /// Creates a new [`State`] with no loaded modules and a resolver that never finds any module.
    #[inline]
    pub fn new() -> Arc<Self> {
        Self::initialize(Initializer::new())
    }

    pub fn module_extension(&self) -> &str {
        &self.module_extension
    }

    /// Resolves a reference against the base location of the anchor, and loads the symbol it designates.
    ///
    /// Returns [`Resolution::Ready`] when the symbol was already loaded. Otherwise, the returned [`Deferred`] is shared
    /// with every other caller resolving the same symbol until the load settles.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference cannot be resolved to an absolute locator, in which case the cache is not
    /// touched. Errors that occur while loading are reported through the [`Deferred`].
    ///
    /// # Examples
    ///
    /// ```
    /// use qrl::Document;
    /// use qrl_load::module::Exports;
    /// use qrl_load::{resolver, State};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let state = State::with_resolver(resolver::from_fn(|_| async {
    ///     Ok::<_, std::io::Error>(Some(Exports::new().with("onClick", 5u8)))
    /// }));
    ///
    /// let document = Document::parse("https://site.test/app/")?;
    /// let value = state.resolve(&document, "./widgets/button.onClick")?.await?;
    /// assert_eq!(value.downcast_ref::<u8>(), Some(&5));
    /// assert!(state.resolve(&document, "widgets/button.onClick")?.is_ready());
    /// # Ok(())
    /// # }
    /// ```
    pub fn resolve<'r, A, R>(self: &Arc<Self>, anchor: &A, reference: R) -> Result<Resolution, LocatorError>
    where
        A: Anchor + ?Sized,
        R: Into<Reference<'r>>,
    {
        Ok(self.resolve_reference(SymbolReference::resolve(anchor, reference)?))
    }

    /// Loads the symbol designated by an already resolved reference.
    pub fn resolve_reference(self: &Arc<Self>, reference: SymbolReference) -> Resolution {
        let key = reference.into_parts();
        let mut caches = self.caches.lock();

        match caches.symbols.get(&key) {
            Some(Slot::Resolved(value)) => {
                Counters::increment(&self.counters.hits);
                tracing::trace!(module = %key.0, symbol = %key.1, "symbol cache hit");
                return Resolution::Ready(value.clone());
            }
            Some(Slot::Pending { load, .. }) => {
                Counters::increment(&self.counters.joins);
                tracing::trace!(module = %key.0, symbol = %key.1, "joining pending symbol load");
                return Resolution::Pending(Deferred { load: load.clone() });
            }
            None => (),
        }

        Counters::increment(&self.counters.misses);

        let (module_generation, module) = match self.module_load(&mut caches, &key.0) {
            ModuleLoad::Loaded(module) => {
                // The module is already loaded, so the symbol can be extracted without waiting.
                return match module.symbol(&key.1) {
                    Ok(value) => {
                        tracing::debug!(module = %key.0, symbol = %key.1, "extracted symbol from loaded module");
                        caches.symbols.insert(key, Slot::Resolved(value.clone()));
                        Resolution::Ready(value)
                    }
                    Err(error) => {
                        Counters::increment(&self.counters.failures);
                        tracing::warn!(module = %key.0, symbol = %key.1, "module does not export symbol");
                        Resolution::Pending(Deferred::settled(Err(error.into())))
                    }
                };
            }
            ModuleLoad::Pending { generation, load } => (generation, load),
        };

        let generation = self.next_generation();
        let state = Arc::downgrade(self);
        let pending_key = key.clone();
        let load = async move {
            let result = module
                .await
                .and_then(|module| module.symbol(&pending_key.1).map_err(LoadError::from));

            if let Some(state) = Weak::upgrade(&state) {
                state.settle_symbol(&pending_key, generation, &result);
            }

            result
        }
        .boxed()
        .shared();

        tracing::debug!(module = %key.0, symbol = %key.1, "symbol cache miss");
        caches.symbols.insert(
            key,
            Slot::Pending {
                generation,
                module_generation,
                load: load.clone(),
            },
        );

        Resolution::Pending(Deferred { load })
    }

    /// Starts loading the module that a reference designates without extracting any symbol, or joins a load that was
    /// already started.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference cannot be resolved to an absolute locator.
    pub fn preload<'r, A, R>(self: &Arc<Self>, anchor: &A, reference: R) -> Result<Deferred<Arc<Module>>, LocatorError>
    where
        A: Anchor + ?Sized,
        R: Into<Reference<'r>>,
    {
        let (path, _) = SymbolReference::resolve(anchor, reference)?.into_parts();
        let mut caches = self.caches.lock();
        Ok(match self.module_load(&mut caches, &path) {
            ModuleLoad::Loaded(module) => Deferred::settled(Ok(module)),
            ModuleLoad::Pending { load, .. } => Deferred { load },
        })
    }

    /// Gets a symbol only if it was already loaded, never starting a new load.
    pub fn cached<'r, A, R>(&self, anchor: &A, reference: R) -> Result<Option<Value>, LocatorError>
    where
        A: Anchor + ?Sized,
        R: Into<Reference<'r>>,
    {
        let key = SymbolReference::resolve(anchor, reference)?.into_parts();
        Ok(match self.caches.lock().symbols.get(&key) {
            Some(Slot::Resolved(value)) => Some(value.clone()),
            _ => None,
        })
    }

    /// Removes a module and all of its symbols from the cache, so that the next resolution loads the module again.
    ///
    /// Loads of the module that are still pending complete for the callers already waiting on them, but their results are
    /// not cached. Returns `true` if anything was removed.
    pub fn invalidate(&self, module: &ModulePath) -> bool {
        let mut caches = self.caches.lock();
        let mut removed = caches.modules.remove(module).is_some();
        let count = caches.symbols.len();
        caches.symbols.retain(|(path, _), _| path != module);
        removed |= caches.symbols.len() != count;

        if removed {
            tracing::debug!(%module, "invalidated module");
        }

        removed
    }

    /// Removes every module and symbol from the cache.
    pub fn clear(&self) {
        let mut caches = self.caches.lock();
        caches.symbols.clear();
        caches.modules.clear();
        tracing::debug!("cleared loader cache");
    }

    pub fn statistics(&self) -> Statistics {
        self.counters.snapshot()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Gets the loaded module or the pending load of a module, starting a new load if neither exists.
    ///
    /// Must be called with the cache lock held, which makes the lookup and the insertion of the pending load atomic.
    fn module_load(self: &Arc<Self>, caches: &mut Caches, path: &ModulePath) -> ModuleLoad {
        let vacant = match caches.modules.entry(path.clone()) {
            hash_map::Entry::Occupied(occupied) => {
                return match occupied.get() {
                    Slot::Resolved(module) => ModuleLoad::Loaded(module.clone()),
                    Slot::Pending { generation, load, .. } => ModuleLoad::Pending {
                        generation: *generation,
                        load: load.clone(),
                    },
                }
            }
            hash_map::Entry::Vacant(vacant) => vacant,
        };

        let specifier = path.specifier(&self.module_extension);
        let generation = self.next_generation();
        let resolver = self.resolver.clone();
        let state = Arc::downgrade(self);
        let path = path.clone();

        Counters::increment(&self.counters.loads);
        tracing::debug!(%specifier, "loading module");

        let load = async move {
            let loaded = resolver.load_module(&specifier).await;
            let result = match loaded {
                Ok(Some(exports)) => Ok(Arc::new(Module::new(path.clone(), specifier, exports))),
                Ok(None) => Err(LoadError::ModuleNotFound(specifier)),
                Err(source) => Err(LoadError::Retrieval { specifier, source }),
            };

            if let Some(state) = Weak::upgrade(&state) {
                state.settle_module(&path, generation, &result);
            }

            result
        }
        .boxed()
        .shared();

        vacant.insert(Slot::Pending {
            generation,
            module_generation: generation,
            load: load.clone(),
        });

        ModuleLoad::Pending { generation, load }
    }

    fn settle_module(&self, path: &ModulePath, generation: u64, result: &Result<Arc<Module>, LoadError>) {
        let mut caches = self.caches.lock();
        let settled = settle(&mut caches.modules, path, generation, result);

        // Pending symbols of a failed load are dropped, even those never polled, so that the next resolution retries.
        let mut abandoned = 0usize;
        if result.is_err() {
            caches.symbols.retain(|(symbol_path, _), slot| {
                let waiting = symbol_path == path
                    && matches!(slot, Slot::Pending { module_generation, .. } if *module_generation == generation);
                abandoned += usize::from(waiting);
                !waiting
            });
        }

        drop(caches);

        if !settled {
            tracing::trace!(module = %path, "module load settled after invalidation");
            return;
        }

        match result {
            Ok(module) => {
                tracing::debug!(specifier = %module.specifier(), exports = module.exports().len(), "loaded module");
            }
            Err(error) => {
                Counters::increment(&self.counters.failures);
                tracing::warn!(module = %path, %error, abandoned, "failed to load module");
            }
        }
    }

    fn settle_symbol(&self, key: &SymbolKey, generation: u64, result: &Result<Value, LoadError>) {
        let settled = settle(&mut self.caches.lock().symbols, key, generation, result);
        if !settled {
            tracing::trace!(module = %key.0, symbol = %key.1, "symbol load settled after its slot was removed");
            return;
        }

        if let Err(LoadError::SymbolNotFound(_)) = result {
            Counters::increment(&self.counters.failures);
            tracing::warn!(module = %key.0, symbol = %key.1, "module does not export symbol");
        }
    }
}

impl Debug for State {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let caches = self.caches.lock();
        f.debug_struct("State")
            .field("module_extension", &self.module_extension)
            .field("modules", &caches.modules.keys().collect::<Vec<_>>())
            .field("symbols", &caches.symbols.len())
            .finish()
    }
}
