//! Module for interacting with loaded modules and the values that they export.

use crate::error::SymbolNotFoundError;
use qrl::{Id, Identifier, ModulePath, ModuleSpecifier};
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A value exported by a module, such as a function, an object, or a primitive.
///
/// The shape of the value is opaque to the loader, callers recover it with [`downcast_ref`].
///
/// [`downcast_ref`]: Value::downcast_ref
#[derive(Clone)]
#[repr(transparent)]
pub struct Value(Arc<dyn Any + Send + Sync>);

impl Value {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    pub fn downcast<T: Any + Send + Sync>(self) -> Result<Arc<T>, Self> {
        self.0.downcast().map_err(Self)
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Returns `true` if both values refer to the same exported object.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Value({:p})", Arc::as_ptr(&self.0))
    }
}

type Lookup = rustc_hash::FxHashMap<Identifier, Value>;

/// The set of values exported by a module, keyed by export name.
#[derive(Clone, Default)]
pub struct Exports {
    symbols: Lookup,
}

impl Exports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an export, returning the value previously exported under the same name.
    pub fn insert(&mut self, name: Identifier, value: Value) -> Option<Value> {
        self.symbols.insert(name, value)
    }

    /// Adds an export, consuming and returning the export set.
    ///
    /// # Panics
    ///
    /// Panics if the name is not a valid symbol name.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, name: &str, value: T) -> Self {
        let name = Identifier::try_from(name).unwrap_or_else(|e| panic!("invalid export name {:?}: {}", name, e));
        self.symbols.insert(name, Value::new(value));
        self
    }

    pub fn get(&self, name: &Id) -> Option<&Value> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &Id) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &Identifier> {
        self.symbols.keys()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl FromIterator<(Identifier, Value)> for Exports {
    fn from_iter<I: IntoIterator<Item = (Identifier, Value)>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().collect(),
        }
    }
}

impl Extend<(Identifier, Value)> for Exports {
    fn extend<I: IntoIterator<Item = (Identifier, Value)>>(&mut self, iter: I) {
        self.symbols.extend(iter)
    }
}

impl Debug for Exports {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let mut names = self.symbols.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_set().entries(names).finish()
    }
}

/// A module that was successfully loaded by a [`Resolver`].
///
/// [`Resolver`]: crate::Resolver
pub struct Module {
    path: ModulePath,
    specifier: ModuleSpecifier,
    exports: Exports,
}

impl Module {
    pub(crate) fn new(path: ModulePath, specifier: ModuleSpecifier, exports: Exports) -> Self {
        Self {
            path,
            specifier,
            exports,
        }
    }

    pub fn path(&self) -> &ModulePath {
        &self.path
    }

    pub fn specifier(&self) -> &ModuleSpecifier {
        &self.specifier
    }

    pub fn exports(&self) -> &Exports {
        &self.exports
    }

    /// Extracts an exported value, returning an error if the module does not export a symbol with the specified name.
    pub fn symbol(&self, name: &Id) -> Result<Value, SymbolNotFoundError> {
        self.exports
            .get(name)
            .cloned()
            .ok_or_else(|| SymbolNotFoundError::new(self.path.clone(), name.to_owned()))
    }
}

impl Debug for Module {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("path", &self.path)
            .field("specifier", &self.specifier)
            .field("exports", &self.exports)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_downcast_to_their_type() {
        let value = Value::new(42u32);
        assert_eq!(value.downcast_ref::<u32>(), Some(&42));
        assert!(value.downcast_ref::<i64>().is_none());
        assert!(Value::ptr_eq(&value, &value.clone()));
    }

    #[test]
    fn exports_are_looked_up_by_name() {
        let exports = Exports::new().with("default", "Button").with("onClick", 7i32);
        assert_eq!(exports.len(), 2);
        assert_eq!(exports.get(Id::DEFAULT).and_then(Value::downcast_ref::<&str>), Some(&"Button"));
        assert!(exports.contains(Id::try_from_str("onClick").unwrap()));
        assert!(exports.get(Id::try_from_str("onHover").unwrap()).is_none());
    }
}
