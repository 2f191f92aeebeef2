//! Contains types for describing lazily loaded symbols and the modules that export them.
//!
//! A symbol is referred to by a locator such as `./widgets/button.onClick`, which is resolved against the base
//! location of a document. The path of the resulting locator names both the module to load
//! (`https://site.test/app/widgets/button`) and the export to extract from it (`onClick`).

pub mod identifier;
pub mod locator;
pub mod reference;

pub use identifier::{Id, Identifier};
pub use locator::{Anchor, Document, LocatorError, Reference};
pub use reference::{ModulePath, ModuleSpecifier, SymbolReference};
pub use url::Url;
