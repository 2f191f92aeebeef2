//! Splitting of absolute locators into the module that is loaded and the symbol that is extracted from it.

use crate::identifier::{Id, Identifier};
use crate::locator::{self, Anchor, LocatorError, Reference};
use std::fmt::{Debug, Display, Formatter};
use url::Url;

/// Splits the path of a locator into a module path and an optional symbol suffix.
///
/// The symbol suffix is the text after the last `.`, but only when that `.` belongs to the final path segment and is not
/// its first character.
///
/// # Examples
///
/// ```
/// use qrl::reference::split_path;
///
/// assert_eq!(split_path("/app/widgets/button.onClick"), ("/app/widgets/button", Some("onClick")));
/// assert_eq!(split_path("/app/v1.2/widgets/button"), ("/app/v1.2/widgets/button", None));
/// assert_eq!(split_path("/app/.config"), ("/app/.config", None));
/// ```
pub fn split_path(path: &str) -> (&str, Option<&str>) {
    let slash = path.rfind('/');
    match path.rfind('.') {
        Some(dot) if dot != 0 && slash.map_or(true, |slash| dot > slash + 1) => (&path[..dot], Some(&path[dot + 1..])),
        _ => (path, None),
    }
}

/// An absolute locator identifying a module, without any query, fragment, or symbol suffix.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct ModulePath(Url);

impl ModulePath {
    #[inline]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Gets the locator of the file containing the module, formed by appending the module format's extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use qrl::locator::Document;
    /// use qrl::SymbolReference;
    ///
    /// let document = Document::parse("https://site.test/app/")?;
    /// let reference = SymbolReference::resolve(&document, "./widgets/button.onClick#ignored")?;
    /// assert_eq!(reference.module().specifier(".js").as_str(), "https://site.test/app/widgets/button.js");
    ///
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn specifier(&self, extension: &str) -> ModuleSpecifier {
        let mut locator = self.0.clone();
        let path = format!("{}{}", self.0.path(), extension);
        locator.set_path(&path);
        ModuleSpecifier(locator)
    }
}

/// The locator of a loadable module file.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct ModuleSpecifier(Url);

impl ModuleSpecifier {
    #[inline]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

macro_rules! locator_format_impls {
    ($implementor: ident) => {
        impl Debug for $implementor {
            fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
                Debug::fmt(self.0.as_str(), f)
            }
        }

        impl Display for $implementor {
            fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
                Display::fmt(&self.0, f)
            }
        }
    };
}

locator_format_impls!(ModulePath);
locator_format_impls!(ModuleSpecifier);

/// Identifies a symbol by the module that exports it and the name of the export.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct SymbolReference {
    module: ModulePath,
    symbol: Identifier,
}

impl SymbolReference {
    pub fn new(module: ModulePath, symbol: Identifier) -> Self {
        Self { module, symbol }
    }

    /// Interprets the path of an absolute locator, ignoring its query and fragment.
    pub fn from_locator(locator: &Url) -> Result<Self, LocatorError> {
        if locator.cannot_be_a_base() {
            return Err(LocatorError::CannotBeABase(locator.clone()));
        }

        let (module, suffix) = split_path(locator.path());
        let symbol = suffix.map_or_else(Identifier::default_export, Identifier::from_path_suffix);

        let mut module_locator = locator.clone();
        module_locator.set_query(None);
        module_locator.set_fragment(None);
        module_locator.set_path(module);

        Ok(Self::new(ModulePath(module_locator), symbol))
    }

    /// Resolves a reference against the base location of the anchor, then splits off the symbol name.
    ///
    /// # Examples
    ///
    /// ```
    /// use qrl::locator::Document;
    /// use qrl::SymbolReference;
    ///
    /// let document = Document::parse("https://site.test/app/")?;
    /// let reference = SymbolReference::resolve(&document, "./widgets/button")?;
    /// assert_eq!(reference.module().as_str(), "https://site.test/app/widgets/button");
    /// assert_eq!(reference.symbol().as_str(), "default");
    ///
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn resolve<'r, A, R>(anchor: &A, reference: R) -> Result<Self, LocatorError>
    where
        A: Anchor + ?Sized,
        R: Into<Reference<'r>>,
    {
        Self::from_locator(&locator::resolve(anchor, reference)?)
    }

    #[inline]
    pub fn module(&self) -> &ModulePath {
        &self.module
    }

    #[inline]
    pub fn symbol(&self) -> &Id {
        &self.symbol
    }

    pub fn into_parts(self) -> (ModulePath, Identifier) {
        (self.module, self.symbol)
    }
}

impl Debug for SymbolReference {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("SymbolReference")
            .field("module", &self.module)
            .field("symbol", &self.symbol)
            .finish()
    }
}

impl Display for SymbolReference {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        Display::fmt(&self.module, f)?;
        if !self.symbol.is_default() {
            write!(f, ".{}", self.symbol)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Document;

    fn resolve(reference: &str) -> SymbolReference {
        let document = Document::parse("https://site.test/app/").unwrap();
        SymbolReference::resolve(&document, reference).unwrap()
    }

    #[test]
    fn path_without_suffix_uses_default_export() {
        let reference = resolve("./widgets/button");
        assert_eq!(reference.module().as_str(), "https://site.test/app/widgets/button");
        assert!(reference.symbol().is_default());
    }

    #[test]
    fn suffix_names_the_symbol() {
        let reference = resolve("./widgets/button.onClick");
        assert_eq!(reference.module().as_str(), "https://site.test/app/widgets/button");
        assert_eq!(reference.symbol(), "onClick");
    }

    #[test]
    fn dot_in_directory_is_not_a_suffix() {
        let reference = resolve("./v1.2/widgets/button");
        assert_eq!(reference.module().as_str(), "https://site.test/app/v1.2/widgets/button");
        assert!(reference.symbol().is_default());
    }

    #[test]
    fn leading_dot_is_not_a_suffix() {
        assert_eq!(split_path(".config"), (".config", None));
        let reference = resolve(".config");
        assert_eq!(reference.module().as_str(), "https://site.test/app/.config");
        assert!(reference.symbol().is_default());
    }

    #[test]
    fn empty_suffix_uses_default_export() {
        let reference = resolve("./widgets/button.");
        assert_eq!(reference.module().as_str(), "https://site.test/app/widgets/button");
        assert!(reference.symbol().is_default());
    }

    #[test]
    fn suffix_is_always_a_valid_symbol() {
        let reference = resolve("./widgets/button.on\0Click");
        assert_eq!(reference.symbol(), "on%00Click");
        assert_eq!(reference.module().as_str(), "https://site.test/app/widgets/button");

        let reference = resolve("./widgets/button.on%2FClick");
        assert_eq!(reference.symbol(), "on%2FClick");
    }

    #[test]
    fn only_last_dot_starts_the_suffix() {
        let reference = resolve("./chunk.a1b2.handler");
        assert_eq!(reference.module().as_str(), "https://site.test/app/chunk.a1b2");
        assert_eq!(reference.symbol(), "handler");
    }

    #[test]
    fn query_and_fragment_are_ignored() {
        assert_eq!(resolve("./widgets/button.onClick?v=3#top"), resolve("widgets/../widgets/button.onClick"));
    }

    #[test]
    fn equivalent_spellings_are_equal() {
        assert_eq!(resolve("./widgets/button"), resolve("/app/widgets/./button"));
        assert_eq!(resolve("./widgets/button"), resolve("https://site.test/app/widgets/button.default"));
    }

    #[test]
    fn display_omits_default_symbol() {
        assert_eq!(resolve("./widgets/button").to_string(), "https://site.test/app/widgets/button");
        assert_eq!(
            resolve("./widgets/button.onClick").to_string(),
            "https://site.test/app/widgets/button.onClick"
        );
    }
}
