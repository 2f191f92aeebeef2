//! Resolution of references against the base location of a document.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use url::Url;

pub use url::ParseError;

/// Trait for contexts that supply the base location used to make relative references absolute.
///
/// Implementors must return the same location every time, otherwise equivalent references could resolve to different
/// symbols.
pub trait Anchor {
    fn base_location(&self) -> &Url;
}

impl Anchor for Url {
    #[inline]
    fn base_location(&self) -> &Url {
        self
    }
}

impl<A: Anchor + ?Sized> Anchor for &A {
    #[inline]
    fn base_location(&self) -> &Url {
        A::base_location(self)
    }
}

impl<A: Anchor + ?Sized> Anchor for Box<A> {
    #[inline]
    fn base_location(&self) -> &Url {
        A::base_location(self)
    }
}

impl<A: Anchor + ?Sized> Anchor for Arc<A> {
    #[inline]
    fn base_location(&self) -> &Url {
        A::base_location(self)
    }
}

/// A document whose base location anchors the references found inside of it.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Document {
    base: Url,
}

impl Document {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// Parses the base location of a document, which must be an absolute locator.
    pub fn parse(base: &str) -> Result<Self, LocatorError> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            return Err(LocatorError::CannotBeABase(base));
        }
        Ok(Self::new(base))
    }
}

impl Anchor for Document {
    #[inline]
    fn base_location(&self) -> &Url {
        &self.base
    }
}

/// A reference to a symbol, either as it appears in serialized form or already parsed into an absolute locator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reference<'a> {
    Text(&'a str),
    Url(Url),
}

impl<'a> From<&'a str> for Reference<'a> {
    fn from(reference: &'a str) -> Self {
        Self::Text(reference)
    }
}

impl<'a> From<&'a String> for Reference<'a> {
    fn from(reference: &'a String) -> Self {
        Self::Text(reference.as_str())
    }
}

impl From<Url> for Reference<'_> {
    fn from(locator: Url) -> Self {
        Self::Url(locator)
    }
}

impl<'a> From<&'a Url> for Reference<'a> {
    fn from(locator: &'a Url) -> Self {
        Self::Url(locator.clone())
    }
}

impl Display for Reference<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Url(locator) => Display::fmt(locator, f),
        }
    }
}

/// The error type used when a reference cannot be turned into an absolute locator.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum LocatorError {
    #[error("references cannot be empty")]
    Empty,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{0} does not have a hierarchical path")]
    CannotBeABase(Url),
}

/// Resolves a reference against the base location of the anchor, following standard URL resolution rules.
///
/// # Examples
///
/// ```
/// use qrl::locator::{self, Document};
///
/// let document = Document::parse("https://site.test/app/")?;
/// let locator = locator::resolve(&document, "../lib/./util.format?v=2")?;
/// assert_eq!(locator.as_str(), "https://site.test/lib/util.format?v=2");
///
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
pub fn resolve<'r, A, R>(anchor: &A, reference: R) -> Result<Url, LocatorError>
where
    A: Anchor + ?Sized,
    R: Into<Reference<'r>>,
{
    let reference: Reference = reference.into();
    let locator = match reference {
        Reference::Text("") => return Err(LocatorError::Empty),
        Reference::Text(text) => anchor.base_location().join(text)?,
        Reference::Url(locator) => locator,
    };

    if locator.cannot_be_a_base() {
        Err(LocatorError::CannotBeABase(locator))
    } else {
        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Document {
        Document::parse("https://site.test/app/").unwrap()
    }

    #[test]
    fn relative_references_use_base() {
        assert_eq!(
            resolve(&document(), "./widgets/button").unwrap().as_str(),
            "https://site.test/app/widgets/button"
        );
        assert_eq!(
            resolve(&document(), "//cdn.test/lib/x.y").unwrap().as_str(),
            "https://cdn.test/lib/x.y"
        );
    }

    #[test]
    fn absolute_locators_are_kept() {
        let locator = Url::parse("https://other.test/a/b.c").unwrap();
        assert_eq!(resolve(&document(), &locator).unwrap(), locator);
    }

    #[test]
    fn empty_reference_is_rejected() {
        assert_eq!(resolve(&document(), ""), Err(LocatorError::Empty));
    }

    #[test]
    fn malformed_reference_is_rejected() {
        assert!(matches!(
            resolve(&document(), "https://exa mple.test/"),
            Err(LocatorError::Parse(_))
        ));
        assert!(matches!(
            resolve(&document(), "mailto:someone@site.test"),
            Err(LocatorError::CannotBeABase(_))
        ));
    }

    #[test]
    fn document_base_must_be_hierarchical() {
        assert!(matches!(Document::parse("data:text/plain,hello"), Err(LocatorError::CannotBeABase(_))));
        assert!(matches!(Document::parse("widgets/button"), Err(LocatorError::Parse(_))));
    }
}
