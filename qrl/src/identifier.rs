//! Code for interacting with the names of exported symbols.

use std::borrow::Borrow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;

/// Represents the name of an exported symbol, which is a UTF-8 string that cannot be empty or contain any `null` bytes or
/// `/` path separators.
///
/// [`Id`] is to [`Identifier`] as [`str`] is to [`String`].
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Identifier(String);

/// Borrowed form of a symbol name.
#[derive(Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Id(str);

macro_rules! format_impls {
    ($implementor: ident) => {
        impl Debug for $implementor {
            fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
                Debug::fmt(&self.0, f)
            }
        }

        impl Display for $implementor {
            fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
                Display::fmt(&self.0, f)
            }
        }
    };
}

format_impls!(Identifier);
format_impls!(Id);

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidIdentifier {
    #[error("symbol names cannot be empty")]
    Empty,
    #[error("symbol names cannot contain null bytes")]
    ContainsNull,
    #[error("symbol names cannot contain path separators")]
    ContainsSlash,
}

fn validate(identifier: &str) -> Result<(), InvalidIdentifier> {
    if identifier.is_empty() {
        Err(InvalidIdentifier::Empty)
    } else if identifier.contains('\0') {
        Err(InvalidIdentifier::ContainsNull)
    } else if identifier.contains('/') {
        Err(InvalidIdentifier::ContainsSlash)
    } else {
        Ok(())
    }
}

impl Id {
    /// The name of the export used when a reference does not name a symbol.
    pub const DEFAULT: &'static Id = unsafe { std::mem::transmute::<&'static str, &'static Id>("default") };

    pub fn try_from_str(identifier: &str) -> Result<&Id, InvalidIdentifier> {
        validate(identifier)?;
        // Safety: Id is a transparent wrapper over str.
        Ok(unsafe { std::mem::transmute::<&str, &Id>(identifier) })
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        self == Self::DEFAULT
    }
}

impl Identifier {
    #[inline]
    pub fn as_id(&self) -> &Id {
        // Safety: the contents were validated on construction.
        unsafe { std::mem::transmute::<&str, &Id>(self.0.as_str()) }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Gets the name of the `default` export.
    pub fn default_export() -> Self {
        Self::from(Id::DEFAULT)
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Gets the symbol named by the text after the last `.` of a locator path, where an empty suffix names the
    /// `default` export.
    ///
    /// URL paths percent-encode null bytes, and a suffix taken from the final segment never contains a `/`.
    pub(crate) fn from_path_suffix(suffix: &str) -> Self {
        if suffix.is_empty() {
            return Self::default_export();
        }

        debug_assert_eq!(validate(suffix), Ok(()));
        Self(suffix.to_owned())
    }
}

impl Deref for Identifier {
    type Target = Id;

    fn deref(&self) -> &Id {
        self.as_id()
    }
}

impl Deref for Id {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<Id> for Identifier {
    fn borrow(&self) -> &Id {
        self.as_id()
    }
}

impl AsRef<Id> for Identifier {
    fn as_ref(&self) -> &Id {
        self.as_id()
    }
}

impl ToOwned for Id {
    type Owned = Identifier;

    fn to_owned(&self) -> Identifier {
        Identifier::from(self)
    }
}

impl From<&Id> for Identifier {
    fn from(identifier: &Id) -> Self {
        Self(identifier.0.to_string())
    }
}

impl<'a> TryFrom<&'a str> for &'a Id {
    type Error = InvalidIdentifier;

    fn try_from(identifier: &'a str) -> Result<&'a Id, InvalidIdentifier> {
        Id::try_from_str(identifier)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = InvalidIdentifier;

    fn try_from(identifier: &str) -> Result<Self, InvalidIdentifier> {
        Id::try_from_str(identifier).map(Self::from)
    }
}

impl TryFrom<String> for Identifier {
    type Error = InvalidIdentifier;

    fn try_from(identifier: String) -> Result<Self, InvalidIdentifier> {
        validate(&identifier)?;
        Ok(Self(identifier))
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        &self.0 == other
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
