use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity token for a bindable contract.
///
/// A key is the type identity of a contract, optionally disambiguated by a
/// qualifier so that several bindings of the same type can coexist. Two keys
/// are equal when both their type and their qualifier are equal; the type name
/// is carried only for diagnostics.
///
/// # Examples
///
/// ```rust
/// use keystone::Key;
///
/// struct Database;
///
/// assert_eq!(Key::of::<Database>(), Key::of::<Database>());
/// assert_ne!(Key::of::<Database>(), Key::named::<Database>("replica"));
/// ```
#[derive(Clone, Copy)]
pub struct Key {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<&'static str>,
}

impl Key {
    /// Returns the key of the contract type `T`.
    ///
    /// `T` may be unsized, which allows trait objects to serve as contracts.
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            qualifier: None,
        }
    }

    /// Returns the key of the contract type `T` disambiguated by `qualifier`.
    pub fn named<T>(qualifier: &'static str) -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            qualifier: Some(qualifier),
            ..Self::of::<T>()
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn qualifier(&self) -> Option<&'static str> {
        self.qualifier
    }

    /// Returns `true` if this key identifies the type `T`, ignoring the qualifier.
    pub fn is<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.qualifier == other.qualifier
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.qualifier.hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.qualifier {
            Some(qualifier) => write!(f, "{}@{qualifier}", self.type_name),
            None => f.write_str(self.type_name),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}
