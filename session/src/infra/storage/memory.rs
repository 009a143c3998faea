//! In-memory [`Storage`] implementation.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use tracerr::Traced;

use super::{Change, Error, Storage};

/// [`Storage`] keeping its entries in memory only.
///
/// Clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct Memory(Rc<RefCell<HashMap<String, String>>>);

impl Memory {
    /// Creates a new empty [`Memory`] storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new [`Memory`] storage pre-filled with the provided entries.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(Rc::new(RefCell::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )))
    }
}

impl Storage for Memory {
    fn get(&self, key: &str) -> Result<Option<String>, Traced<Error>> {
        Ok(self.0.borrow().get(key).cloned())
    }

    fn apply(&self, changes: &[Change<'_>]) -> Result<(), Traced<Error>> {
        let mut entries = self.0.borrow_mut();
        for change in changes {
            match *change {
                Change::Set(key, value) => {
                    drop(entries.insert(key.to_owned(), value.to_owned()));
                }
                Change::Remove(key) => drop(entries.remove(key)),
            }
        }
        Ok(())
    }
}
