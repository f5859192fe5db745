//! Function name interning.
//!
//! Hooks see a function name on every call. Interning it once turns every
//! later stack and edge operation into integer work, so the hot path only
//! allocates the first time a function shows up.

use std::collections::HashMap;
use std::rc::Rc;

/// Dense identifier of an interned function name
pub type FunctionId = u32;

#[derive(Debug, Clone, Default)]
pub struct FunctionNames {
    ids: HashMap<Rc<str>, FunctionId>,
    names: Vec<Rc<str>>,
}

impl FunctionNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier for `name`, assigning the next one on first sight
    pub fn intern(&mut self, name: &str) -> FunctionId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }

        let id = self.names.len() as FunctionId;
        let name: Rc<str> = Rc::from(name);
        self.names.push(Rc::clone(&name));
        self.ids.insert(name, id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<FunctionId> {
        self.ids.get(name).copied()
    }

    /// Name behind `id`
    ///
    /// Identifiers only come from `intern`, so an unknown one is a bug in
    /// the caller; it resolves to an empty name rather than panicking.
    pub fn name(&self, id: FunctionId) -> &str {
        self.names.get(id as usize).map(|n| &**n).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.names.clear();
    }
}
