use std::fmt;

use super::*;

#[derive(Clone, Debug)]
pub struct GlobalEntry {
    pub term: Term,
    pub val: Rc<Val>,
    pub ty: Val,
    pub erased: bool,
    /// Only present if the definition was verified
    pub erased_term: Option<Erased>,
}

/// Top-level definitions by name. Cheap to clone, since every `Env` carries a snapshot.
#[derive(Clone, Default)]
pub struct GlobalEnv {
    map: im::HashMap<Name, Rc<GlobalEntry>>,
    order: im::Vector<Name>,
}
impl GlobalEnv {
    pub fn get(&self, n: &Name) -> Option<&Rc<GlobalEntry>> {
        self.map.get(n)
    }

    pub fn contains(&self, n: &Name) -> bool {
        self.map.contains_key(n)
    }

    /// Adds a definition, moving it to the end if it replaces an old one
    pub fn insert(&mut self, n: Name, entry: GlobalEntry) {
        if self.map.insert(n.clone(), Rc::new(entry)).is_some() {
            self.order.retain(|m| *m != n);
        }
        self.order.push_back(n);
    }

    pub fn remove(&mut self, n: &Name) -> Option<Rc<GlobalEntry>> {
        let entry = self.map.remove(n)?;
        self.order.retain(|m| m != n);
        Some(entry)
    }

    /// Definitions in the order they were added
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&Name, &Rc<GlobalEntry>)> + '_ {
        self.order.iter().filter_map(move |n| Some((n, self.map.get(n)?)))
    }

    /// Other definitions whose body or type refers to `n`
    pub fn dependents(&self, n: &Name) -> Vec<Name> {
        self.iter()
            .filter(|(m, e)| *m != n && e.term.uses_global(n))
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
impl fmt::Debug for GlobalEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.order.iter()).finish()
    }
}
