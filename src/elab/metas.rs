use std::fmt;

use super::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Meta(u32);
impl Meta {
    pub fn new(i: u32) -> Meta {
        Meta(i)
    }

    pub fn num(self) -> u32 {
        self.0
    }
}
impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub enum MetaEntry {
    Unsolved,
    Solved(Val),
}

/// A unification problem that was put off until a meta is solved
#[derive(Clone, Debug)]
pub struct Problem {
    pub size: Size,
    pub lhs: Val,
    pub rhs: Val,
}

#[derive(Clone, Debug, Default)]
struct MetaState {
    metas: im::OrdMap<Meta, MetaEntry>,
    postponed: im::OrdMap<Meta, im::Vector<Problem>>,
}

/// The meta store. Snapshots are cheap since both maps are persistent.
///
/// The id counter isn't part of the snapshot, so ids allocated in a transaction that gets rolled back are never handed out again.
#[derive(Debug, Default)]
pub struct MetaCxt {
    state: MetaState,
    stack: Vec<MetaState>,
    next: u32,
}
impl MetaCxt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_meta(&mut self) -> Meta {
        let m = Meta(self.next);
        self.next += 1;
        self.state.metas.insert(m, MetaEntry::Unsolved);
        m
    }

    pub fn get(&self, m: Meta) -> Result<&MetaEntry, ElabError> {
        self.state
            .metas
            .get(&m)
            .ok_or_else(|| ElabError::Internal(format!("meta {} was never allocated", m)))
    }

    /// The solution of `m`, if it's solved
    pub fn lookup(&self, m: Meta) -> Option<Val> {
        match self.state.metas.get(&m) {
            Some(MetaEntry::Solved(v)) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn is_solved(&self, m: Meta) -> bool {
        self.lookup(m).is_some()
    }

    pub fn set(&mut self, m: Meta, v: Val) -> Result<(), ElabError> {
        if let MetaEntry::Solved(_) = self.get(m)? {
            return Err(ElabError::Internal(format!("meta {} solved twice", m)));
        }
        self.state.metas.insert(m, MetaEntry::Solved(v));
        Ok(())
    }

    pub fn postpone(&mut self, m: Meta, problem: Problem) {
        tracing::debug!(meta = %m, size = problem.size.as_u32(), "postpone");
        self.state
            .postponed
            .entry(m)
            .or_insert_with(im::Vector::new)
            .push_back(problem);
    }

    /// Removes and returns the problems waiting on `m`
    pub fn take_postponed(&mut self, m: Meta) -> im::Vector<Problem> {
        self.state.postponed.remove(&m).unwrap_or_default()
    }

    pub fn postponed_metas(&self) -> Vec<Meta> {
        self.state.postponed.keys().copied().collect()
    }

    pub fn has_postponed(&self) -> bool {
        !self.state.postponed.is_empty()
    }

    pub fn unsolved(&self) -> Vec<Meta> {
        self.state
            .metas
            .iter()
            .filter(|(_, e)| matches!(e, MetaEntry::Unsolved))
            .map(|(m, _)| *m)
            .collect()
    }

    /// Saves the current state so it can be restored by `pop()`
    pub fn push(&mut self) {
        self.stack.push(self.state.clone());
    }

    /// Restores the state from the matching `push()`
    pub fn pop(&mut self) {
        match self.stack.pop() {
            Some(state) => self.state = state,
            None => unreachable!("MetaCxt::pop() without a matching push()"),
        }
    }

    /// Forgets the state from the matching `push()`, keeping everything done since
    pub fn discard(&mut self) {
        if self.stack.pop().is_none() {
            unreachable!("MetaCxt::discard() without a matching push()")
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Forgets all metas, for starting a new top-level elaboration. Ids keep counting up.
    pub fn reset(&mut self) {
        self.state = MetaState::default();
        self.stack.clear();
    }

    /// The observable state: every meta with its (closed) solution, and how many problems wait on each meta
    pub fn observe(&self) -> (Vec<(Meta, Option<Term>)>, Vec<(Meta, usize)>) {
        let metas = self
            .state
            .metas
            .iter()
            .map(|(m, e)| match e {
                MetaEntry::Unsolved => (*m, None),
                MetaEntry::Solved(v) => (*m, Some(v.clone().quote(Size::zero(), false, self))),
            })
            .collect();
        let postponed = self
            .state
            .postponed
            .iter()
            .map(|(m, ps)| (*m, ps.len()))
            .collect();
        (metas, postponed)
    }
}
