use super::{globals::GlobalEnv, val::Val};

// De Brujin indices and levels
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Idx(u32);
impl Idx {
    pub fn new(i: u32) -> Idx {
        Idx(i)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn zero() -> Idx {
        Idx(0)
    }

    pub fn lvl(self, size: Size) -> Lvl {
        assert!(
            self.0 + 1 <= size.0,
            "Can't access a variable (idx {}) that hasn't been bound yet (enclosing = {})!",
            self.0,
            size.0,
        );
        Lvl(size.0 - 1 - self.0)
    }

    pub fn in_scope(self, size: Size) -> bool {
        self.0 + 1 <= size.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lvl(u32);
impl Lvl {
    pub fn new(l: u32) -> Lvl {
        Lvl(l)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn idx(self, size: Size) -> Idx {
        assert!(
            self.0 + 1 <= size.0,
            "Can't access a variable (lvl {}) that hasn't been bound yet (enclosing = {})!",
            self.0,
            size.0,
        );
        Idx(size.0 - 1 - self.0)
    }

    pub fn in_scope(self, size: Size) -> bool {
        self.0 + 1 <= size.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Size(u32);
impl Size {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn zero() -> Size {
        Size(0)
    }

    pub fn next_lvl(self) -> Lvl {
        Lvl(self.0)
    }

    pub fn inc(self) -> Size {
        Size(self.0 + 1)
    }
}
impl std::ops::Add<usize> for Size {
    type Output = Self;

    fn add(self, rhs: usize) -> Self::Output {
        Size(self.0 + rhs as u32)
    }
}
impl std::ops::AddAssign<usize> for Size {
    fn add_assign(&mut self, rhs: usize) {
        *self = *self + rhs;
    }
}

/// An evaluation environment: values for the local variables in scope, stored by level, plus the globals that were visible when it was created.
/// Both halves are persistent structures, so closures can capture an `Env` by cloning it.
#[derive(Clone, Debug, Default)]
pub struct Env {
    vals: im::Vector<Val>,
    pub globals: GlobalEnv,
}
impl Env {
    pub fn new(globals: GlobalEnv) -> Self {
        Env {
            vals: im::Vector::new(),
            globals,
        }
    }

    pub fn size(&self) -> Size {
        Size(self.vals.len() as u32)
    }

    pub fn get(&self, i: Idx) -> Option<&Val> {
        if i.in_scope(self.size()) {
            self.vals.get(i.lvl(self.size()).0 as usize)
        } else {
            None
        }
    }

    pub fn push(&mut self, v: Val) {
        self.vals.push_back(v);
    }

    /// A copy of this environment extended with one more value
    pub fn with(&self, v: Val) -> Env {
        let mut env = self.clone();
        env.push(v);
        env
    }

    /// The values in the environment, outermost first
    pub fn vals(&self) -> impl Iterator<Item = &Val> + '_ {
        self.vals.iter()
    }
}
impl Extend<Val> for Env {
    fn extend<T: IntoIterator<Item = Val>>(&mut self, iter: T) {
        for i in iter {
            self.push(i);
        }
    }
}
