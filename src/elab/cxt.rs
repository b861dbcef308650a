use super::*;

#[derive(Debug, Clone)]
pub struct Entry {
    pub name: Name,
    pub ty: Val,
    /// `false` for let-bound variables, which metas don't need to abstract over
    pub bound: bool,
    pub erased: bool,
    /// Binders inserted by the elaborator can't be referred to by name
    pub inserted: bool,
}

/// The local context. Extending it returns a new context and leaves the old one alone.
#[derive(Debug, Clone)]
pub struct Local {
    entries: im::Vector<Entry>,
    pub env: Env,
    /// Erased variables can only be used in types
    pub in_type: bool,
}
impl Local {
    pub fn new(globals: GlobalEnv) -> Self {
        Local {
            entries: im::Vector::new(),
            env: Env::new(globals),
            in_type: false,
        }
    }

    pub fn size(&self) -> Size {
        self.env.size()
    }

    fn extend(&self, entry: Entry, val: Val) -> Local {
        let mut l = self.clone();
        l.entries.push_back(entry);
        l.env.push(val);
        l
    }

    /// Binds a new variable
    pub fn bind(&self, name: Name, ty: Val, erased: bool, inserted: bool) -> Local {
        let v = Val::var(self.size().next_lvl());
        self.extend(
            Entry {
                name,
                ty,
                bound: true,
                erased,
                inserted,
            },
            v,
        )
    }

    /// Adds a variable with a known value, like a let binding
    pub fn define(&self, name: Name, ty: Val, erased: bool, val: Val) -> Local {
        self.extend(
            Entry {
                name,
                ty,
                bound: false,
                erased,
                inserted: false,
            },
            val,
        )
    }

    pub fn in_type(&self) -> Local {
        Local {
            in_type: true,
            ..self.clone()
        }
    }

    /// Names of all variables in scope, outermost first, for printing
    pub fn names(&self) -> im::Vector<Name> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = (Lvl, &Entry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(l, e)| (Lvl::new(l as u32), e))
    }

    /// Finds the innermost variable with this name, skipping inserted binders
    pub fn lookup(&self, name: &Name) -> Option<(Idx, &Entry)> {
        self.entries()
            .rev()
            .find(|(_, e)| !e.inserted && e.name == *name)
            .map(|(l, e)| (l.idx(self.size()), e))
    }

    /// A fresh meta applied to every bound variable in scope
    pub fn new_meta(&self, mcxt: &mut MetaCxt) -> Term {
        let m = mcxt.fresh_meta();
        let size = self.size();
        self.entries()
            .filter(|(_, e)| e.bound)
            .fold(Term::Meta(m), |t, (l, _)| t.app(Expl, Term::Var(l.idx(size))))
    }

    pub fn quote(&self, v: Val, mcxt: &MetaCxt) -> Term {
        v.quote(self.size(), false, mcxt)
    }

    pub fn show(&self, v: &Val, mcxt: &MetaCxt) -> String {
        v.pretty(&self.names(), mcxt).to_string(false)
    }

    /// A one-line dump of the context, for debug output
    pub fn dump(&self, mcxt: &MetaCxt) -> String {
        let mut names = im::Vector::new();
        let mut parts = Vec::new();
        for e in self.entries.iter() {
            let ty = e.ty.pretty(&names, mcxt).to_string(false);
            parts.push(format!(
                "{}{}{}{} : {}",
                if e.bound { "" } else { "d " },
                if e.erased { "0 " } else { "" },
                if e.inserted { "i " } else { "" },
                e.name,
                ty
            ));
            names.push_back(e.name.clone());
        }
        format!("[{}]{}", parts.join(", "), if self.in_type { " in type" } else { "" })
    }
}

/// A named hole, remembered for instance search and for reporting
#[derive(Debug, Clone)]
pub struct Hole {
    pub name: Name,
    /// The meta standing in for the hole, in `local`
    pub term: Term,
    pub ty: Val,
    pub local: Local,
    pub instance: bool,
}

/// State for elaborating one top-level term
pub struct Cxt<'a> {
    pub mcxt: &'a mut MetaCxt,
    pub globals: &'a GlobalEnv,
    pub config: &'a Config,
    pub holes: Vec<Hole>,
}
impl<'a> Cxt<'a> {
    pub fn new(mcxt: &'a mut MetaCxt, globals: &'a GlobalEnv, config: &'a Config) -> Self {
        Cxt {
            mcxt,
            globals,
            config,
            holes: Vec::new(),
        }
    }

    pub fn local(&self) -> Local {
        Local::new(self.globals.clone())
    }

    pub fn unify(&mut self, size: Size, a: Val, b: Val) -> Result<(), ElabError> {
        UnifyCxt::new(self.mcxt, self.globals).unify(size, a, b)
    }

    pub fn retry_all(&mut self) -> Result<(), ElabError> {
        UnifyCxt::new(self.mcxt, self.globals).retry_all()
    }

    /// Runs `f` in a metacontext transaction. Results of `Ok(None)` and soft errors roll back and return `None`.
    pub fn attempt<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<Option<T>, ElabError>,
    ) -> Result<Option<T>, ElabError> {
        self.mcxt.push();
        match f(self) {
            Ok(Some(x)) => {
                self.mcxt.discard();
                Ok(Some(x))
            }
            Ok(None) => {
                self.mcxt.pop();
                Ok(None)
            }
            Err(e) if e.is_soft() => {
                self.mcxt.pop();
                Ok(None)
            }
            Err(e) => {
                self.mcxt.pop();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_skips_inserted() {
        let l = Local::new(GlobalEnv::default())
            .bind("x".into(), Val::Type, false, false)
            .bind("y".into(), Val::Type, false, false)
            .bind("x".into(), Val::Type, true, true);
        let (i, e) = l.lookup(&"x".into()).unwrap();
        assert_eq!(i, Idx::new(2));
        assert!(!e.inserted);
        assert_eq!(l.lookup(&"y".into()).unwrap().0, Idx::new(1));
        assert!(l.lookup(&"z".into()).is_none());
    }

    #[test]
    fn metas_skip_definitions() {
        let mut mcxt = MetaCxt::new();
        let l = Local::new(GlobalEnv::default())
            .bind("x".into(), Val::Type, false, false)
            .define("y".into(), Val::Type, false, Val::Type)
            .bind("z".into(), Val::Type, false, false);
        let t = l.new_meta(&mut mcxt);
        let m = Term::Meta(Meta::new(0));
        assert_eq!(t, m.app(Expl, Term::var(2)).app(Expl, Term::var(0)));
    }

    #[test]
    fn extending_leaves_parent() {
        let l = Local::new(GlobalEnv::default());
        let l2 = l.bind("x".into(), Val::Type, false, false).in_type();
        assert_eq!(l.size(), Size::zero());
        assert!(!l.in_type);
        assert_eq!(l2.size(), Size::zero() + 1);
        assert!(l2.in_type);
        assert_eq!(
            l2.dump(&MetaCxt::new()),
            "[x : Type] in type"
        );
    }
}
