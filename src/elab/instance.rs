use tracing::{debug, trace};

use super::*;

impl Cxt<'_> {
    /// Fills every unsolved instance hole with a local or global whose name has the instance prefix
    pub fn search_instances(&mut self) -> Result<(), ElabError> {
        let holes: Vec<Hole> = self.holes.iter().filter(|h| h.instance).cloned().collect();
        for hole in holes {
            let size = hole.local.size();
            let v = hole.term.eval(&hole.local.env);
            if !matches!(v.clone().force(self.mcxt), Val::Ne(Head::Meta(_), _)) {
                // Already determined by unification
                continue;
            }
            let depth = self.config.instance_depth;
            let witness = self.search(&hole.local, hole.ty.clone(), depth)?;
            let witness = witness.ok_or_else(|| ElabError::NoInstance {
                hole: hole.name.clone(),
                ty: hole.local.show(&hole.ty, self.mcxt),
            })?;
            debug!(hole = %hole.name, witness = %witness.pretty(&hole.local.names()).to_string(false), "instance");
            self.unify(size, v, witness.eval(&hole.local.env))
                .map_err(|e| e.with_names(&hole.local.names()))?;
        }
        Ok(())
    }

    /// Erased candidates are only usable when the hole is in a type
    fn candidates(&self, local: &Local) -> Vec<(Term, Val)> {
        let prefix = self.config.instance_prefix.as_str();
        let size = local.size();
        let locals = local
            .entries()
            .rev()
            .filter(|(_, e)| !e.inserted && (local.in_type || !e.erased))
            .filter(|(_, e)| e.name.as_str().starts_with(prefix))
            .map(|(l, e)| (Term::Var(l.idx(size)), e.ty.clone()));
        let globals = self
            .globals
            .iter()
            .rev()
            .filter(|(n, e)| (local.in_type || !e.erased) && n.as_str().starts_with(prefix))
            .map(|(n, e)| (Term::Global(n.clone()), e.ty.clone()));
        locals.chain(globals).collect()
    }

    /// Looks for a term of type `goal`, using candidates that take up to `depth` levels of other instances
    fn search(&mut self, local: &Local, goal: Val, depth: u32) -> Result<Option<Term>, ElabError> {
        if depth == 0 {
            return Ok(None);
        }
        for (term, ty) in self.candidates(local) {
            trace!(candidate = %term.pretty(&local.names()).to_string(false), depth, "trying instance");
            if let Some(t) = self.try_candidate(local, term, ty, &goal, depth)? {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }

    fn try_candidate(
        &mut self,
        local: &Local,
        term: Term,
        ty: Val,
        goal: &Val,
        depth: u32,
    ) -> Result<Option<Term>, ElabError> {
        let size = local.size();

        // As is
        let direct = self.attempt(|cxt| {
            cxt.unify(size, ty.clone(), goal.clone())?;
            Ok(Some(term.clone()))
        })?;
        if direct.is_some() {
            return Ok(direct);
        }

        // With implicit arguments filled in
        let applied = self.attempt(|cxt| {
            let (ity, args) = cxt.inst(local, ty.clone());
            if args.is_empty() {
                return Ok(None);
            }
            cxt.unify(size, ity, goal.clone())?;
            Ok(Some(args.into_iter().fold(term.clone(), |t, x| t.app(Impl, x))))
        })?;
        if applied.is_some() {
            return Ok(applied);
        }

        // As a function from another instance
        self.attempt(|cxt| {
            let (ity, args) = cxt.inst(local, ty);
            let term = args.into_iter().fold(term, |t, x| t.app(Impl, x));
            let clos = match ity.force(cxt.mcxt) {
                Val::Fun(clos) if clos.class == Pi(Expl) => clos,
                _ => return Ok(None),
            };
            let arg = local.new_meta(cxt.mcxt).eval(&local.env);
            cxt.unify(size, clos.apply(arg.clone()), goal.clone())?;
            match cxt.search(local, clos.ty.clone(), depth - 1)? {
                Some(w) => {
                    cxt.unify(size, arg, w.eval(&local.env))?;
                    Ok(Some(term.app(Expl, w)))
                }
                None => Ok(None),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn globals(defs: &[(&str, Term, Term)]) -> GlobalEnv {
        let mut g = GlobalEnv::default();
        for (n, ty, val) in defs {
            define(&mut g, n, ty, val, false);
        }
        g
    }

    fn define(g: &mut GlobalEnv, n: &str, ty: &Term, val: &Term, erased: bool) {
        let env = Env::new(g.clone());
        let entry = GlobalEntry {
            term: val.clone(),
            val: Rc::new(val.eval(&env)),
            ty: ty.eval(&env),
            erased,
            erased_term: None,
        };
        g.insert(Name::from(n), entry);
    }

    fn run(g: &GlobalEnv, tm: &Surface) -> Result<(Term, Val), ElabError> {
        let mut mcxt = MetaCxt::new();
        let config = Config::default();
        Cxt::new(&mut mcxt, g, &config).elab_top(tm)
    }

    #[test]
    fn direct_candidate() {
        let g = globals(&[
            ("instNat", Term::Prim(Prim::Nat), Term::NatLit(3)),
            ("notAnInstance", Term::Prim(Prim::Nat), Term::NatLit(4)),
        ]);
        let (t, _) = run(&g, &Surface::inst_hole("x").ann(Surface::var("Nat"))).unwrap();
        assert_eq!(t, Term::Global("instNat".into()));
    }

    #[test]
    fn newest_candidate_wins() {
        let g = globals(&[
            ("instA", Term::Prim(Prim::Nat), Term::NatLit(1)),
            ("instB", Term::Prim(Prim::Nat), Term::NatLit(2)),
        ]);
        let (t, _) = run(&g, &Surface::inst_hole("x").ann(Surface::var("Nat"))).unwrap();
        assert_eq!(t, Term::Global("instB".into()));
    }

    #[test]
    fn chained_candidate() {
        // instBool : Bool, instNatOfBool : Bool -> Nat
        let g = globals(&[
            ("instBool", Term::Prim(Prim::Bool), Term::Prim(Prim::True)),
            (
                "instNatOfBool",
                Term::pi(Expl, "_", Term::Prim(Prim::Bool), Term::Prim(Prim::Nat)),
                Term::lam(Expl, "_", Term::Prim(Prim::Bool), Term::NatLit(0)),
            ),
        ]);
        let (t, _) = run(&g, &Surface::inst_hole("x").ann(Surface::var("Nat"))).unwrap();
        assert_eq!(
            t,
            Term::Global("instNatOfBool".into()).app(Expl, Term::Global("instBool".into()))
        );
    }

    #[test]
    fn missing_instance() {
        let g = globals(&[("instBool", Term::Prim(Prim::Bool), Term::Prim(Prim::True))]);
        let e = run(&g, &Surface::inst_hole("h").ann(Surface::var("Nat"))).unwrap_err();
        assert_eq!(
            e,
            ElabError::NoInstance {
                hole: "h".into(),
                ty: "Nat".into()
            }
        );
    }

    #[test]
    fn local_candidates() {
        // \(instX : Nat). (?h : Nat)
        let tm = Surface::lam_ann(
            "instX",
            Surface::var("Nat"),
            Surface::inst_hole("h").ann(Surface::var("Nat")),
        );
        let (t, _) = run(&GlobalEnv::default(), &tm).unwrap();
        assert_eq!(t, Term::lam(Expl, "instX", Term::Prim(Prim::Nat), Term::var(0)));
    }

    #[test]
    fn erased_locals_are_skipped() {
        // \{instA : Nat}. (?h : Nat)
        let tm = Surface::Abs {
            icit: Impl,
            erased: false,
            name: "instA".into(),
            ty: Some(Box::new(Surface::var("Nat"))),
            body: Box::new(Surface::inst_hole("h").ann(Surface::var("Nat"))),
        };
        let e = run(&GlobalEnv::default(), &tm).unwrap_err();
        assert_eq!(
            e,
            ElabError::NoInstance {
                hole: "h".into(),
                ty: "Nat".into()
            }
        );
    }

    #[test]
    fn erased_globals_only_in_types() {
        let mut g = GlobalEnv::default();
        define(&mut g, "instN", &Term::Prim(Prim::Nat), &Term::NatLit(1), true);
        define(&mut g, "instT", &Term::Type, &Term::Prim(Prim::Nat), true);

        let e = run(&g, &Surface::inst_hole("h").ann(Surface::var("Nat"))).unwrap_err();
        assert_eq!(
            e,
            ElabError::NoInstance {
                hole: "h".into(),
                ty: "Nat".into()
            }
        );

        // \(x : ?h). x, where the hole is a type
        let tm = Surface::lam_ann("x", Surface::inst_hole("h"), Surface::var("x"));
        let (t, _) = run(&g, &tm).unwrap();
        assert_eq!(t, Term::lam(Expl, "x", Term::Global("instT".into()), Term::var(0)));
    }
}
