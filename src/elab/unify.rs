use tracing::{debug, trace};

use super::*;

/// Decides definitional equality, solving metas along the way if allowed.
///
/// Globals are compared folded first (inside a transaction), and only unfolded if that fails, the same way smalltt does it.
pub struct UnifyCxt<'a> {
    pub mcxt: &'a mut MetaCxt,
    pub globals: &'a GlobalEnv,
    /// `false` for plain conversion checking, where metas are treated as rigid
    can_solve: bool,
}

impl<'a> UnifyCxt<'a> {
    pub fn new(mcxt: &'a mut MetaCxt, globals: &'a GlobalEnv) -> Self {
        UnifyCxt {
            mcxt,
            globals,
            can_solve: true,
        }
    }

    pub fn conv(mcxt: &'a mut MetaCxt, globals: &'a GlobalEnv) -> Self {
        UnifyCxt {
            mcxt,
            globals,
            can_solve: false,
        }
    }

    fn mismatch(&self, size: Size, a: &Val, b: &Val) -> ElabError {
        ElabError::Conversion {
            size,
            lhs: a.clone().quote(size, false, self.mcxt),
            rhs: b.clone().quote(size, false, self.mcxt),
            names: None,
        }
    }

    fn show(&self, size: Size, v: &Val) -> String {
        let names = (0..size.as_u32())
            .map(|l| Name::from(format!("${}", l)))
            .collect();
        v.pretty(&names, self.mcxt).to_string(false)
    }

    fn unify_spines(
        &mut self,
        size: Size,
        (a, sa): (&Val, &Spine),
        (b, sb): (&Val, &Spine),
    ) -> Result<(), ElabError> {
        if sa.len() != sb.len() {
            return Err(self.mismatch(size, a, b));
        }
        // The outermost elimination is compared first
        for (ea, eb) in sa.iter().rev().zip(sb.iter().rev()) {
            match (ea, eb) {
                (Elim::App(i1, x), Elim::App(i2, y)) if i1 == i2 => {
                    self.unify(size, x.clone(), y.clone())?
                }
                (Elim::Proj(p1), Elim::Proj(p2)) if p1 == p2 => (),
                (Elim::Prim(e1, m1, c1), Elim::Prim(e2, m2, c2))
                    if e1 == e2 && c1.len() == c2.len() =>
                {
                    self.unify(size, m1.clone(), m2.clone())?;
                    for (x, y) in c1.iter().zip(c2) {
                        self.unify(size, x.clone(), y.clone())?;
                    }
                }
                _ => return Err(self.mismatch(size, a, b)),
            }
        }
        Ok(())
    }

    pub fn unify(&mut self, size: Size, a: Val, b: Val) -> Result<(), ElabError> {
        let a = a.force_glue(self.mcxt);
        let b = b.force_glue(self.mcxt);
        trace!(lhs = %self.show(size, &a), rhs = %self.show(size, &b), "unify");

        match (a, b) {
            (Val::Type, Val::Type) => Ok(()),
            (Val::NatLit(x), Val::NatLit(y)) if x == y => Ok(()),

            (Val::Fun(x), Val::Fun(y)) if x.class == y.class && x.erased == y.erased => {
                // Lambda annotations don't matter, the bodies are compared at the same variable anyway
                if !matches!(x.class, Lam(_)) {
                    self.unify(size, x.ty.clone(), y.ty.clone())?;
                }
                self.unify(size.inc(), x.open(size), y.open(size))
            }

            (Val::Pair(a1, b1, _), Val::Pair(a2, b2, _)) => {
                self.unify(size, (*a1).clone(), (*a2).clone())?;
                self.unify(size, (*b1).clone(), (*b2).clone())
            }

            // `n+1 ~ S m`
            (Val::NatLit(n), Val::Ne(Head::Prim(Prim::Succ), sp))
            | (Val::Ne(Head::Prim(Prim::Succ), sp), Val::NatLit(n))
                if n > 0 && sp.len() == 1 && matches!(sp[0], Elim::App(Expl, _)) =>
            {
                match &sp[0] {
                    Elim::App(_, m) => self.unify(size, Val::NatLit(n - 1), m.clone()),
                    _ => unreachable!(),
                }
            }

            (Val::Ne(h1, s1), Val::Ne(h2, s2)) if h1 == h2 => {
                let (a, b) = (Val::Ne(h1, s1.clone()), Val::Ne(h2, s2.clone()));
                self.unify_spines(size, (&a, &s1), (&b, &s2))
            }

            // With two metas, solve the one with the longer spine
            (Val::Ne(Head::Meta(m1), s1), Val::Ne(Head::Meta(m2), s2)) if self.can_solve => {
                if s2.len() > s1.len() {
                    self.solve(size, m2, s2, Val::Ne(Head::Meta(m1), s1))
                } else {
                    self.solve(size, m1, s1, Val::Ne(Head::Meta(m2), s2))
                }
            }
            (Val::Ne(Head::Meta(m), sp), x) | (x, Val::Ne(Head::Meta(m), sp)) if self.can_solve => {
                self.solve(size, m, sp, x)
            }

            // Eta-expand if there's a lambda on one side
            (Val::Fun(clos), x) | (x, Val::Fun(clos))
                if matches!(clos.class, Lam(_)) && matches!(x, Val::Ne(..) | Val::Glued(..)) =>
            {
                let v = Val::var(size.next_lvl());
                let icit = clos.class.icit();
                self.unify(size.inc(), clos.apply(v.clone()), x.app(Elim::App(icit, v)))
            }

            // And for pairs
            (Val::Pair(a, b, _), x) | (x, Val::Pair(a, b, _))
                if matches!(x, Val::Ne(..) | Val::Glued(..)) =>
            {
                self.unify(size, (*a).clone(), x.clone().app(Elim::Proj(Proj::Fst)))?;
                self.unify(size, (*b).clone(), x.app(Elim::Proj(Proj::Snd)))
            }

            // Try without unfolding first
            (Val::Glued(n1, s1, l1), Val::Glued(n2, s2, l2)) if n1 == n2 => {
                let a = Val::Glued(n1, s1.clone(), l1);
                let b = Val::Glued(n2, s2.clone(), l2);
                self.mcxt.push();
                match self.unify_spines(size, (&a, &s1), (&b, &s2)) {
                    Ok(()) => {
                        self.mcxt.discard();
                        Ok(())
                    }
                    Err(e) if e.is_soft() => {
                        self.mcxt.pop();
                        let (a, b) = (a.force(self.mcxt), b.force(self.mcxt));
                        self.unify(size, a, b)
                    }
                    Err(e) => {
                        self.mcxt.pop();
                        Err(e)
                    }
                }
            }
            (a @ Val::Glued(..), b) => {
                let a = a.force(self.mcxt);
                self.unify(size, a, b)
            }
            (a, b @ Val::Glued(..)) => {
                let b = b.force(self.mcxt);
                self.unify(size, a, b)
            }

            (a, b) => Err(self.mismatch(size, &a, &b)),
        }
    }

    /// Solves `?m sp := rhs` by pattern unification, or postpones it if the spine isn't a pattern yet
    pub fn solve(&mut self, size: Size, m: Meta, sp: Spine, rhs: Val) -> Result<(), ElabError> {
        debug!(meta = %m, rhs = %self.show(size, &rhs), "solve");

        if let Some((prefix, cases, trailing)) = bool_elim_spine(&sp) {
            return self.invert_bool(size, m, (prefix, cases, trailing), sp, rhs);
        }

        // The spine has to be made of distinct bound variables
        let vars: Option<Vec<(Lvl, Icit)>> = sp
            .iter()
            .map(|e| match e {
                Elim::App(icit, x) => match x.clone().force(self.mcxt) {
                    Val::Ne(Head::Var(l), s) if s.is_empty() => Some((l, *icit)),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        let vars = match vars {
            Some(vars) => vars,
            None => return self.postpone(size, m, sp, rhs),
        };
        for (i, (l, _)) in vars.iter().enumerate() {
            if vars[..i].iter().any(|(l2, _)| l2 == l) {
                return Err(ElabError::NonLinearSpine { meta: m });
            }
        }

        let body = rhs.quote(size, false, self.mcxt);
        let lvls: Vec<Lvl> = vars.iter().map(|(l, _)| *l).collect();
        let body = check_solution(m, &lvls, size, 0, &body)?;
        let term = vars.iter().rev().fold(body, |body, (l, icit)| {
            Term::lam(*icit, format!("${}", l.as_u32()), Term::Type, body)
        });
        debug!(meta = %m, solution = ?term, "solved");

        let val = term.eval(&Env::new(self.globals.clone()));
        self.mcxt.set(m, val)?;
        self.retry_for(m)
    }

    fn postpone(&mut self, size: Size, m: Meta, sp: Spine, rhs: Val) -> Result<(), ElabError> {
        self.mcxt.postpone(
            m,
            Problem {
                size,
                lhs: Val::Ne(Head::Meta(m), sp),
                rhs,
            },
        );
        Ok(())
    }

    /// `elimBool P (?m sp) t f [x] ~ rhs`: try `t [x] ~ rhs` with `?m sp := True`, then the same for `False`
    fn invert_bool(
        &mut self,
        size: Size,
        m: Meta,
        (prefix, cases, trailing): (Spine, Vec<Val>, Option<Elim>),
        sp: Spine,
        rhs: Val,
    ) -> Result<(), ElabError> {
        for (case, constant) in cases.into_iter().zip([Prim::True, Prim::False]) {
            let case = match &trailing {
                Some(e) => case.app(e.clone()),
                None => case,
            };
            self.mcxt.push();
            let r = self
                .unify(size, case, rhs.clone())
                .and_then(|()| self.solve(size, m, prefix.clone(), Val::prim(constant)));
            match r {
                Ok(()) => {
                    self.mcxt.discard();
                    debug!(meta = %m, branch = %constant, "inverted boolean elimination");
                    return Ok(());
                }
                Err(e) => {
                    self.mcxt.pop();
                    if !e.is_soft() {
                        return Err(e);
                    }
                    trace!(meta = %m, branch = %constant, error = %e, "branch failed");
                }
            }
        }
        self.postpone(size, m, sp, rhs)
    }

    /// Re-attempts the problems that were waiting on `m`
    pub fn retry_for(&mut self, m: Meta) -> Result<(), ElabError> {
        let problems = self.mcxt.take_postponed(m);
        if !problems.is_empty() {
            debug!(meta = %m, count = problems.len(), "retry");
        }
        for p in problems {
            self.unify(p.size, p.lhs, p.rhs)?;
        }
        Ok(())
    }

    /// Retries all postponed problems until nothing more gets solved
    pub fn retry_all(&mut self) -> Result<(), ElabError> {
        while self.mcxt.has_postponed() {
            let before = self.mcxt.unsolved().len();
            for m in self.mcxt.postponed_metas() {
                self.retry_for(m)?;
            }
            if self.mcxt.unsolved().len() == before {
                break;
            }
        }
        Ok(())
    }
}

/// Splits a meta's spine of the form `sp, elimBool P t f` or `sp, elimBool P t f, x`
fn bool_elim_spine(sp: &Spine) -> Option<(Spine, Vec<Val>, Option<Elim>)> {
    let n = sp.len();
    match sp.last() {
        Some(Elim::Prim(PrimElim::Bool, _, cases)) => {
            Some((sp.clone().slice(..n - 1), cases.clone(), None))
        }
        Some(x @ Elim::App(..)) if n >= 2 => match &sp[n - 2] {
            Elim::Prim(PrimElim::Bool, _, cases) => {
                Some((sp.clone().slice(..n - 2), cases.clone(), Some(x.clone())))
            }
            _ => None,
        },
        _ => None,
    }
}

/// Renames the variables in a solution to refer to the meta's parameters, checking scope and occurrence.
/// `depth` is the number of binders we're under inside the solution.
fn check_solution(m: Meta, lvls: &[Lvl], size: Size, depth: u32, t: &Term) -> Result<Term, ElabError> {
    let go = |t: &Term, depth| check_solution(m, lvls, size, depth, t).map(Rc::new);
    Ok(match t {
        Term::Var(i) if i.as_u32() < depth => Term::Var(*i),
        Term::Var(i) => {
            let lvl = Idx::new(i.as_u32() - depth).lvl(size);
            match lvls.iter().rposition(|l| *l == lvl) {
                Some(p) => Term::var(lvls.len() as u32 - 1 - p as u32 + depth),
                None => {
                    return Err(ElabError::Scope {
                        meta: m,
                        var: format!("${}", lvl.as_u32()),
                    })
                }
            }
        }
        Term::Meta(m2) if *m2 == m => return Err(ElabError::Occurs { meta: m }),
        Term::Type | Term::Meta(_) | Term::Global(_) | Term::Prim(_) | Term::NatLit(_) => t.clone(),
        Term::App(f, i, x) => Term::App(go(f, depth)?, *i, go(x, depth)?),
        Term::Fun(clos) => Term::Fun(EClos {
            class: clos.class,
            name: clos.name.clone(),
            erased: clos.erased,
            ty: go(&clos.ty, depth)?,
            body: go(&clos.body, depth + 1)?,
        }),
        Term::Pair(a, b, ty) => Term::Pair(go(a, depth)?, go(b, depth)?, go(ty, depth)?),
        Term::Proj(x, p) => Term::Proj(go(x, depth)?, *p),
        Term::Let(n, e, ty, v, body) => Term::Let(
            n.clone(),
            *e,
            go(ty, depth)?,
            go(v, depth)?,
            go(body, depth + 1)?,
        ),
        Term::PrimElim(e, motive, scrut, cases) => Term::PrimElim(
            *e,
            go(motive, depth)?,
            go(scrut, depth)?,
            cases
                .iter()
                .map(|c| check_solution(m, lvls, size, depth, c))
                .collect::<Result<_, _>>()?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(l: u32) -> Val {
        Val::var(Lvl::new(l))
    }

    fn meta_app(m: Meta, args: &[Val]) -> Val {
        args.iter()
            .fold(Val::meta(m), |f, x| f.app_expl(x.clone()))
    }

    #[test]
    fn solves_identity() {
        let mut mcxt = MetaCxt::new();
        let globals = GlobalEnv::default();
        let m = mcxt.fresh_meta();
        let size = Size::zero() + 4;
        UnifyCxt::new(&mut mcxt, &globals)
            .unify(size, meta_app(m, &[var(3)]), var(3))
            .unwrap();
        let sol = mcxt.lookup(m).unwrap().quote(Size::zero(), false, &mcxt);
        assert_eq!(sol, Term::lam(Expl, "$3", Term::Type, Term::var(0)));
    }

    #[test]
    fn nonlinear_is_hard() {
        let mut mcxt = MetaCxt::new();
        let globals = GlobalEnv::default();
        let m = mcxt.fresh_meta();
        let size = Size::zero() + 4;
        let e = UnifyCxt::new(&mut mcxt, &globals)
            .unify(size, meta_app(m, &[var(3), var(3)]), Val::Type)
            .unwrap_err();
        assert!(matches!(e, ElabError::NonLinearSpine { .. }));
        assert!(!e.is_soft());
        assert!(!mcxt.has_postponed());
    }

    #[test]
    fn scope_error() {
        let mut mcxt = MetaCxt::new();
        let globals = GlobalEnv::default();
        let m = mcxt.fresh_meta();
        let size = Size::zero() + 10;
        let e = UnifyCxt::new(&mut mcxt, &globals)
            .unify(size, meta_app(m, &[var(2)]), var(9))
            .unwrap_err();
        assert_eq!(
            e,
            ElabError::Scope {
                meta: m,
                var: "$9".into()
            }
        );
    }

    #[test]
    fn occurs_error() {
        let mut mcxt = MetaCxt::new();
        let globals = GlobalEnv::default();
        let m = mcxt.fresh_meta();
        let size = Size::zero() + 1;
        let rhs = Val::prim(Prim::Succ).app_expl(meta_app(m, &[var(0)]));
        let e = UnifyCxt::new(&mut mcxt, &globals)
            .unify(size, meta_app(m, &[var(0)]), rhs)
            .unwrap_err();
        assert!(matches!(e, ElabError::Occurs { .. }));
    }

    #[test]
    fn non_pattern_postpones_then_retries() {
        let mut mcxt = MetaCxt::new();
        let globals = GlobalEnv::default();
        let a = mcxt.fresh_meta();
        let b = mcxt.fresh_meta();
        let size = Size::zero() + 1;
        // ?a (?b x) ~ x  can't be solved until ?b is known
        let mut cxt = UnifyCxt::new(&mut mcxt, &globals);
        cxt.unify(size, meta_app(a, &[meta_app(b, &[var(0)])]), var(0))
            .unwrap();
        assert!(cxt.mcxt.has_postponed());
        // ?b x ~ x, then the postponed problem becomes ?a x ~ x
        cxt.unify(size, meta_app(b, &[var(0)]), var(0)).unwrap();
        assert!(cxt.mcxt.has_postponed());
        cxt.retry_all().unwrap();
        assert!(!cxt.mcxt.has_postponed());
        let sol = cxt.mcxt.lookup(a).unwrap().quote(Size::zero(), false, cxt.mcxt);
        assert_eq!(sol, Term::lam(Expl, "$0", Term::Type, Term::var(0)));
    }

    #[test]
    fn eta() {
        let mut mcxt = MetaCxt::new();
        let globals = GlobalEnv::default();
        let size = Size::zero() + 1;
        // \y. f y ~ f
        let lam = Term::lam(Expl, "y", Term::Type, Term::var(1).app(Expl, Term::var(0)));
        let mut env = Env::default();
        env.push(var(0));
        UnifyCxt::conv(&mut mcxt, &globals)
            .unify(size, lam.eval(&env), var(0))
            .unwrap();
        // (fst p, snd p) ~ p
        let pair = Val::Pair(
            Rc::new(var(0).app(Elim::Proj(Proj::Fst))),
            Rc::new(var(0).app(Elim::Proj(Proj::Snd))),
            Rc::new(Val::Type),
        );
        UnifyCxt::conv(&mut mcxt, &globals)
            .unify(size, var(0), pair)
            .unwrap();
    }

    #[test]
    fn conv_doesnt_solve() {
        let mut mcxt = MetaCxt::new();
        let globals = GlobalEnv::default();
        let m = mcxt.fresh_meta();
        let e = UnifyCxt::conv(&mut mcxt, &globals)
            .unify(Size::zero(), Val::meta(m), Val::Type)
            .unwrap_err();
        assert!(e.is_soft());
        assert!(!mcxt.is_solved(m));
    }

    #[test]
    fn succ_literal() {
        let mut mcxt = MetaCxt::new();
        let globals = GlobalEnv::default();
        let m = mcxt.fresh_meta();
        UnifyCxt::new(&mut mcxt, &globals)
            .unify(
                Size::zero(),
                Val::NatLit(3),
                Val::prim(Prim::Succ).app_expl(Val::meta(m)),
            )
            .unwrap();
        assert!(matches!(mcxt.lookup(m), Some(Val::NatLit(2))));
    }

    #[test]
    fn bool_inversion() {
        let mut mcxt = MetaCxt::new();
        let globals = GlobalEnv::default();
        let m = mcxt.fresh_meta();
        let motive = Term::lam(Expl, "_", Term::Prim(Prim::Bool), Term::Type).eval(&Env::default());
        // elimBool (\_. Type) ?m Nat Bool ~ Bool  solves ?m := False
        let lhs = Val::meta(m).app(Elim::Prim(
            PrimElim::Bool,
            motive,
            vec![Val::prim(Prim::Nat), Val::prim(Prim::Bool)],
        ));
        UnifyCxt::new(&mut mcxt, &globals)
            .unify(Size::zero(), lhs, Val::prim(Prim::Bool))
            .unwrap();
        assert!(mcxt.lookup(m).unwrap().is_prim(Prim::False));
        assert_eq!(mcxt.depth(), 0);
    }

    #[test]
    fn bool_inversion_postpones() {
        let mut mcxt = MetaCxt::new();
        let globals = GlobalEnv::default();
        let m = mcxt.fresh_meta();
        let motive = Term::lam(Expl, "_", Term::Prim(Prim::Bool), Term::Type).eval(&Env::default());
        let lhs = Val::meta(m).app(Elim::Prim(
            PrimElim::Bool,
            motive,
            vec![Val::prim(Prim::Nat), Val::prim(Prim::Bool)],
        ));
        UnifyCxt::new(&mut mcxt, &globals)
            .unify(Size::zero(), lhs, Val::prim(Prim::Void))
            .unwrap();
        assert!(!mcxt.is_solved(m));
        assert_eq!(mcxt.postponed_metas(), vec![m]);
    }

    #[test]
    fn bool_inversion_keeps_hard_errors() {
        let mut mcxt = MetaCxt::new();
        let globals = GlobalEnv::default();
        let m = mcxt.fresh_meta();
        let n = mcxt.fresh_meta();
        let motive = Term::lam(Expl, "_", Term::Prim(Prim::Bool), Term::Prim(Prim::Nat))
            .eval(&Env::default());
        // elimBool P ?m (?n x0) x1 ~ x1: the True branch needs ?n x0 := x1, which is out of scope
        let lhs = Val::meta(m).app(Elim::Prim(
            PrimElim::Bool,
            motive,
            vec![meta_app(n, &[var(0)]), var(1)],
        ));
        let e = UnifyCxt::new(&mut mcxt, &globals)
            .unify(Size::zero() + 2, lhs, var(1))
            .unwrap_err();
        assert!(matches!(e, ElabError::Scope { meta, .. } if meta == n));
        assert!(!mcxt.is_solved(m));
        assert_eq!(mcxt.depth(), 0);
    }
}
