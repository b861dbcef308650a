//! Replacing solved metas in elaborated terms.
//!
//! A solved meta at the head of an application is applied to the rest of the spine as a value
//! and quoted back, so the solution's lambdas don't end up as beta-redexes in the result.
use super::*;

enum Zonked {
    /// The head was a solved meta; this is its solution applied to the spine so far
    Solved(Val),
    Term(Term),
}

impl MetaCxt {
    /// Substitutes solved metas in `t`, which lives in `env`
    pub fn zonk(&self, t: &Term, env: &Env) -> Term {
        let size = env.size();
        match t {
            Term::Meta(_) | Term::App(..) | Term::Proj(..) => match self.zonk_spine(t, env) {
                Zonked::Solved(v) => v.quote(size, false, self),
                Zonked::Term(t) => t,
            },
            Term::Type | Term::Var(_) | Term::Global(_) | Term::Prim(_) | Term::NatLit(_) => t.clone(),
            Term::Fun(clos) => Term::Fun(EClos {
                class: clos.class,
                name: clos.name.clone(),
                erased: clos.erased,
                ty: Rc::new(self.zonk(&clos.ty, env)),
                body: Rc::new(self.zonk(&clos.body, &env.with(Val::var(size.next_lvl())))),
            }),
            Term::Pair(a, b, ty) => Term::Pair(
                Rc::new(self.zonk(a, env)),
                Rc::new(self.zonk(b, env)),
                Rc::new(self.zonk(ty, env)),
            ),
            Term::Let(name, erased, ty, val, body) => Term::Let(
                name.clone(),
                *erased,
                Rc::new(self.zonk(ty, env)),
                Rc::new(self.zonk(val, env)),
                Rc::new(self.zonk(body, &env.with(Val::var(size.next_lvl())))),
            ),
            Term::PrimElim(e, motive, scrut, cases) => {
                let motive = self.zonk(motive, env);
                let cases: Vec<_> = cases.iter().map(|c| self.zonk(c, env)).collect();
                match self.zonk_spine(scrut, env) {
                    Zonked::Solved(v) => v
                        .app(Elim::Prim(
                            *e,
                            motive.eval(env),
                            cases.iter().map(|c| c.eval(env)).collect(),
                        ))
                        .quote(size, false, self),
                    Zonked::Term(scrut) => Term::PrimElim(*e, Rc::new(motive), Rc::new(scrut), cases),
                }
            }
        }
    }

    fn zonk_spine(&self, t: &Term, env: &Env) -> Zonked {
        match t {
            Term::Meta(m) => match self.lookup(*m) {
                Some(v) => Zonked::Solved(v),
                None => Zonked::Term(t.clone()),
            },
            Term::App(f, icit, x) => match self.zonk_spine(f, env) {
                Zonked::Solved(v) => Zonked::Solved(v.app(Elim::App(*icit, x.eval(env)))),
                Zonked::Term(f) => Zonked::Term(Term::App(Rc::new(f), *icit, Rc::new(self.zonk(x, env)))),
            },
            Term::Proj(x, p) => match self.zonk_spine(x, env) {
                Zonked::Solved(v) => Zonked::Solved(v.app(Elim::Proj(*p))),
                Zonked::Term(x) => Zonked::Term(x.proj(*p)),
            },
            t => Zonked::Term(self.zonk(t, env)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solved_head_is_applied() {
        let mut mcxt = MetaCxt::new();
        let m = mcxt.fresh_meta();
        // ?0 := \x. \y. x
        let sol = Term::lam(Expl, "x", Term::Type, Term::lam(Expl, "y", Term::Type, Term::var(1)));
        mcxt.set(m, sol.eval(&Env::default())).unwrap();

        let mut env = Env::default();
        env.push(Val::var(Lvl::new(0)));
        // \z. ?0 #1 z
        let t = Term::lam(
            Expl,
            "z",
            Term::Type,
            Term::Meta(m).app(Expl, Term::var(1)).app(Expl, Term::var(0)),
        );
        assert_eq!(
            mcxt.zonk(&t, &env),
            Term::lam(Expl, "z", Term::Type, Term::var(1))
        );
    }

    #[test]
    fn unsolved_metas_stay() {
        let mut mcxt = MetaCxt::new();
        let a = mcxt.fresh_meta();
        let b = mcxt.fresh_meta();
        mcxt.set(b, Val::prim(Prim::Nat)).unwrap();
        let t = Term::Meta(a).app(Expl, Term::Meta(b)).proj(Proj::Fst);
        assert_eq!(
            mcxt.zonk(&t, &Env::default()),
            Term::Meta(a).app(Expl, Term::Prim(Prim::Nat)).proj(Proj::Fst)
        );
    }

    #[test]
    fn solved_scrutinee_reduces() {
        let mut mcxt = MetaCxt::new();
        let m = mcxt.fresh_meta();
        mcxt.set(m, Val::prim(Prim::False)).unwrap();
        let t = Term::PrimElim(
            PrimElim::Bool,
            Rc::new(Term::lam(Expl, "_", Term::Prim(Prim::Bool), Term::Prim(Prim::Nat))),
            Rc::new(Term::Meta(m)),
            vec![Term::NatLit(1), Term::NatLit(0)],
        );
        assert_eq!(mcxt.zonk(&t, &Env::default()), Term::NatLit(0));
    }
}
