//! Types and reduction rules for the primitive constants and their eliminators.
//!
//! Types are written as small core terms and evaluated in an environment holding the values they mention,
//! so `Var(0)` in a type below refers to the last value passed in.
use super::*;

fn prim(p: Prim) -> Term {
    Term::Prim(p)
}

fn arrow(a: Term, b: Term) -> Term {
    Term::pi(Expl, "_", a, b)
}

fn heq_ty(a: Term, b: Term, x: Term, y: Term) -> Term {
    prim(Prim::HEq)
        .app(Impl, a)
        .app(Impl, b)
        .app(Expl, x)
        .app(Expl, y)
}

fn eval_in(t: Term, vals: impl IntoIterator<Item = Val>) -> Val {
    let mut env = Env::default();
    env.extend(vals);
    t.eval(&env)
}

impl Prim {
    pub fn ty(self) -> Val {
        let t = match self {
            Prim::Void | Prim::UnitType | Prim::Bool | Prim::Nat => Term::Type,
            Prim::Unit => prim(Prim::UnitType),
            Prim::True | Prim::False => prim(Prim::Bool),
            Prim::Succ => arrow(prim(Prim::Nat), prim(Prim::Nat)),
            // {A : Type} -> {B : Type} -> A -> B -> Type
            Prim::HEq => Term::pi(
                Impl,
                "A",
                Term::Type,
                Term::pi(
                    Impl,
                    "B",
                    Term::Type,
                    arrow(Term::var(1), arrow(Term::var(1), Term::Type)),
                ),
            ),
            // {A : Type} -> {a : A} -> HEq {A} {A} a a
            Prim::Refl => Term::pi(
                Impl,
                "A",
                Term::Type,
                Term::pi(
                    Impl,
                    "a",
                    Term::var(0),
                    heq_ty(Term::var(1), Term::var(1), Term::var(0), Term::var(0)),
                ),
            ),
        };
        eval_in(t, [])
    }
}

/// The indices of an `HEq {A} {B} a b` type
pub struct HEqArgs {
    pub a_ty: Val,
    pub b_ty: Val,
    pub a: Val,
    pub b: Val,
}
impl HEqArgs {
    /// Matches a forced type against `HEq {A} {B} a b`
    pub fn from_ty(ty: &Val) -> Option<HEqArgs> {
        match ty {
            Val::Ne(Head::Prim(Prim::HEq), sp) if sp.len() == 4 => {
                let arg = |i: usize| match &sp[i] {
                    Elim::App(_, x) => Some(x.clone()),
                    _ => None,
                };
                Some(HEqArgs {
                    a_ty: arg(0)?,
                    b_ty: arg(1)?,
                    a: arg(2)?,
                    b: arg(3)?,
                })
            }
            _ => None,
        }
    }
}

/// Everything needed to typecheck an application of a primitive eliminator
pub struct ElimSig {
    pub motive_ty: Val,
    /// Given the motive, the expected types of the cases
    pub case_tys: Vec<Val>,
    /// The type of the whole elimination, given the motive and scrutinee
    pub result: Val,
}

impl PrimElim {
    /// The type the scrutinee must have, for the eliminators whose scrutinee type has no indices
    pub fn scrut_ty(self) -> Option<Val> {
        match self {
            PrimElim::Void => Some(Val::prim(Prim::Void)),
            PrimElim::Bool => Some(Val::prim(Prim::Bool)),
            PrimElim::Nat => Some(Val::prim(Prim::Nat)),
            PrimElim::HEq => None,
        }
    }

    /// The type of the motive. `heq` must be given for `elimHEq`.
    pub fn motive_ty(self, heq: Option<&HEqArgs>) -> Val {
        match (self, heq) {
            // (b : A) -> HEq {A} {A} a b -> Type, in an environment [A, a]
            (PrimElim::HEq, Some(h)) => eval_in(
                Term::pi(
                    Expl,
                    "b",
                    Term::var(1),
                    arrow(
                        heq_ty(Term::var(2), Term::var(2), Term::var(1), Term::var(0)),
                        Term::Type,
                    ),
                ),
                [h.a_ty.clone(), h.a.clone()],
            ),
            (e, _) => match e.scrut_ty() {
                Some(ty) => eval_in(arrow(Term::var(0), Term::Type), [ty]),
                None => unreachable!("motive type of {} needs the scrutinee's indices", e),
            },
        }
    }

    pub fn sig(self, motive: &Val, scrut: &Val, heq: Option<&HEqArgs>) -> ElimSig {
        let p = motive.clone();
        let case_tys = match (self, heq) {
            (PrimElim::Void, _) => Vec::new(),
            (PrimElim::Bool, _) => vec![
                p.clone().app_expl(Val::prim(Prim::True)),
                p.clone().app_expl(Val::prim(Prim::False)),
            ],
            // [P 0, (m : Nat) -> P m -> P (S m)], in an environment [P]
            (PrimElim::Nat, _) => vec![
                p.clone().app_expl(Val::NatLit(0)),
                eval_in(
                    Term::pi(
                        Expl,
                        "m",
                        prim(Prim::Nat),
                        arrow(
                            Term::var(1).app(Expl, Term::var(0)),
                            Term::var(2).app(Expl, prim(Prim::Succ).app(Expl, Term::var(1))),
                        ),
                    ),
                    [p.clone()],
                ),
            ],
            // [P a (ReflHEq {A} {a})], in an environment [A, a, P]
            (PrimElim::HEq, Some(h)) => vec![eval_in(
                Term::var(0).app(Expl, Term::var(1)).app(
                    Expl,
                    prim(Prim::Refl).app(Impl, Term::var(2)).app(Impl, Term::var(1)),
                ),
                [h.a_ty.clone(), h.a.clone(), p.clone()],
            )],
            (PrimElim::HEq, None) => unreachable!("elimHEq cases need the scrutinee's indices"),
        };
        let result = match (self, heq) {
            (PrimElim::HEq, Some(h)) => p.app_expl(h.b.clone()).app_expl(scrut.clone()),
            _ => p.app_expl(scrut.clone()),
        };
        ElimSig {
            motive_ty: self.motive_ty(heq),
            case_tys,
            result,
        }
    }
}

/// Reduces an eliminator applied to a canonical scrutinee; `None` means it's stuck.
pub fn reduce(e: PrimElim, scrut: &Val, motive: &Val, cases: &[Val]) -> Option<Val> {
    match (e, scrut) {
        (PrimElim::Bool, v) if v.is_prim(Prim::True) => Some(cases[0].clone()),
        (PrimElim::Bool, v) if v.is_prim(Prim::False) => Some(cases[1].clone()),
        (PrimElim::Nat, Val::NatLit(0)) => Some(cases[0].clone()),
        (PrimElim::Nat, Val::NatLit(n)) => Some(nat_step(motive, cases, Val::NatLit(n - 1))),
        (PrimElim::Nat, Val::Ne(Head::Prim(Prim::Succ), sp)) if sp.len() == 1 => match &sp[0] {
            Elim::App(_, m) => Some(nat_step(motive, cases, m.clone())),
            _ => None,
        },
        (PrimElim::HEq, Val::Ne(Head::Prim(Prim::Refl), sp)) if sp.len() == 2 => {
            Some(cases[0].clone())
        }
        _ => None,
    }
}

/// `s m (elimNat P m z s)`
fn nat_step(motive: &Val, cases: &[Val], m: Val) -> Val {
    let rec = m.clone().app(Elim::Prim(PrimElim::Nat, motive.clone(), cases.to_vec()));
    cases[1].clone().app_expl(m).app_expl(rec)
}
