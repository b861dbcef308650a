use std::cell::OnceCell;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Head {
    Var(Lvl),
    Prim(Prim),
    Meta(Meta),
}

#[derive(Debug, Clone)]
pub enum Elim {
    App(Icit, Val),
    Proj(Proj),
    /// eliminator, motive, cases
    Prim(PrimElim, Val, Vec<Val>),
}

/// Eliminations applied to a neutral head, innermost first
pub type Spine = im::Vector<Elim>;

#[derive(Debug, Clone)]
pub struct VClos {
    pub class: FunClass,
    pub name: Name,
    pub erased: bool,
    pub ty: Val,
    pub env: Env,
    pub body: Rc<Term>,
}
impl VClos {
    pub fn apply(&self, arg: Val) -> Val {
        self.body.eval(&self.env.with(arg))
    }

    /// Instantiates the body with a fresh variable, for going under the binder
    pub fn open(&self, size: Size) -> Val {
        self.apply(Val::var(size.next_lvl()))
    }

    pub fn quote(&self, size: Size, full: bool, mcxt: &MetaCxt) -> EClos {
        EClos {
            class: self.class,
            name: self.name.clone(),
            erased: self.erased,
            ty: Rc::new(self.ty.clone().quote(size, full, mcxt)),
            body: Rc::new(self.open(size).quote(size.inc(), full, mcxt)),
        }
    }
}

/// The unfolded value of a global applied to a spine, computed at most once
#[derive(Debug, Clone)]
pub struct Lazy {
    base: Rc<Val>,
    cache: Rc<OnceCell<Val>>,
}
impl Lazy {
    pub fn new(base: Rc<Val>) -> Lazy {
        Lazy {
            base,
            cache: Rc::new(OnceCell::new()),
        }
    }

    fn force(&self, spine: &Spine) -> Val {
        self.cache
            .get_or_init(|| {
                spine
                    .iter()
                    .fold((*self.base).clone(), |v, e| v.app(e.clone()))
            })
            .clone()
    }
}

/// Values are in weak-head normal form, up to unsolved metas
#[derive(Debug, Clone)]
pub enum Val {
    Type,
    Ne(Head, Spine),
    /// A global applied to a spine, along with its unfolding
    Glued(Name, Spine, Lazy),
    Fun(Rc<VClos>),
    /// fst, snd, and the Sigma type of the pair
    Pair(Rc<Val>, Rc<Val>, Rc<Val>),
    NatLit(u64),
}
impl Val {
    pub fn var(l: Lvl) -> Val {
        Val::Ne(Head::Var(l), Spine::new())
    }

    pub fn prim(p: Prim) -> Val {
        Val::Ne(Head::Prim(p), Spine::new())
    }

    pub fn meta(m: Meta) -> Val {
        Val::Ne(Head::Meta(m), Spine::new())
    }

    pub fn is_prim(&self, p: Prim) -> bool {
        matches!(self, Val::Ne(Head::Prim(q), sp) if *q == p && sp.is_empty())
    }

    pub fn app_expl(self, x: Val) -> Val {
        self.app(Elim::App(Expl, x))
    }

    /// Applies an eliminator, reducing if the value is canonical
    pub fn app(self, elim: Elim) -> Val {
        match (self, elim) {
            (Val::Fun(clos), Elim::App(_, x)) => clos.apply(x),
            (Val::Pair(a, _, _), Elim::Proj(Proj::Fst)) => (*a).clone(),
            (Val::Pair(_, b, _), Elim::Proj(Proj::Snd)) => (*b).clone(),
            (Val::Glued(n, mut sp, lazy), elim) => {
                // The unfolding cached for the shorter spine doesn't apply anymore
                sp.push_back(elim);
                Val::Glued(n, sp, Lazy::new(lazy.base))
            }
            (Val::Ne(Head::Prim(Prim::Succ), sp), Elim::App(Expl, Val::NatLit(n)))
                if sp.is_empty() =>
            {
                Val::NatLit(n + 1)
            }
            (scrut, Elim::Prim(e, motive, cases)) => match prims::reduce(e, &scrut, &motive, &cases)
            {
                Some(v) => v,
                None => match scrut {
                    Val::Ne(h, mut sp) => {
                        sp.push_back(Elim::Prim(e, motive, cases));
                        Val::Ne(h, sp)
                    }
                    v => unreachable!("{} applied to non-neutral {:?}", e, v),
                },
            },
            (Val::Ne(h, mut sp), elim) => {
                sp.push_back(elim);
                Val::Ne(h, sp)
            }
            (v, elim) => unreachable!("ill-typed elimination {:?} of {:?}", elim, v),
        }
    }

    pub fn app_spine(self, spine: &Spine) -> Val {
        spine.iter().fold(self, |v, e| v.app(e.clone()))
    }

    /// Unfolds globals and chases solved metas until the head is neither
    pub fn force(self, mcxt: &MetaCxt) -> Val {
        match self {
            Val::Glued(_, sp, lazy) => lazy.force(&sp).force(mcxt),
            v => match v.force_glue(mcxt) {
                v @ Val::Glued(..) => v.force(mcxt),
                v => v,
            },
        }
    }

    /// Chases solved metas, but leaves globals folded
    pub fn force_glue(self, mcxt: &MetaCxt) -> Val {
        match self {
            Val::Ne(Head::Meta(m), sp) => match mcxt.lookup(m) {
                Some(v) => v.app_spine(&sp).force_glue(mcxt),
                None => Val::Ne(Head::Meta(m), sp),
            },
            v => v,
        }
    }

    /// Reads a value back into a term. With `full`, globals are unfolded.
    pub fn quote(self, size: Size, full: bool, mcxt: &MetaCxt) -> Term {
        let quote_spine = |head: Term, sp: Spine| {
            sp.into_iter().fold(head, |t, e| match e {
                Elim::App(i, x) => Term::App(Rc::new(t), i, Rc::new(x.quote(size, full, mcxt))),
                Elim::Proj(p) => Term::Proj(Rc::new(t), p),
                Elim::Prim(e, motive, cases) => Term::PrimElim(
                    e,
                    Rc::new(motive.quote(size, full, mcxt)),
                    Rc::new(t),
                    cases.into_iter().map(|x| x.quote(size, full, mcxt)).collect(),
                ),
            })
        };
        match self.force_glue(mcxt) {
            Val::Type => Term::Type,
            Val::NatLit(n) => Term::NatLit(n),
            Val::Ne(h, sp) => {
                let head = match h {
                    Head::Var(l) => Term::Var(l.idx(size)),
                    Head::Prim(p) => Term::Prim(p),
                    Head::Meta(m) => Term::Meta(m),
                };
                quote_spine(head, sp)
            }
            v @ Val::Glued(..) if full => v.force(mcxt).quote(size, full, mcxt),
            Val::Glued(n, sp, _) => quote_spine(Term::Global(n), sp),
            Val::Fun(clos) => Term::Fun(clos.quote(size, full, mcxt)),
            Val::Pair(a, b, t) => Term::Pair(
                Rc::new((*a).clone().quote(size, full, mcxt)),
                Rc::new((*b).clone().quote(size, full, mcxt)),
                Rc::new((*t).clone().quote(size, full, mcxt)),
            ),
        }
    }

    pub fn pretty(&self, names: &im::Vector<Name>, mcxt: &MetaCxt) -> Doc {
        self.clone()
            .quote(Size::zero() + names.len(), false, mcxt)
            .pretty(names)
    }
}

impl Term {
    pub fn eval(&self, env: &Env) -> Val {
        match self {
            Term::Type => Val::Type,
            Term::Var(i) => match env.get(*i) {
                Some(v) => v.clone(),
                None => unreachable!("variable {:?} not in environment of size {:?}", i, env.size()),
            },
            Term::Global(n) => match env.globals.get(n) {
                Some(entry) => Val::Glued(n.clone(), Spine::new(), Lazy::new(entry.val.clone())),
                None => unreachable!("global {} evaluated after removal", n),
            },
            Term::Meta(m) => Val::meta(*m),
            Term::Prim(p) => Val::prim(*p),
            Term::NatLit(n) => Val::NatLit(*n),
            Term::App(f, i, x) => f.eval(env).app(Elim::App(*i, x.eval(env))),
            Term::Fun(clos) => Val::Fun(Rc::new(VClos {
                class: clos.class,
                name: clos.name.clone(),
                erased: clos.erased,
                ty: clos.ty.eval(env),
                env: env.clone(),
                body: clos.body.clone(),
            })),
            Term::Pair(a, b, t) => Val::Pair(
                Rc::new(a.eval(env)),
                Rc::new(b.eval(env)),
                Rc::new(t.eval(env)),
            ),
            Term::Proj(x, p) => x.eval(env).app(Elim::Proj(*p)),
            Term::Let(_, _, _, val, body) => body.eval(&env.with(val.eval(env))),
            Term::PrimElim(e, motive, scrut, cases) => scrut.eval(env).app(Elim::Prim(
                *e,
                motive.eval(env),
                cases.iter().map(|x| x.eval(env)).collect(),
            )),
        }
    }

    /// Evaluates and reads back, unfolding globals if `full`
    pub fn normalize(&self, env: &Env, full: bool, mcxt: &MetaCxt) -> Term {
        self.eval(env).quote(env.size(), full, mcxt)
    }
}
