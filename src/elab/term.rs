use super::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Icit {
    Impl,
    Expl,
}
pub use Icit::*;

/// Lambdas, Pis and Sigmas are all represented as function closures, tagged with what kind of binder they are.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FunClass {
    Sigma,
    Lam(Icit),
    Pi(Icit),
}
pub use FunClass::{Lam, Pi, Sigma};
impl FunClass {
    pub fn icit(self) -> Icit {
        match self {
            Sigma => Expl,
            Lam(i) | Pi(i) => i,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Prim {
    Void,
    UnitType,
    Unit,
    Bool,
    True,
    False,
    Nat,
    Succ,
    HEq,
    Refl,
}
impl Prim {
    pub const ALL: [Prim; 10] = [
        Prim::Void,
        Prim::UnitType,
        Prim::Unit,
        Prim::Bool,
        Prim::True,
        Prim::False,
        Prim::Nat,
        Prim::Succ,
        Prim::HEq,
        Prim::Refl,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Prim::Void => "Void",
            Prim::UnitType => "UnitType",
            Prim::Unit => "Unit",
            Prim::Bool => "Bool",
            Prim::True => "True",
            Prim::False => "False",
            Prim::Nat => "Nat",
            Prim::Succ => "S",
            Prim::HEq => "HEq",
            Prim::Refl => "ReflHEq",
        }
    }

    pub fn from_name(s: &str) -> Option<Prim> {
        Prim::ALL.iter().copied().find(|p| p.name() == s)
    }
}
impl std::fmt::Display for Prim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The eliminators of the primitive inductive types
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimElim {
    Void,
    Bool,
    Nat,
    HEq,
}
impl PrimElim {
    pub fn name(self) -> &'static str {
        match self {
            PrimElim::Void => "elimVoid",
            PrimElim::Bool => "elimBool",
            PrimElim::Nat => "elimNat",
            PrimElim::HEq => "elimHEq",
        }
    }

    pub fn num_cases(self) -> usize {
        match self {
            PrimElim::Void => 0,
            PrimElim::Bool => 2,
            PrimElim::Nat => 2,
            PrimElim::HEq => 1,
        }
    }
}
impl std::fmt::Display for PrimElim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Proj {
    Fst,
    Snd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EClos {
    pub class: FunClass,
    pub name: Name,
    pub erased: bool,
    pub ty: Rc<Term>,
    pub body: Rc<Term>,
}

/// Elaborated core terms, with de Bruijn indices
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Type,
    Var(Idx),
    Global(Name),
    Meta(Meta),
    Prim(Prim),
    NatLit(u64),
    App(Rc<Term>, Icit, Rc<Term>),
    Fun(EClos),
    /// fst, snd, and the Sigma type of the pair
    Pair(Rc<Term>, Rc<Term>, Rc<Term>),
    Proj(Rc<Term>, Proj),
    /// name, erased, type, value, body
    Let(Name, bool, Rc<Term>, Rc<Term>, Rc<Term>),
    /// eliminator, motive, scrutinee, cases
    PrimElim(PrimElim, Rc<Term>, Rc<Term>, Vec<Term>),
}
impl Term {
    pub fn var(i: u32) -> Term {
        Term::Var(Idx::new(i))
    }

    pub fn app(self, icit: Icit, x: Term) -> Term {
        Term::App(Rc::new(self), icit, Rc::new(x))
    }

    pub fn fun(class: FunClass, name: impl Into<Name>, erased: bool, ty: Term, body: Term) -> Term {
        Term::Fun(EClos {
            class,
            name: name.into(),
            erased,
            ty: Rc::new(ty),
            body: Rc::new(body),
        })
    }

    pub fn lam(icit: Icit, name: impl Into<Name>, ty: Term, body: Term) -> Term {
        Term::fun(Lam(icit), name, false, ty, body)
    }

    pub fn pi(icit: Icit, name: impl Into<Name>, ty: Term, body: Term) -> Term {
        Term::fun(Pi(icit), name, false, ty, body)
    }

    pub fn proj(self, p: Proj) -> Term {
        Term::Proj(Rc::new(self), p)
    }

    /// Whether the term refers to the variable with index `i` (relative to the term's outermost scope)
    pub fn uses_idx(&self, i: u32) -> bool {
        match self {
            Term::Var(j) => j.as_u32() == i,
            Term::Type | Term::Global(_) | Term::Meta(_) | Term::Prim(_) | Term::NatLit(_) => false,
            Term::App(f, _, x) => f.uses_idx(i) || x.uses_idx(i),
            Term::Fun(clos) => clos.ty.uses_idx(i) || clos.body.uses_idx(i + 1),
            Term::Pair(a, b, t) => a.uses_idx(i) || b.uses_idx(i) || t.uses_idx(i),
            Term::Proj(x, _) => x.uses_idx(i),
            Term::Let(_, _, ty, v, body) => ty.uses_idx(i) || v.uses_idx(i) || body.uses_idx(i + 1),
            Term::PrimElim(_, m, s, cs) => {
                m.uses_idx(i) || s.uses_idx(i) || cs.iter().any(|c| c.uses_idx(i))
            }
        }
    }

    pub fn uses_global(&self, n: &Name) -> bool {
        match self {
            Term::Global(m) => m == n,
            Term::Type | Term::Var(_) | Term::Meta(_) | Term::Prim(_) | Term::NatLit(_) => false,
            Term::App(f, _, x) => f.uses_global(n) || x.uses_global(n),
            Term::Fun(clos) => clos.ty.uses_global(n) || clos.body.uses_global(n),
            Term::Pair(a, b, t) => a.uses_global(n) || b.uses_global(n) || t.uses_global(n),
            Term::Proj(x, _) => x.uses_global(n),
            Term::Let(_, _, ty, v, body) => {
                ty.uses_global(n) || v.uses_global(n) || body.uses_global(n)
            }
            Term::PrimElim(_, m, s, cs) => {
                m.uses_global(n) || s.uses_global(n) || cs.iter().any(|c| c.uses_global(n))
            }
        }
    }

    /// The metas that still occur in the term, in order of first appearance
    pub fn metas(&self) -> Vec<Meta> {
        fn go(t: &Term, acc: &mut Vec<Meta>) {
            match t {
                Term::Meta(m) => {
                    if !acc.contains(m) {
                        acc.push(*m)
                    }
                }
                Term::Type | Term::Var(_) | Term::Global(_) | Term::Prim(_) | Term::NatLit(_) => (),
                Term::App(f, _, x) => {
                    go(f, acc);
                    go(x, acc);
                }
                Term::Fun(clos) => {
                    go(&clos.ty, acc);
                    go(&clos.body, acc);
                }
                Term::Pair(a, b, t) => {
                    go(a, acc);
                    go(b, acc);
                    go(t, acc);
                }
                Term::Proj(x, _) => go(x, acc),
                Term::Let(_, _, ty, v, body) => {
                    go(ty, acc);
                    go(v, acc);
                    go(body, acc);
                }
                Term::PrimElim(_, m, s, cs) => {
                    go(m, acc);
                    go(s, acc);
                    for c in cs {
                        go(c, acc);
                    }
                }
            }
        }
        let mut acc = Vec::new();
        go(self, &mut acc);
        acc
    }

    /// Picks a name for a binder that doesn't capture anything `body` refers to
    fn fresh_binder(names: &im::Vector<Name>, name: &Name, body: &Term) -> Name {
        let mut name = name.clone();
        let size = names.len();
        loop {
            let clash = body.uses_global(&name)
                || names
                    .iter()
                    .enumerate()
                    .any(|(l, n)| *n == name && body.uses_idx((size - l) as u32));
            if !clash || name.is_underscore() {
                break name;
            }
            name = name.next();
        }
    }

    /// `names` holds the names of the variables in scope, outermost first
    pub fn pretty(&self, names: &im::Vector<Name>) -> Doc {
        match self {
            Term::Type => Doc::none().add("Type", Doc::style_keyword()),
            Term::Var(i) => {
                let size = Size::zero() + names.len();
                if i.in_scope(size) {
                    Doc::start(&names[i.lvl(size).as_u32() as usize])
                } else {
                    Doc::start(format!("#{}", i.as_u32()))
                }
            }
            Term::Global(n) => Doc::start(n),
            Term::Meta(m) => Doc::start(m).style(Doc::style_literal()),
            Term::Prim(p) => Doc::start(p),
            Term::NatLit(n) => Doc::start(n).style(Doc::style_literal()),
            Term::App(f, icit, x) => f
                .pretty(names)
                .nest(Prec::App)
                .space()
                .chain(match icit {
                    Impl => Doc::start('{').chain(x.pretty(names)).add('}', ()),
                    Expl => x.pretty(names).nest(Prec::Atom),
                })
                .prec(Prec::App),
            Term::Fun(clos) => {
                let name = Term::fresh_binder(names, &clos.name, &clos.body);
                let mut inner = names.clone();
                inner.push_back(name.clone());
                let body = clos.body.pretty(&inner);
                let erased = if clos.erased { "0 " } else { "" };
                match clos.class {
                    Lam(icit) => {
                        let bind = match icit {
                            Impl => Doc::start('{').add(erased, ()).add(&name, ()).add('}', ()),
                            Expl => Doc::start(erased).add(&name, ()),
                        };
                        Doc::start('\\')
                            .chain(bind)
                            .add('.', ())
                            .space()
                            .chain(body.nest(Prec::Term))
                            .prec(Prec::Term)
                    }
                    Pi(_) | Sigma => {
                        let (open, close) = match clos.class.icit() {
                            Impl => ('{', '}'),
                            Expl => ('(', ')'),
                        };
                        let ty = clos.ty.pretty(names);
                        let bind = if name.is_underscore() && clos.class.icit() == Expl && !clos.erased {
                            ty.nest(Prec::App)
                        } else {
                            Doc::start(open)
                                .add(erased, ())
                                .add(&name, ())
                                .add(" : ", ())
                                .chain(ty)
                                .add(close, ())
                        };
                        let arrow = if clos.class == Sigma { "**" } else { "->" };
                        bind.space()
                            .add(arrow, ())
                            .space()
                            .chain(body.nest(Prec::Pair))
                            .prec(Prec::Pair)
                    }
                }
            }
            Term::Pair(a, b, _) => Doc::start('(')
                .chain(a.pretty(names))
                .add(',', ())
                .space()
                .chain(b.pretty(names))
                .add(')', ()),
            Term::Proj(x, p) => Doc::start(match p {
                Proj::Fst => "fst",
                Proj::Snd => "snd",
            })
            .space()
            .chain(x.pretty(names).nest(Prec::Atom))
            .prec(Prec::App),
            Term::Let(name, erased, ty, val, body) => {
                let name = Term::fresh_binder(names, name, body);
                let mut inner = names.clone();
                inner.push_back(name.clone());
                Doc::none()
                    .add("let", Doc::style_keyword())
                    .space()
                    .add(if *erased { "0 " } else { "" }, ())
                    .add(&name, ())
                    .add(" : ", ())
                    .chain(ty.pretty(names))
                    .add(" = ", ())
                    .chain(val.pretty(names))
                    .space()
                    .add("in", Doc::style_keyword())
                    .space()
                    .chain(body.pretty(&inner))
                    .prec(Prec::Term)
            }
            Term::PrimElim(e, m, s, cs) => Doc::intersperse(
                std::iter::once(Doc::start(e))
                    .chain([m, s].into_iter().map(|x| x.pretty(names).nest(Prec::Atom)))
                    .chain(cs.iter().map(|x| x.pretty(names).nest(Prec::Atom))),
                Doc::none().space(),
            )
            .prec(Prec::App),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SProj {
    Fst,
    Snd,
    Name(Name),
    Index(usize),
}

/// The AST produced by the parser, with variables referred to by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    Var(Name),
    App(Box<Surface>, Icit, Box<Surface>),
    Abs {
        icit: Icit,
        erased: bool,
        name: Name,
        ty: Option<Box<Surface>>,
        body: Box<Surface>,
    },
    Pi {
        icit: Icit,
        erased: bool,
        name: Name,
        ty: Box<Surface>,
        body: Box<Surface>,
    },
    Sigma {
        erased: bool,
        name: Name,
        ty: Box<Surface>,
        body: Box<Surface>,
    },
    Let {
        erased: bool,
        name: Name,
        ty: Option<Box<Surface>>,
        val: Box<Surface>,
        body: Box<Surface>,
    },
    Pair(Box<Surface>, Box<Surface>),
    Proj(Box<Surface>, SProj),
    Ann(Box<Surface>, Box<Surface>),
    /// `_` when there's no name, `?x` for a named hole; instance holes are filled by instance search
    Hole {
        name: Option<Name>,
        instance: bool,
    },
    Prim(Prim),
    Elim {
        elim: PrimElim,
        motive: Option<Box<Surface>>,
        scrut: Box<Surface>,
        cases: Vec<Surface>,
    },
    Type,
    NatLit(u64),
    Spanned(Span, Box<Surface>),
}
// Constructors for building terms by hand
impl Surface {
    pub fn var(n: &str) -> Surface {
        Surface::Var(n.into())
    }

    pub fn app(self, x: Surface) -> Surface {
        Surface::App(Box::new(self), Expl, Box::new(x))
    }

    pub fn iapp(self, x: Surface) -> Surface {
        Surface::App(Box::new(self), Impl, Box::new(x))
    }

    pub fn lam(n: &str, body: Surface) -> Surface {
        Surface::Abs {
            icit: Expl,
            erased: false,
            name: n.into(),
            ty: None,
            body: Box::new(body),
        }
    }

    pub fn ilam(n: &str, body: Surface) -> Surface {
        Surface::Abs {
            icit: Impl,
            erased: false,
            name: n.into(),
            ty: None,
            body: Box::new(body),
        }
    }

    pub fn lam_ann(n: &str, ty: Surface, body: Surface) -> Surface {
        Surface::Abs {
            icit: Expl,
            erased: false,
            name: n.into(),
            ty: Some(Box::new(ty)),
            body: Box::new(body),
        }
    }

    pub fn pi(n: &str, ty: Surface, body: Surface) -> Surface {
        Surface::Pi {
            icit: Expl,
            erased: false,
            name: n.into(),
            ty: Box::new(ty),
            body: Box::new(body),
        }
    }

    pub fn ipi(n: &str, ty: Surface, body: Surface) -> Surface {
        Surface::Pi {
            icit: Impl,
            erased: false,
            name: n.into(),
            ty: Box::new(ty),
            body: Box::new(body),
        }
    }

    pub fn arrow(self, to: Surface) -> Surface {
        Surface::pi("_", self, to)
    }

    pub fn sigma(n: &str, ty: Surface, body: Surface) -> Surface {
        Surface::Sigma {
            erased: false,
            name: n.into(),
            ty: Box::new(ty),
            body: Box::new(body),
        }
    }

    pub fn let_(n: &str, ty: Option<Surface>, val: Surface, body: Surface) -> Surface {
        Surface::Let {
            erased: false,
            name: n.into(),
            ty: ty.map(Box::new),
            val: Box::new(val),
            body: Box::new(body),
        }
    }

    pub fn pair(a: Surface, b: Surface) -> Surface {
        Surface::Pair(Box::new(a), Box::new(b))
    }

    pub fn proj(self, p: SProj) -> Surface {
        Surface::Proj(Box::new(self), p)
    }

    pub fn ann(self, ty: Surface) -> Surface {
        Surface::Ann(Box::new(self), Box::new(ty))
    }

    pub fn hole() -> Surface {
        Surface::Hole {
            name: None,
            instance: false,
        }
    }

    pub fn named_hole(n: &str) -> Surface {
        Surface::Hole {
            name: Some(n.into()),
            instance: false,
        }
    }

    pub fn inst_hole(n: &str) -> Surface {
        Surface::Hole {
            name: Some(n.into()),
            instance: true,
        }
    }

    pub fn elim(elim: PrimElim, motive: Option<Surface>, scrut: Surface, cases: Vec<Surface>) -> Surface {
        Surface::Elim {
            elim,
            motive: motive.map(Box::new),
            scrut: Box::new(scrut),
            cases,
        }
    }

    pub fn spanned(self, span: Span) -> Surface {
        Surface::Spanned(span, Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ns: &[&str]) -> im::Vector<Name> {
        ns.iter().map(|&n| Name::from(n)).collect()
    }

    #[test]
    fn pretty_avoids_capture() {
        // \x. \x. <outer x>
        let t = Term::lam(Expl, "x", Term::Prim(Prim::Nat), Term::lam(Expl, "x", Term::Prim(Prim::Nat), Term::var(1)));
        assert_eq!(t.pretty(&names(&[])).to_string(false), "\\x. \\x$0. x");

        // shadowing is fine when the outer variable isn't used
        let t = Term::lam(Expl, "x", Term::Prim(Prim::Nat), Term::lam(Expl, "x", Term::Prim(Prim::Nat), Term::var(0)));
        assert_eq!(t.pretty(&names(&[])).to_string(false), "\\x. \\x. x");
    }

    #[test]
    fn pretty_pi() {
        let nat = || Term::Prim(Prim::Nat);
        let t = Term::pi(Impl, "A", Term::Type, Term::pi(Expl, "_", Term::var(0), Term::var(1)));
        assert_eq!(t.pretty(&names(&[])).to_string(false), "{A : Type} -> A -> A");
        let t = Term::pi(Expl, "_", Term::pi(Expl, "_", nat(), nat()), nat());
        assert_eq!(t.pretty(&names(&[])).to_string(false), "(Nat -> Nat) -> Nat");
        let t = Term::Global("id".into()).app(Impl, nat()).app(Expl, Term::NatLit(3));
        assert_eq!(t.pretty(&names(&[])).to_string(false), "id {Nat} 3");
    }

    #[test]
    fn uses() {
        let t = Term::lam(Expl, "x", Term::var(0), Term::var(1));
        assert!(t.uses_idx(0));
        assert!(!t.uses_idx(1));
        assert!(Term::Global("f".into()).app(Expl, Term::Type).uses_global(&"f".into()));
        assert_eq!(Term::Meta(Meta::new(2)).app(Expl, Term::Meta(Meta::new(2))).metas(), vec![Meta::new(2)]);
    }

    #[test]
    fn prim_names() {
        for p in Prim::ALL {
            assert_eq!(Prim::from_name(p.name()), Some(p));
        }
        assert_eq!(Prim::from_name("S"), Some(Prim::Succ));
        assert_eq!(Prim::from_name("Foo"), None);
    }
}
