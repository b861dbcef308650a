//! An independent typechecker for fully elaborated terms, which also erases them.
//!
//! It never solves metas: definitional equality is plain conversion checking, and meeting a meta is a bug.
use super::*;

/// Terms with types, implicit arguments and erased binders removed
#[derive(Debug, Clone, PartialEq)]
pub enum Erased {
    /// De Bruijn index, counting only binders that survive erasure
    Var(usize),
    Global(Name),
    Abs(Name, Box<Erased>),
    App(Box<Erased>, Box<Erased>),
    Pair(Box<Erased>, Box<Erased>),
    Fst(Box<Erased>),
    Snd(Box<Erased>),
    Let(Name, Box<Erased>, Box<Erased>),
    NatLit(u64),
    Prim(Prim),
    /// condition, then, else
    If(Box<Erased>, Box<Erased>, Box<Erased>),
    /// scrutinee, zero case, successor case
    ElimNat(Box<Erased>, Box<Erased>, Box<Erased>),
    /// Stands in for anything that only matters at compile time
    Type,
}
impl Erased {
    fn app(self, x: Erased) -> Erased {
        Erased::App(Box::new(self), Box::new(x))
    }

    pub fn pretty(&self, names: &im::Vector<Name>) -> Doc {
        let atom = |e: &Erased| e.pretty(names).nest(Prec::Atom);
        match self {
            Erased::Var(i) if *i < names.len() => Doc::start(&names[names.len() - 1 - i]),
            Erased::Var(i) => Doc::start(format!("#{}", i)),
            Erased::Global(n) => Doc::start(n),
            Erased::Abs(n, body) => {
                let mut inner = names.clone();
                inner.push_back(n.clone());
                Doc::start('\\')
                    .add(n, ())
                    .add('.', ())
                    .space()
                    .chain(body.pretty(&inner))
                    .prec(Prec::Term)
            }
            Erased::App(f, x) => f
                .pretty(names)
                .nest(Prec::App)
                .space()
                .chain(atom(x))
                .prec(Prec::App),
            Erased::Pair(a, b) => Doc::start('(')
                .chain(a.pretty(names))
                .add(',', ())
                .space()
                .chain(b.pretty(names))
                .add(')', ()),
            Erased::Fst(x) => Doc::start("fst").space().chain(atom(x)).prec(Prec::App),
            Erased::Snd(x) => Doc::start("snd").space().chain(atom(x)).prec(Prec::App),
            Erased::Let(n, v, body) => {
                let mut inner = names.clone();
                inner.push_back(n.clone());
                Doc::none()
                    .add("let", Doc::style_keyword())
                    .space()
                    .add(n, ())
                    .add(" = ", ())
                    .chain(v.pretty(names))
                    .space()
                    .add("in", Doc::style_keyword())
                    .space()
                    .chain(body.pretty(&inner))
                    .prec(Prec::Term)
            }
            Erased::NatLit(n) => Doc::start(n).style(Doc::style_literal()),
            Erased::Prim(p) => Doc::start(p),
            Erased::If(c, t, f) => Doc::none()
                .add("if", Doc::style_keyword())
                .space()
                .chain(c.pretty(names))
                .space()
                .add("then", Doc::style_keyword())
                .space()
                .chain(t.pretty(names))
                .space()
                .add("else", Doc::style_keyword())
                .space()
                .chain(f.pretty(names))
                .prec(Prec::Term),
            Erased::ElimNat(n, z, s) => Doc::start("elimNat")
                .space()
                .chain(atom(n))
                .space()
                .chain(atom(z))
                .space()
                .chain(atom(s))
                .prec(Prec::App),
            Erased::Type => Doc::start('*'),
        }
    }
}
impl std::fmt::Display for Erased {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty(&im::Vector::new()).to_string(false))
    }
}

pub struct Verifier<'a> {
    mcxt: MetaCxt,
    globals: &'a GlobalEnv,
}
impl<'a> Verifier<'a> {
    pub fn new(globals: &'a GlobalEnv) -> Self {
        Verifier {
            mcxt: MetaCxt::new(),
            globals,
        }
    }

    /// Checks a closed term, returning its type and erasure. Erased terms may refer to other erased terms.
    pub fn verify(&mut self, t: &Term, erased: bool) -> Result<(Val, Erased), ElabError> {
        let mut local = Local::new(self.globals.clone());
        local.in_type = erased;
        self.infer(&local, t)
    }

    /// Checks that two closed types are convertible
    pub fn same_type(&mut self, a: Val, b: Val) -> Result<(), ElabError> {
        let local = Local::new(self.globals.clone());
        self.conv(&local, a, b)
    }

    fn conv(&mut self, local: &Local, a: Val, b: Val) -> Result<(), ElabError> {
        UnifyCxt::conv(&mut self.mcxt, self.globals)
            .unify(local.size(), a, b)
            .map_err(|e| e.with_names(&local.names()))
    }

    fn check(&mut self, local: &Local, t: &Term, ty: Val) -> Result<Erased, ElabError> {
        let (ty2, e) = self.infer(local, t)?;
        self.conv(local, ty2, ty)?;
        Ok(e)
    }

    fn show(&self, local: &Local, v: &Val) -> String {
        local.show(v, &self.mcxt)
    }

    /// The index `l` has once erased binders are gone
    fn runtime_idx(local: &Local, l: Lvl) -> usize {
        local
            .entries()
            .skip(l.as_u32() as usize + 1)
            .filter(|(_, e)| !e.erased)
            .count()
    }

    fn infer(&mut self, local: &Local, t: &Term) -> Result<(Val, Erased), ElabError> {
        match t {
            Term::Type => Ok((Val::Type, Erased::Type)),
            Term::Var(i) => {
                if !i.in_scope(local.size()) {
                    return Err(ElabError::Internal(format!("variable {:?} out of scope", i)));
                }
                let l = i.lvl(local.size());
                let entry = match local.entries().nth(l.as_u32() as usize) {
                    Some((_, e)) => e,
                    None => unreachable!(),
                };
                if entry.erased && !local.in_type {
                    return Err(ElabError::ErasedUsage(entry.name.clone()));
                }
                let e = if entry.erased {
                    Erased::Type
                } else {
                    Erased::Var(Self::runtime_idx(local, l))
                };
                Ok((entry.ty.clone(), e))
            }
            Term::Global(n) => match self.globals.get(n) {
                Some(entry) => {
                    if entry.erased && !local.in_type {
                        return Err(ElabError::ErasedUsage(n.clone()));
                    }
                    Ok((entry.ty.clone(), Erased::Global(n.clone())))
                }
                None => Err(ElabError::UnboundVariable(n.clone())),
            },
            Term::Meta(m) => Err(ElabError::Internal(format!("meta {} left in elaborated term", m))),
            Term::Prim(p) => {
                let e = match p.ty() {
                    Val::Type => Erased::Type,
                    _ => Erased::Prim(*p),
                };
                Ok((p.ty(), e))
            }
            Term::NatLit(n) => Ok((Val::prim(Prim::Nat), Erased::NatLit(*n))),

            Term::App(f, icit, x) => {
                let (fty, fe) = self.infer(local, f)?;
                match fty.clone().force(&self.mcxt) {
                    Val::Fun(clos) if clos.class == Pi(*icit) => {
                        let runtime = !clos.erased && *icit == Expl;
                        let x_local = if runtime {
                            local.clone()
                        } else {
                            local.in_type()
                        };
                        let xe = self.check(&x_local, x, clos.ty.clone())?;
                        let rty = clos.apply(x.eval(&local.env));
                        Ok((rty, if runtime { fe.app(xe) } else { fe }))
                    }
                    Val::Fun(clos) if matches!(clos.class, Pi(_)) => {
                        Err(ElabError::PlicityMismatch(self.show(local, &fty)))
                    }
                    fty => Err(ElabError::NotAFunction(self.show(local, &fty))),
                }
            }

            Term::Fun(clos) => {
                self.check(&local.in_type(), &clos.ty, Val::Type)?;
                let vty = clos.ty.eval(&local.env);
                match clos.class {
                    Lam(icit) => {
                        let erased = clos.erased || icit == Impl;
                        let inner = local.bind(clos.name.clone(), vty, erased, false);
                        let (bty, be) = self.infer(&inner, &clos.body)?;
                        let bty = inner.quote(bty, &self.mcxt);
                        let pi = Term::fun(Pi(icit), clos.name.clone(), clos.erased, (*clos.ty).clone(), bty);
                        let e = if erased {
                            be
                        } else {
                            Erased::Abs(clos.name.clone(), Box::new(be))
                        };
                        Ok((pi.eval(&local.env), e))
                    }
                    Pi(_) | Sigma => {
                        let inner = local.in_type().bind(clos.name.clone(), vty, false, false);
                        self.check(&inner, &clos.body, Val::Type)?;
                        Ok((Val::Type, Erased::Type))
                    }
                }
            }

            Term::Pair(a, b, ty) => {
                self.check(&local.in_type(), ty, Val::Type)?;
                let vty = ty.eval(&local.env);
                match vty.clone().force(&self.mcxt) {
                    Val::Fun(clos) if clos.class == Sigma => {
                        let a_local = if clos.erased {
                            local.in_type()
                        } else {
                            local.clone()
                        };
                        let ae = self.check(&a_local, a, clos.ty.clone())?;
                        let be = self.check(local, b, clos.apply(a.eval(&local.env)))?;
                        let ae = if clos.erased { Erased::Type } else { ae };
                        Ok((vty, Erased::Pair(Box::new(ae), Box::new(be))))
                    }
                    v => Err(ElabError::NotASigma(self.show(local, &v))),
                }
            }

            Term::Proj(x, p) => {
                let (xty, xe) = self.infer(local, x)?;
                match xty.force(&self.mcxt) {
                    Val::Fun(clos) if clos.class == Sigma => match p {
                        Proj::Fst => {
                            if clos.erased && !local.in_type {
                                return Err(ElabError::ErasedUsage(clos.name.clone()));
                            }
                            Ok((clos.ty.clone(), Erased::Fst(Box::new(xe))))
                        }
                        Proj::Snd => {
                            let fst = (**x).clone().proj(Proj::Fst).eval(&local.env);
                            Ok((clos.apply(fst), Erased::Snd(Box::new(xe))))
                        }
                    },
                    v => Err(ElabError::NotASigma(self.show(local, &v))),
                }
            }

            Term::Let(name, erased, ty, val, body) => {
                self.check(&local.in_type(), ty, Val::Type)?;
                let vty = ty.eval(&local.env);
                let val_local = if *erased {
                    local.in_type()
                } else {
                    local.clone()
                };
                let ve = self.check(&val_local, val, vty.clone())?;
                let inner = local.define(name.clone(), vty, *erased, val.eval(&local.env));
                let (bty, be) = self.infer(&inner, body)?;
                let e = if *erased {
                    be
                } else {
                    Erased::Let(name.clone(), Box::new(ve), Box::new(be))
                };
                Ok((bty, e))
            }

            Term::PrimElim(elim, motive, scrut, cases) => {
                if cases.len() != elim.num_cases() {
                    return Err(ElabError::WrongCaseCount {
                        elim: elim.to_string(),
                        expected: elim.num_cases(),
                        found: cases.len(),
                    });
                }
                let (se, heq) = match elim.scrut_ty() {
                    Some(ty) => (self.check(local, scrut, ty)?, None),
                    None => {
                        let (ty, se) = self.infer(local, scrut)?;
                        match prims::HEqArgs::from_ty(&ty.clone().force(&self.mcxt)) {
                            Some(h) => {
                                self.conv(local, h.a_ty.clone(), h.b_ty.clone())?;
                                (se, Some(h))
                            }
                            None => return Err(ElabError::NotAnEquality(self.show(local, &ty))),
                        }
                    }
                };
                self.check(&local.in_type(), motive, elim.motive_ty(heq.as_ref()))?;
                let sig = elim.sig(
                    &motive.eval(&local.env),
                    &scrut.eval(&local.env),
                    heq.as_ref(),
                );
                let mut ces = Vec::new();
                for (c, ty) in cases.iter().zip(sig.case_tys) {
                    ces.push(self.check(local, c, ty)?);
                }
                let mut ces = ces.into_iter();
                let mut case = || ces.next().map(Box::new).unwrap_or_else(|| Box::new(Erased::Type));
                let e = match elim {
                    PrimElim::Void => se,
                    PrimElim::Bool => {
                        let t = case();
                        Erased::If(Box::new(se), t, case())
                    }
                    PrimElim::Nat => {
                        let z = case();
                        Erased::ElimNat(Box::new(se), z, case())
                    }
                    PrimElim::HEq => *case(),
                };
                Ok((sig.result, e))
            }
        }
    }
}
