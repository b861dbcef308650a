use tracing::{debug, trace};

use super::*;

fn peel(mut tm: &Surface) -> &Surface {
    while let Surface::Spanned(_, t) = tm {
        tm = t;
    }
    tm
}

impl Cxt<'_> {
    /// Elaborates a closed term and makes sure nothing is left unsolved.
    ///
    /// The returned term and type don't mention any metas.
    pub fn elab_top(&mut self, tm: &Surface) -> Result<(Term, Val), ElabError> {
        self.elab_top_as(tm, false)
    }

    /// Like `elab_top()`, but erased terms may use other erased terms
    pub fn elab_top_as(&mut self, tm: &Surface, erased: bool) -> Result<(Term, Val), ElabError> {
        self.mcxt.reset();
        self.holes.clear();
        let local = if erased {
            self.local().in_type()
        } else {
            self.local()
        };

        let (term, ty) = self.synth(&local, tm)?;
        self.retry_all()?;
        self.search_instances()?;
        self.retry_all()?;

        if self.mcxt.has_postponed() {
            return Err(ElabError::UnsolvedConstraints {
                metas: self.mcxt.postponed_metas(),
            });
        }

        let term = self.mcxt.zonk(&term, &local.env);
        let ty = local.quote(ty, self.mcxt);

        let holes: Vec<String> = self
            .holes
            .iter()
            .filter(|h| !self.mcxt.zonk(&h.term, &h.local.env).metas().is_empty())
            .map(|h| format!("?{} : {}", h.name, h.local.show(&h.ty, self.mcxt)))
            .collect();
        if !holes.is_empty() {
            return Err(ElabError::UnsolvedHoles { holes });
        }

        let mut metas = term.metas();
        for m in ty.metas() {
            if !metas.contains(&m) {
                metas.push(m);
            }
        }
        if !metas.is_empty() {
            return Err(ElabError::UnsolvedMetas { metas });
        }

        let ty = ty.eval(&local.env);
        Ok((term, ty))
    }

    pub fn check(&mut self, local: &Local, tm: &Surface, ty: Val) -> Result<Term, ElabError> {
        if !matches!(tm, Surface::Spanned(..)) {
            debug!(ty = %local.show(&ty, self.mcxt), "check");
            if self.config.show_envs {
                trace!(cxt = %local.dump(self.mcxt), "check");
            }
        }
        match (tm, ty.clone().force(self.mcxt)) {
            (Surface::Spanned(span, t), _) => self.check(local, t, ty).map_err(|e| e.at(span.clone())),

            (Surface::Type, Val::Type) => Ok(Term::Type),

            (Surface::Hole { name, instance }, _) => self.hole(local, name.as_ref(), *instance, ty),

            (Surface::Pair(a, b), Val::Fun(clos)) if clos.class == Sigma => {
                let a_local = if clos.erased {
                    local.in_type()
                } else {
                    local.clone()
                };
                let a = self.check(&a_local, a, clos.ty.clone())?;
                let va = a.eval(&local.env);
                let b = self.check(local, b, clos.apply(va))?;
                Ok(Term::Pair(
                    Rc::new(a),
                    Rc::new(b),
                    Rc::new(local.quote(ty, self.mcxt)),
                ))
            }

            (
                Surface::Abs {
                    icit,
                    erased,
                    name,
                    ty: None,
                    body,
                },
                Val::Fun(clos),
            ) if clos.class == Pi(*icit) && (clos.erased || !*erased) => {
                let name = if name.is_underscore() {
                    clos.name.clone()
                } else {
                    name.clone()
                };
                let inner = local.bind(
                    name.clone(),
                    clos.ty.clone(),
                    clos.erased || *icit == Impl,
                    false,
                );
                let body = self.check(&inner, body, clos.open(local.size()))?;
                Ok(Term::Fun(EClos {
                    class: Lam(*icit),
                    name,
                    erased: clos.erased,
                    ty: Rc::new(local.quote(clos.ty.clone(), self.mcxt)),
                    body: Rc::new(body),
                }))
            }

            // Insert an implicit lambda
            (_, Val::Fun(clos))
                if clos.class == Pi(Impl)
                    && !matches!(
                        peel(tm),
                        Surface::Abs { icit: Impl, .. } | Surface::Hole { .. }
                    ) =>
            {
                let inner = local.bind(clos.name.clone(), clos.ty.clone(), true, true);
                let body = self.check(&inner, tm, clos.open(local.size()))?;
                Ok(Term::Fun(EClos {
                    class: Lam(Impl),
                    name: clos.name.clone(),
                    erased: clos.erased,
                    ty: Rc::new(local.quote(clos.ty.clone(), self.mcxt)),
                    body: Rc::new(body),
                }))
            }

            (
                Surface::Let {
                    erased,
                    name,
                    ty: lty,
                    val,
                    body,
                },
                _,
            ) => {
                let (lty, vty, val) = self.let_binding(local, *erased, lty.as_deref(), val)?;
                let inner = local.define(name.clone(), vty, *erased, val.eval(&local.env));
                let body = self.check(&inner, body, ty)?;
                Ok(Term::Let(
                    name.clone(),
                    *erased,
                    Rc::new(lty),
                    Rc::new(val),
                    Rc::new(body),
                ))
            }

            _ => {
                let (term, sty) = self.synth(local, tm)?;
                self.subsume(local, term, sty, ty)
            }
        }
    }

    /// Checks that a term of type `sty` can be used at type `ty`, instantiating implicit arguments if needed
    fn subsume(&mut self, local: &Local, term: Term, sty: Val, ty: Val) -> Result<Term, ElabError> {
        let size = local.size();
        self.mcxt.push();
        let err = match self.unify(size, sty.clone(), ty.clone()) {
            Ok(()) => {
                self.mcxt.discard();
                return Ok(term);
            }
            Err(e) => {
                self.mcxt.pop();
                if !e.is_soft() {
                    return Err(e);
                }
                e.with_names(&local.names())
            }
        };
        debug!(ty = %local.show(&sty, self.mcxt), "retrying with implicit arguments");
        let args = self.attempt(|cxt| {
            let (ity, args) = cxt.inst(local, sty);
            cxt.unify(size, ity, ty)?;
            Ok(Some(args))
        })?;
        match args {
            Some(args) => Ok(args.into_iter().fold(term, |t, x| t.app(Impl, x))),
            None => Err(err),
        }
    }

    /// Applies a value of type `ty` to fresh metas for as many implicit arguments as it takes
    pub fn inst(&mut self, local: &Local, mut ty: Val) -> (Val, Vec<Term>) {
        let mut args = Vec::new();
        loop {
            match ty.clone().force(self.mcxt) {
                Val::Fun(clos) if clos.class == Pi(Impl) => {
                    let m = local.new_meta(self.mcxt);
                    ty = clos.apply(m.eval(&local.env));
                    args.push(m);
                }
                _ => break (ty, args),
            }
        }
    }

    /// A Pi type whose domain and codomain are fresh metas
    fn fresh_pi(&mut self, local: &Local, name: Name, icit: Icit, erased: bool) -> Val {
        let a = local.new_meta(self.mcxt);
        let va = a.eval(&local.env);
        let inner = local.bind(name.clone(), va, erased || icit == Impl, false);
        let b = inner.new_meta(self.mcxt);
        Term::fun(Pi(icit), name, erased, a, b).eval(&local.env)
    }

    fn hole(
        &mut self,
        local: &Local,
        name: Option<&Name>,
        instance: bool,
        ty: Val,
    ) -> Result<Term, ElabError> {
        let term = local.new_meta(self.mcxt);
        if let Some(name) = name {
            if self.holes.iter().any(|h| h.name == *name) {
                return Err(ElabError::DuplicateHole(name.clone()));
            }
            debug!(hole = %name, instance, ty = %local.show(&ty, self.mcxt), "hole");
            self.holes.push(Hole {
                name: name.clone(),
                term: term.clone(),
                ty,
                local: local.clone(),
                instance,
            });
        }
        Ok(term)
    }

    /// Elaborates the type and value of a let binding
    fn let_binding(
        &mut self,
        local: &Local,
        erased: bool,
        ty: Option<&Surface>,
        val: &Surface,
    ) -> Result<(Term, Val, Term), ElabError> {
        let val_local = if erased {
            local.in_type()
        } else {
            local.clone()
        };
        match ty {
            Some(ty) => {
                let ty = self.check(&local.in_type(), ty, Val::Type)?;
                let vty = ty.eval(&local.env);
                let val = self.check(&val_local, val, vty.clone())?;
                Ok((ty, vty, val))
            }
            None => {
                let (val, vty) = self.synth(&val_local, val)?;
                Ok((local.quote(vty.clone(), self.mcxt), vty, val))
            }
        }
    }

    fn var(&mut self, local: &Local, name: &Name) -> Result<(Term, Val), ElabError> {
        if let Some((idx, entry)) = local.lookup(name) {
            if entry.erased && !local.in_type {
                return Err(ElabError::ErasedUsage(name.clone()));
            }
            return Ok((Term::Var(idx), entry.ty.clone()));
        }
        if let Some(entry) = self.globals.get(name) {
            if entry.erased && !local.in_type {
                return Err(ElabError::ErasedUsage(name.clone()));
            }
            return Ok((Term::Global(name.clone()), entry.ty.clone()));
        }
        match Prim::from_name(name.as_str()) {
            Some(p) => Ok((Term::Prim(p), p.ty())),
            None => Err(ElabError::UnboundVariable(name.clone())),
        }
    }

    pub fn synth(&mut self, local: &Local, tm: &Surface) -> Result<(Term, Val), ElabError> {
        if let Surface::Spanned(span, t) = tm {
            return self.synth(local, t).map_err(|e| e.at(span.clone()));
        }
        if self.config.show_envs {
            trace!(cxt = %local.dump(self.mcxt), "synth");
        }
        let (term, ty) = self.synth_(local, tm)?;
        debug!(
            term = %term.pretty(&local.names()).to_string(false),
            ty = %local.show(&ty, self.mcxt),
            "synth"
        );
        Ok((term, ty))
    }

    fn synth_(&mut self, local: &Local, tm: &Surface) -> Result<(Term, Val), ElabError> {
        match tm {
            Surface::Spanned(..) => unreachable!("spans are peeled off by synth()"),
            Surface::Type => Ok((Term::Type, Val::Type)),
            Surface::NatLit(n) => Ok((Term::NatLit(*n), Val::prim(Prim::Nat))),
            Surface::Prim(p) => Ok((Term::Prim(*p), p.ty())),
            Surface::Var(name) => self.var(local, name),

            Surface::Hole { name, instance } => {
                let ty = local.new_meta(self.mcxt).eval(&local.env);
                let term = self.hole(local, name.as_ref(), *instance, ty.clone())?;
                Ok((term, ty))
            }

            Surface::App(f, icit, x) => {
                let (f, fty) = self.synth(local, f)?;
                self.synthapp(local, f, fty, *icit, x)
            }

            Surface::Abs {
                icit,
                erased,
                name,
                ty: Some(ty),
                body,
            } => {
                let ty = self.check(&local.in_type(), ty, Val::Type)?;
                let vty = ty.eval(&local.env);
                let inner = local.bind(name.clone(), vty, *erased || *icit == Impl, false);
                let (body, rty) = self.synth(&inner, body)?;
                let rty = inner.quote(rty, self.mcxt);
                let pi = Term::fun(Pi(*icit), name.clone(), *erased, ty.clone(), rty);
                Ok((
                    Term::fun(Lam(*icit), name.clone(), *erased, ty, body),
                    pi.eval(&local.env),
                ))
            }
            Surface::Abs {
                icit,
                erased,
                name,
                ty: None,
                ..
            } => {
                let pi = self.fresh_pi(local, name.clone(), *icit, *erased);
                let term = self.check(local, tm, pi.clone())?;
                Ok((term, pi))
            }

            Surface::Let {
                erased,
                name,
                ty,
                val,
                body,
            } => {
                let (lty, vty, val) = self.let_binding(local, *erased, ty.as_deref(), val)?;
                let inner = local.define(name.clone(), vty, *erased, val.eval(&local.env));
                let (body, rty) = self.synth(&inner, body)?;
                Ok((
                    Term::Let(
                        name.clone(),
                        *erased,
                        Rc::new(lty),
                        Rc::new(val),
                        Rc::new(body),
                    ),
                    rty,
                ))
            }

            Surface::Pi {
                icit,
                erased,
                name,
                ty,
                body,
            } => self.binder_type(local, Pi(*icit), *erased, name, ty, body),
            Surface::Sigma {
                erased,
                name,
                ty,
                body,
            } => self.binder_type(local, Sigma, *erased, name, ty, body),

            Surface::Pair(a, b) => {
                let (a, aty) = self.synth(local, a)?;
                let (b, bty) = self.synth(local, b)?;
                // The second component's type can't depend on the first, so quoting it one level deeper just shifts it
                let sigma = Term::fun(
                    Sigma,
                    "_",
                    false,
                    local.quote(aty, self.mcxt),
                    bty.quote(local.size().inc(), false, self.mcxt),
                );
                let vsigma = sigma.eval(&local.env);
                Ok((Term::Pair(Rc::new(a), Rc::new(b), Rc::new(sigma)), vsigma))
            }

            Surface::Proj(x, p) => self.project(local, x, p),

            Surface::Ann(x, ty) => {
                let ty = self.check(&local.in_type(), ty, Val::Type)?;
                let vty = ty.eval(&local.env);
                let x = self.check(local, x, vty.clone())?;
                Ok((x, vty))
            }

            Surface::Elim {
                elim,
                motive,
                scrut,
                cases,
            } => self.elim(local, *elim, motive.as_deref(), scrut, cases),
        }
    }

    fn binder_type(
        &mut self,
        local: &Local,
        class: FunClass,
        erased: bool,
        name: &Name,
        ty: &Surface,
        body: &Surface,
    ) -> Result<(Term, Val), ElabError> {
        let local = local.in_type();
        let ty = self.check(&local, ty, Val::Type)?;
        let vty = ty.eval(&local.env);
        let inner = local.bind(name.clone(), vty, false, false);
        let body = self.check(&inner, body, Val::Type)?;
        Ok((Term::fun(class, name.clone(), erased, ty, body), Val::Type))
    }

    pub fn synthapp(
        &mut self,
        local: &Local,
        f: Term,
        fty: Val,
        icit: Icit,
        x: &Surface,
    ) -> Result<(Term, Val), ElabError> {
        debug!(fty = %local.show(&fty, self.mcxt), icit = ?icit, "synthapp");
        match fty.clone().force(self.mcxt) {
            Val::Fun(clos) if clos.class == Pi(Impl) && icit == Expl => {
                let m = local.new_meta(self.mcxt);
                let fty = clos.apply(m.eval(&local.env));
                self.synthapp(local, f.app(Impl, m), fty, icit, x)
            }
            Val::Fun(clos) if clos.class == Pi(icit) => {
                let x_local = if clos.erased || icit == Impl {
                    local.in_type()
                } else {
                    local.clone()
                };
                let x = self.check(&x_local, x, clos.ty.clone())?;
                let rty = clos.apply(x.eval(&local.env));
                Ok((f.app(icit, x), rty))
            }
            Val::Fun(clos) if matches!(clos.class, Pi(_)) => Err(ElabError::PlicityMismatch(
                local.show(&fty, self.mcxt),
            )),
            fty @ Val::Ne(Head::Meta(_), _) => {
                let pi = self.fresh_pi(local, Name::new("_"), icit, false);
                self.unify(local.size(), fty, pi.clone())
                    .map_err(|e| e.with_names(&local.names()))?;
                self.synthapp(local, f, pi, icit, x)
            }
            fty => Err(ElabError::NotAFunction(local.show(&fty, self.mcxt))),
        }
    }

    fn project(&mut self, local: &Local, x: &Surface, p: &SProj) -> Result<(Term, Val), ElabError> {
        let (mut term, mut ty) = self.synth(local, x)?;
        let mut i = 0;
        loop {
            match ty.clone().force(self.mcxt) {
                Val::Fun(clos) if clos.class == Sigma => {
                    let found = match p {
                        SProj::Fst => true,
                        SProj::Snd => {
                            let fst = term.clone().proj(Proj::Fst).eval(&local.env);
                            return Ok((term.proj(Proj::Snd), clos.apply(fst)));
                        }
                        SProj::Name(n) => clos.name == *n,
                        SProj::Index(k) => *k == i,
                    };
                    if found {
                        if clos.erased && !local.in_type {
                            return Err(ElabError::ErasedUsage(clos.name.clone()));
                        }
                        return Ok((term.proj(Proj::Fst), clos.ty.clone()));
                    }
                    let fst = term.clone().proj(Proj::Fst).eval(&local.env);
                    ty = clos.apply(fst);
                    term = term.proj(Proj::Snd);
                    i += 1;
                }
                // The last component of a telescope has no Sigma of its own
                _ if i > 0 && *p == SProj::Index(i) => return Ok((term, ty)),
                _ if i > 0 => {
                    return Err(ElabError::FieldNotFound {
                        name: match p {
                            SProj::Name(n) => n.to_string(),
                            SProj::Index(k) => k.to_string(),
                            SProj::Fst | SProj::Snd => unreachable!(),
                        },
                        ty: local.show(&ty, self.mcxt),
                    })
                }
                fty => return Err(ElabError::NotASigma(local.show(&fty, self.mcxt))),
            }
        }
    }

    /// The motive to use when none is given: ignores its arguments and returns a fresh meta
    fn default_motive(&mut self, local: &Local, motive_ty: Val) -> Term {
        let mut inner = local.in_type();
        let mut binders = Vec::new();
        let mut mty = motive_ty;
        while let Val::Fun(clos) = mty.clone().force(self.mcxt) {
            binders.push((clos.name.clone(), inner.quote(clos.ty.clone(), self.mcxt)));
            let v = Val::var(inner.size().next_lvl());
            inner = inner.define(clos.name.clone(), clos.ty.clone(), false, v.clone());
            mty = clos.apply(v);
        }
        let body = inner.new_meta(self.mcxt);
        binders
            .into_iter()
            .rev()
            .fold(body, |body, (name, ty)| Term::lam(Expl, name, ty, body))
    }

    fn elim(
        &mut self,
        local: &Local,
        elim: PrimElim,
        motive: Option<&Surface>,
        scrut: &Surface,
        cases: &[Surface],
    ) -> Result<(Term, Val), ElabError> {
        if cases.len() != elim.num_cases() {
            return Err(ElabError::WrongCaseCount {
                elim: elim.to_string(),
                expected: elim.num_cases(),
                found: cases.len(),
            });
        }

        let (scrut, heq) = match elim.scrut_ty() {
            Some(ty) => (self.check(local, scrut, ty)?, None),
            None => {
                let (scrut, ty) = self.synth(local, scrut)?;
                let heq = match prims::HEqArgs::from_ty(&ty.clone().force(self.mcxt)) {
                    Some(h) => {
                        self.unify(local.size(), h.a_ty.clone(), h.b_ty.clone())
                            .map_err(|e| e.with_names(&local.names()))?;
                        h
                    }
                    None => {
                        // Make it an equation between two values of the same type
                        let a_ty = local.new_meta(self.mcxt);
                        let a = local.new_meta(self.mcxt);
                        let b = local.new_meta(self.mcxt);
                        let h = prims::HEqArgs {
                            a_ty: a_ty.eval(&local.env),
                            b_ty: a_ty.eval(&local.env),
                            a: a.eval(&local.env),
                            b: b.eval(&local.env),
                        };
                        let expected = Val::prim(Prim::HEq)
                            .app(Elim::App(Impl, h.a_ty.clone()))
                            .app(Elim::App(Impl, h.b_ty.clone()))
                            .app_expl(h.a.clone())
                            .app_expl(h.b.clone());
                        self.unify(local.size(), ty, expected)
                            .map_err(|e| e.with_names(&local.names()))?;
                        h
                    }
                };
                (scrut, Some(heq))
            }
        };
        let vscrut = scrut.eval(&local.env);

        let motive_ty = elim.motive_ty(heq.as_ref());
        let motive = match motive {
            Some(m) => self.check(&local.in_type(), m, motive_ty)?,
            None => self.default_motive(local, motive_ty),
        };
        let vmotive = motive.eval(&local.env);

        let sig = elim.sig(&vmotive, &vscrut, heq.as_ref());
        let cases = cases
            .iter()
            .zip(sig.case_tys)
            .map(|(c, ty)| self.check(local, c, ty))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((
            Term::PrimElim(elim, Rc::new(motive), Rc::new(scrut), cases),
            sig.result,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(tm: &Surface) -> Result<(Term, Val), ElabError> {
        let mut mcxt = MetaCxt::new();
        let globals = GlobalEnv::default();
        let config = Config::default();
        Cxt::new(&mut mcxt, &globals, &config).elab_top(tm)
    }

    fn nat() -> Surface {
        Surface::var("Nat")
    }

    fn show(t: &Term) -> String {
        t.pretty(&im::Vector::new()).to_string(false)
    }

    #[test]
    fn annotated_identity() {
        // (\x. x : Nat -> Nat) 3
        let id = Surface::lam("x", Surface::var("x")).ann(nat().arrow(nat()));
        let (t, ty) = run(&id.app(Surface::NatLit(3))).unwrap();
        assert_eq!(show(&t), "(\\x. x) 3");
        assert_eq!(
            ty.quote(Size::zero(), false, &MetaCxt::new()),
            Term::Prim(Prim::Nat)
        );
    }

    #[test]
    fn implicit_insertion() {
        // let id : {A : Type} -> A -> A = \x. x in id 3
        let id_ty = Surface::ipi("A", Surface::Type, Surface::var("A").arrow(Surface::var("A")));
        let tm = Surface::let_(
            "id",
            Some(id_ty),
            Surface::lam("x", Surface::var("x")),
            Surface::var("id").app(Surface::NatLit(3)),
        );
        let (t, ty) = run(&tm).unwrap();
        assert_eq!(
            show(&t),
            "let id : {A : Type} -> A -> A = \\{A}. \\x. x in id {Nat} 3"
        );
        assert!(ty.quote(Size::zero(), false, &MetaCxt::new()) == Term::Prim(Prim::Nat));
    }

    #[test]
    fn unannotated_lambda_is_unsolved() {
        let tm = Surface::lam("x", Surface::var("x"));
        assert!(matches!(run(&tm), Err(ElabError::UnsolvedMetas { .. })));
    }

    #[test]
    fn erased_variables_only_in_types() {
        // \{A : Type}. A  is fine in a type, not as a value
        let tm = Surface::Abs {
            icit: Impl,
            erased: false,
            name: "A".into(),
            ty: Some(Box::new(Surface::Type)),
            body: Box::new(Surface::var("A")),
        };
        assert_eq!(
            run(&tm).map(|_| ()).unwrap_err(),
            ElabError::ErasedUsage("A".into())
        );
        let tm = Surface::ipi("A", Surface::Type, Surface::var("A").arrow(Surface::var("A")));
        assert!(run(&tm).is_ok());
    }

    #[test]
    fn errors_carry_spans() {
        let tm = Surface::var("nope").spanned(4..8).app(Surface::Type).spanned(0..12);
        let e = run(&tm).unwrap_err();
        assert_eq!(e.span(), Some(4..8));
        assert_eq!(*e.inner(), ElabError::UnboundVariable("nope".into()));
    }

    #[test]
    fn mismatch_names_locals() {
        // \(x : Nat). (x : Bool)
        let tm = Surface::lam_ann("x", nat(), Surface::var("x").ann(Surface::var("Bool")));
        let e = run(&tm).unwrap_err();
        assert!(e.is_soft());
        assert_eq!(e.to_string(), "could not match Nat with Bool");
    }

    #[test]
    fn not_a_function() {
        let tm = Surface::NatLit(1).app(Surface::NatLit(2));
        assert_eq!(
            run(&tm).map(|_| ()).unwrap_err(),
            ElabError::NotAFunction("Nat".into())
        );
    }

    #[test]
    fn projections_by_name_and_index() {
        // ((1, (True, 2)) : (a : Nat) ** (b : Bool) ** Nat).b
        let ty = Surface::sigma("a", nat(), Surface::sigma("b", Surface::var("Bool"), nat()));
        let p = Surface::pair(
            Surface::NatLit(1),
            Surface::pair(Surface::var("True"), Surface::NatLit(2)),
        )
        .ann(ty);
        let (_, t) = run(&p.clone().proj(SProj::Name("b".into()))).unwrap();
        assert!(t.force(&MetaCxt::new()).is_prim(Prim::Bool));
        let (_, t) = run(&p.clone().proj(SProj::Index(2))).unwrap();
        assert_eq!(t.quote(Size::zero(), false, &MetaCxt::new()), Term::Prim(Prim::Nat));
        assert!(matches!(
            run(&p.clone().proj(SProj::Name("c".into()))),
            Err(ElabError::FieldNotFound { .. })
        ));
        assert!(matches!(
            run(&Surface::NatLit(0).proj(SProj::Fst)),
            Err(ElabError::NotASigma(_))
        ));
    }

    #[test]
    fn elim_without_motive() {
        // elimBool True 1 0
        let tm = Surface::elim(
            PrimElim::Bool,
            None,
            Surface::var("True"),
            vec![Surface::NatLit(1), Surface::NatLit(0)],
        );
        let (t, ty) = run(&tm).unwrap();
        assert_eq!(ty.quote(Size::zero(), false, &MetaCxt::new()), Term::Prim(Prim::Nat));
        assert_eq!(
            t.normalize(&Env::default(), false, &MetaCxt::new()),
            Term::NatLit(1)
        );
        let bad = Surface::elim(PrimElim::Bool, None, Surface::var("True"), vec![]);
        assert!(matches!(run(&bad), Err(ElabError::WrongCaseCount { expected: 2, found: 0, .. })));
    }

    #[test]
    fn duplicate_holes() {
        let tm = Surface::pair(Surface::named_hole("h"), Surface::named_hole("h"));
        assert_eq!(
            run(&tm).map(|_| ()).unwrap_err(),
            ElabError::DuplicateHole("h".into())
        );
    }

    #[test]
    fn unfilled_hole_is_reported() {
        let tm = Surface::named_hole("goal").ann(nat());
        match run(&tm) {
            Err(ElabError::UnsolvedHoles { holes }) => assert_eq!(holes, ["?goal : Nat"]),
            r => panic!("expected unsolved holes, got {:?}", r.map(|_| ())),
        }
    }
}
