//! An elaborator for a small dependently typed language, with implicit arguments, erasure and instance search.
//!
//! The parser lives elsewhere: everything here starts from a [`Surface`] term.
use std::rc::Rc;

use tracing::debug;

pub mod common;
pub mod config;
pub mod elab;
pub mod error;
pub mod pretty;

pub use crate::common::{Name, Span};
pub use crate::config::{Config, Flag};
pub use crate::elab::{Erased, GlobalEntry, GlobalEnv, Icit, PrimElim, SProj, Surface, Term, Val};
pub use crate::error::ElabError;

use crate::elab::*;
use crate::pretty::Doc;

/// A top-level definition, `name [: ty] = value`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Def {
    pub name: Name,
    pub erased: bool,
    pub ty: Option<Surface>,
    pub value: Surface,
}
impl Def {
    pub fn new(name: &str, value: Surface) -> Self {
        Def {
            name: name.into(),
            erased: false,
            ty: None,
            value,
        }
    }

    pub fn with_type(self, ty: Surface) -> Self {
        Def {
            ty: Some(ty),
            ..self
        }
    }

    pub fn erased(self) -> Self {
        Def {
            erased: true,
            ..self
        }
    }
}

/// Everything known about a typechecked expression
#[derive(Clone, Debug, PartialEq)]
pub struct Checked {
    pub term: Term,
    pub ty: Term,
    /// Only present if verification is turned on
    pub erased: Option<Erased>,
    pub normal: Term,
}

/// The global environment and meta store, shared by everything elaborated in a session
#[derive(Default)]
pub struct Session {
    pub config: Config,
    globals: GlobalEnv,
    mcxt: MetaCxt,
}
impl Session {
    pub fn new(config: Config) -> Self {
        Session {
            config,
            ..Default::default()
        }
    }

    pub fn globals(&self) -> &GlobalEnv {
        &self.globals
    }

    /// Elaborates a closed term, returning it along with its type
    pub fn elaborate(&mut self, tm: &Surface) -> Result<(Term, Val), ElabError> {
        self.elaborate_as(tm, false)
    }

    fn elaborate_as(&mut self, tm: &Surface, erased: bool) -> Result<(Term, Val), ElabError> {
        Cxt::new(&mut self.mcxt, &self.globals, &self.config).elab_top_as(tm, erased)
    }

    fn verify(&self, term: &Term, ty: &Val, erased: bool) -> Result<Erased, ElabError> {
        let mut verifier = Verifier::new(&self.globals);
        let (vty, e) = verifier
            .verify(term, erased)
            .map_err(|e| ElabError::Verification(Box::new(e)))?;
        verifier
            .same_type(vty, ty.clone())
            .map_err(|e| ElabError::Verification(Box::new(e)))?;
        Ok(e)
    }

    /// Elaborates, verifies and normalizes an expression
    pub fn typecheck(&mut self, tm: &Surface) -> Result<Checked, ElabError> {
        let (term, ty) = self.elaborate(tm)?;
        let erased = if self.config.verify {
            Some(self.verify(&term, &ty, false)?)
        } else {
            None
        };
        let env = Env::new(self.globals.clone());
        Ok(Checked {
            normal: term.normalize(&env, self.config.full_norm, &self.mcxt),
            ty: ty.quote(Size::zero(), false, &self.mcxt),
            term,
            erased,
        })
    }

    /// Adds definitions in order, each able to refer to the ones before it. Returns the names defined.
    ///
    /// Stops at the first definition that fails; the ones before it stay defined.
    pub fn define(&mut self, defs: &[Def]) -> Result<Vec<Name>, ElabError> {
        if !self.config.allow_redefinition {
            if let Some(d) = defs.iter().find(|d| self.globals.contains(&d.name)) {
                return Err(ElabError::Redefinition(d.name.clone()));
            }
        }
        let mut names = Vec::new();
        for d in defs {
            if self.globals.contains(&d.name) {
                if !self.config.allow_redefinition {
                    return Err(ElabError::Redefinition(d.name.clone()));
                }
                if let Some(user) = self.globals.dependents(&d.name).into_iter().next() {
                    return Err(ElabError::StillUsed(d.name.clone(), user));
                }
            }

            let tm = match &d.ty {
                Some(ty) => d.value.clone().ann(ty.clone()),
                None => d.value.clone(),
            };
            let (term, ty) = self.elaborate_as(&tm, d.erased)?;
            let erased_term = if self.config.verify {
                Some(self.verify(&term, &ty, d.erased)?)
            } else {
                None
            };
            let val = term.eval(&Env::new(self.globals.clone()));
            debug!(name = %d.name, term = %term.pretty(&im::Vector::new()).to_string(false), "define");
            self.globals.insert(
                d.name.clone(),
                GlobalEntry {
                    term,
                    val: Rc::new(val),
                    ty,
                    erased: d.erased,
                    erased_term,
                },
            );
            names.push(d.name.clone());
        }
        Ok(names)
    }

    /// Removes a definition nothing else refers to
    pub fn delete(&mut self, name: &Name) -> Result<(), ElabError> {
        if !self.globals.contains(name) {
            return Err(ElabError::UnboundVariable(name.clone()));
        }
        if let Some(user) = self.globals.dependents(name).into_iter().next() {
            return Err(ElabError::StillUsed(name.clone(), user));
        }
        self.globals.remove(name);
        Ok(())
    }

    /// Forgets every definition
    pub fn clear(&mut self) {
        self.globals = GlobalEnv::default();
        self.mcxt.reset();
    }

    pub fn lookup(&self, name: &Name) -> Option<&Rc<GlobalEntry>> {
        self.globals.get(name)
    }

    fn entry(&self, name: &Name) -> Result<&Rc<GlobalEntry>, ElabError> {
        self.lookup(name)
            .ok_or_else(|| ElabError::UnboundVariable(name.clone()))
    }

    pub fn type_of(&self, name: &Name) -> Result<Term, ElabError> {
        let entry = self.entry(name)?;
        Ok(entry.ty.clone().quote(Size::zero(), false, &self.mcxt))
    }

    pub fn term_of(&self, name: &Name) -> Result<Term, ElabError> {
        Ok(self.entry(name)?.term.clone())
    }

    /// The normal form of a definition's value; `full` unfolds other globals too
    pub fn normalize(&self, name: &Name, full: bool) -> Result<Term, ElabError> {
        let entry = self.entry(name)?;
        Ok((*entry.val).clone().quote(Size::zero(), full, &self.mcxt))
    }

    fn def_doc(&self, name: &Name, entry: &GlobalEntry) -> Doc {
        let names = im::Vector::new();
        Doc::none()
            .add(if entry.erased { "0 " } else { "" }, ())
            .add(name, ())
            .add(" : ", ())
            .chain(entry.ty.pretty(&names, &self.mcxt))
            .add(" = ", ())
            .chain(entry.term.pretty(&names))
    }

    /// Every definition, in the order they were added
    pub fn defs(&self) -> Doc {
        Doc::intersperse(
            self.globals.iter().map(|(n, e)| self.def_doc(n, e)),
            Doc::none().hardline(),
        )
    }
}
