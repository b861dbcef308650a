use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::common::{Name, Span};
use crate::elab::{Meta, Size, Term};
use crate::pretty::Doc;

/// Renders a core term in an error message, using `names` for local variables when available
fn show(t: &Term, size: Size, names: &Option<im::Vector<Name>>) -> String {
    let names = match names {
        Some(names) if names.len() == size.as_u32() as usize => names.clone(),
        _ => (0..size.as_u32()).map(|l| Name::from(format!("${}", l))).collect(),
    };
    t.pretty(&names).to_string(false)
}

fn show_list<T: std::fmt::Display>(xs: &[T]) -> String {
    xs.iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElabError {
    /// The only error that can be recovered from: the two sides just aren't equal
    #[error("could not match {} with {}", show(lhs, *size, names), show(rhs, *size, names))]
    Conversion {
        size: Size,
        lhs: Term,
        rhs: Term,
        names: Option<im::Vector<Name>>,
    },
    #[error("variable {var} is not in scope in the solution of {meta}")]
    Scope { meta: Meta, var: String },
    #[error("{meta} occurs in its own solution")]
    Occurs { meta: Meta },
    #[error("{meta} is applied to the same variable more than once")]
    NonLinearSpine { meta: Meta },
    #[error("name not found: {0}")]
    UnboundVariable(Name),
    #[error("erased variable {0} used in a runtime position")]
    ErasedUsage(Name),
    #[error("expected a function type in application, got {0}")]
    NotAFunction(String),
    #[error("plicity mismatch: {0}")]
    PlicityMismatch(String),
    #[error("expected a sigma type in projection, got {0}")]
    NotASigma(String),
    #[error("no field named {name} in {ty}")]
    FieldNotFound { name: String, ty: String },
    #[error("{elim} expects {expected} cases, got {found}")]
    WrongCaseCount {
        elim: String,
        expected: usize,
        found: usize,
    },
    #[error("expected an equality, got {0}")]
    NotAnEquality(String),
    #[error("hole ?{0} appears more than once")]
    DuplicateHole(Name),
    #[error("no instance found for ?{hole} : {ty}")]
    NoInstance { hole: Name, ty: String },
    #[error("unsolved holes: {}", show_list(holes))]
    UnsolvedHoles { holes: Vec<String> },
    #[error("unsolved metas: {}", show_list(metas))]
    UnsolvedMetas { metas: Vec<Meta> },
    #[error("unsolved constraints remain on {}", show_list(metas))]
    UnsolvedConstraints { metas: Vec<Meta> },
    #[error("cannot redefine global {0}")]
    Redefinition(Name),
    #[error("global {0} is still used by {1}")]
    StillUsed(Name, Name),
    #[error("verification failed: {0}")]
    Verification(Box<ElabError>),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("{error}")]
    At { span: Span, error: Box<ElabError> },
}
impl ElabError {
    /// Soft errors are caught by transactions and postponement; everything else goes straight to the top level
    pub fn is_soft(&self) -> bool {
        match self {
            ElabError::Conversion { .. } => true,
            ElabError::At { error, .. } => error.is_soft(),
            _ => false,
        }
    }

    /// Attaches a source location, unless there already is a more precise one
    pub fn at(self, span: Span) -> ElabError {
        match self {
            ElabError::At { .. } => self,
            error => ElabError::At {
                span,
                error: Box::new(error),
            },
        }
    }

    /// Attaches names for the local variables in a conversion error
    pub fn with_names(self, new: &im::Vector<Name>) -> ElabError {
        match self {
            ElabError::Conversion {
                size,
                lhs,
                rhs,
                names: None,
            } => ElabError::Conversion {
                size,
                lhs,
                rhs,
                names: Some(new.clone()),
            },
            ElabError::At { span, error } => ElabError::At {
                span,
                error: Box::new(error.with_names(new)),
            },
            e => e,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            ElabError::At { span, .. } => Some(span.clone()),
            ElabError::Verification(e) => e.span(),
            _ => None,
        }
    }

    /// The error without its location
    pub fn inner(&self) -> &ElabError {
        match self {
            ElabError::At { error, .. } => error.inner(),
            e => e,
        }
    }

    pub fn pretty(&self) -> Doc {
        Doc::none()
            .add("Error", Doc::style_error())
            .add(": ", ())
            .add(self.inner(), ())
    }

    /// Writes an error report pointing into `source`
    pub fn report(&self, source: &str, w: impl std::io::Write) -> std::io::Result<()> {
        let span = self.span().unwrap_or(0..0);
        Report::build(ReportKind::Error, (), span.start)
            .with_message(self.inner())
            .with_label(
                Label::new(span)
                    .with_message("here")
                    .with_color(Color::Red),
            )
            .finish()
            .write(Source::from(source), w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv() -> ElabError {
        ElabError::Conversion {
            size: Size::zero() + 1,
            lhs: Term::var(0),
            rhs: Term::Type,
            names: None,
        }
    }

    #[test]
    fn softness() {
        assert!(conv().is_soft());
        assert!(conv().at(0..3).is_soft());
        assert!(!ElabError::Occurs { meta: Meta::new(0) }.is_soft());
        assert!(!ElabError::Internal("x".into()).at(1..2).is_soft());
    }

    #[test]
    fn innermost_span_wins() {
        let e = conv().at(4..5).at(0..10);
        assert_eq!(e.span(), Some(4..5));
    }

    #[test]
    fn messages() {
        assert_eq!(conv().to_string(), "could not match $0 with Type");
        let e = conv().with_names(&im::vector![Name::from("x")]);
        assert_eq!(e.to_string(), "could not match x with Type");
        assert_eq!(
            ElabError::NoInstance {
                hole: "eq".into(),
                ty: "Eq Nat".into()
            }
            .to_string(),
            "no instance found for ?eq : Eq Nat"
        );
    }

    #[test]
    fn report() {
        let e = ElabError::UnboundVariable("y".into()).at(3..4);
        let mut buf = Vec::new();
        e.report("\\x. y", &mut buf).unwrap();
        let s = String::from_utf8_lossy(&buf);
        assert!(s.contains("name not found: y"));
    }
}
