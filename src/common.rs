use std::{fmt, ops::Range, rc::Rc};

/// A byte range into the source text the surface term came from.
pub type Span = Range<usize>;

/// An interned-ish name. Cloning is cheap, since names are copied into every binder and context entry.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Rc<str>);
impl Name {
    pub fn new(s: &str) -> Name {
        Name(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_underscore(&self) -> bool {
        &*self.0 == "_"
    }

    /// A fresh variant of this name, used by the pretty-printer to avoid capture.
    /// `x` becomes `x$0`, `x$0` becomes `x$1` and so on. `_` never clashes so it stays as is.
    pub fn next(&self) -> Name {
        if self.is_underscore() {
            return self.clone();
        }
        if let Some(i) = self.0.rfind('$') {
            if let Ok(n) = self.0[i + 1..].parse::<u32>() {
                return Name(format!("{}${}", &self.0[..i], n + 1).into());
            }
        }
        Name(format!("{}$0", self.0).into())
    }
}
impl From<&str> for Name {
    fn from(s: &str) -> Name {
        Name::new(s)
    }
}
impl From<String> for Name {
    fn from(s: String) -> Name {
        Name(s.into())
    }
}
impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_name() {
        let x = Name::from("x");
        assert_eq!(x.next().as_str(), "x$0");
        assert_eq!(x.next().next().as_str(), "x$1");
        assert_eq!(Name::from("_").next().as_str(), "_");
        assert_eq!(Name::from("a$b").next().as_str(), "a$b$0");
    }
}
