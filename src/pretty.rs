//! Styled documents that track precedence, for printing terms, values and errors.
use yansi::{Color, Style};

pub trait IntoStyle {
    fn into_style(self) -> Option<Style>;
}
impl IntoStyle for Style {
    fn into_style(self) -> Option<Style> {
        Some(self)
    }
}
impl IntoStyle for () {
    fn into_style(self) -> Option<Style> {
        None
    }
}

/// How tightly a piece of syntax binds; `Atom`s never need parentheses.
#[derive(PartialOrd, PartialEq, Eq, Ord, Clone, Copy, Debug)]
pub enum Prec {
    Term,
    Pair,
    App,
    Atom,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Text(String, Option<Style>),
    Newline,
    Nested(Doc),
}

/// Text plus the precedence of the syntax it prints, so callers know when to add parentheses.
///
/// A style set with `style()` covers every part that doesn't carry its own, nested documents included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Doc {
    parts: Vec<Part>,
    prec: Prec,
    style: Option<Style>,
}

impl Doc {
    pub fn style_keyword() -> Style {
        Color::Magenta.style().bold()
    }

    pub fn style_literal() -> Style {
        Color::Cyan.style()
    }

    pub fn style_error() -> Style {
        Color::Red.style().bold()
    }

    fn render(&self, styled: bool, outer: Option<Style>, buf: &mut String) {
        let current = self.style.or(outer);
        for part in &self.parts {
            match part {
                Part::Text(text, style) => match style.or(current) {
                    Some(s) if styled => buf.push_str(&s.paint(text).to_string()),
                    _ => buf.push_str(text),
                },
                Part::Newline => buf.push('\n'),
                Part::Nested(doc) => doc.render(styled, current, buf),
            }
        }
    }

    /// Renders the document, with terminal colors if `styled`
    pub fn to_string(&self, styled: bool) -> String {
        let mut buf = String::new();
        self.render(styled, None, &mut buf);
        buf
    }

    pub fn none() -> Self {
        Doc {
            parts: Vec::new(),
            prec: Prec::Atom,
            style: None,
        }
    }

    /// A single piece of text
    pub fn start<D: std::fmt::Display>(x: D) -> Self {
        Doc::none().add(x, ())
    }

    /// Joins `docs` with `sep` between each pair
    pub fn intersperse(docs: impl IntoIterator<Item = Self>, sep: Self) -> Self {
        let mut parts = Vec::new();
        for (i, d) in docs.into_iter().enumerate() {
            if i > 0 {
                parts.push(Part::Nested(sep.clone()));
            }
            parts.push(Part::Nested(d));
        }
        Doc {
            parts,
            prec: Prec::Term,
            style: None,
        }
    }

    /// Wraps the document in parentheses if it binds looser than `prec`
    pub fn nest(self, prec: Prec) -> Self {
        if prec > self.prec {
            Doc::start('(').chain(self).add(')', ())
        } else {
            self
        }
    }

    pub fn add<D: std::fmt::Display, S: IntoStyle>(mut self, x: D, style: S) -> Self {
        self.parts.push(Part::Text(x.to_string(), style.into_style()));
        self
    }

    pub fn style(self, style: impl IntoStyle) -> Self {
        Doc {
            style: style.into_style().or(self.style),
            ..self
        }
    }

    /// Appends another document; the precedence is left for the caller to set
    pub fn chain(mut self, x: Self) -> Self {
        self.parts.push(Part::Nested(x));
        self
    }

    pub fn prec(self, prec: Prec) -> Self {
        Doc { prec, ..self }
    }

    pub fn hardline(mut self) -> Self {
        self.parts.push(Part::Newline);
        self
    }

    pub fn space(self) -> Self {
        self.add(' ', ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parens_follow_precedence() {
        let d = Doc::start("f").space().add("x", ()).prec(Prec::App);
        assert_eq!(d.clone().nest(Prec::App).to_string(false), "f x");
        assert_eq!(d.nest(Prec::Atom).to_string(false), "(f x)");
        assert_eq!(Doc::start("x").nest(Prec::Atom).to_string(false), "x");
    }

    #[test]
    fn joining() {
        let d = Doc::intersperse([Doc::start(1), Doc::start(2), Doc::start(3)], Doc::start(", "));
        assert_eq!(d.to_string(false), "1, 2, 3");
        assert_eq!(Doc::intersperse(Vec::new(), Doc::start(", ")).to_string(false), "");
        let d = Doc::start("a").hardline().add("b", ());
        assert_eq!(d.to_string(false), "a\nb");
    }

    #[test]
    fn styles_only_when_asked() {
        let d = Doc::none().add("Type", Doc::style_keyword());
        assert_eq!(d.to_string(false), "Type");
        assert!(d.to_string(true).contains("Type"));
        assert_ne!(d.to_string(true), "Type");
    }

    #[test]
    fn inner_styles_win() {
        let inner = Doc::start("k").style(Doc::style_keyword());
        let d = Doc::start("x").chain(inner).style(Doc::style_literal());
        let expected = format!(
            "{}{}",
            Doc::style_literal().paint("x"),
            Doc::style_keyword().paint("k")
        );
        assert_eq!(d.to_string(true), expected);
    }
}
