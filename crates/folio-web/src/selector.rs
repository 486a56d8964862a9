#![forbid(unsafe_code)]

//! CSS selectors for non-browser hosts.
//!
//! Parsing and matching are done by the `selectors` crate over scraper's
//! HTML selector implementation, so any element type that implements
//! [`selectors::Element`] with `Impl = Simple` can be matched. Pseudo-classes
//! that need interaction state (`:hover`, `:focus`) and pseudo-elements are
//! rejected when parsing.

use core::fmt;
use core::str::FromStr;

use cssparser::{BasicParseErrorKind, ParseError, ParseErrorKind, ParserInput};
use scraper::selector::Simple;
use selectors::matching::{
    self, IgnoreNthChildForInvalidation, MatchingContext, MatchingMode, NeedsSelectorFlags,
    QuirksMode,
};
use selectors::parser::{self, ParseRelative, SelectorList, SelectorParseErrorKind};
use selectors::{Element, NthIndexCache};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    Empty,
    UnexpectedEnd,
    Invalid {
        line: u32,
        column: u32,
        reason: String,
    },
}

impl SelectorError {
    fn from_parse_error(err: ParseError<'_, SelectorParseErrorKind<'_>>) -> Self {
        match err.kind {
            ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => Self::UnexpectedEnd,
            kind => Self::Invalid {
                line: err.location.line,
                column: err.location.column,
                reason: format!("{kind:?}"),
            },
        }
    }
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty selector"),
            Self::UnexpectedEnd => write!(f, "unexpected end of selector"),
            Self::Invalid {
                line,
                column,
                reason,
            } => write!(f, "invalid selector at {line}:{column}: {reason}"),
        }
    }
}

impl std::error::Error for SelectorError {}

/// Parser hooks; every default of [`parser::Parser`] applies.
struct HtmlSelectorParser;

impl<'i> parser::Parser<'i> for HtmlSelectorParser {
    type Impl = Simple;
    type Error = SelectorParseErrorKind<'i>;
}

/// A parsed selector list.
#[derive(Debug, Clone)]
pub struct Selector {
    list: SelectorList<Simple>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        if input.trim().is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut input = ParserInput::new(input);
        let mut css = cssparser::Parser::new(&mut input);
        SelectorList::parse(&HtmlSelectorParser, &mut css, ParseRelative::No)
            .map(|list| Self { list })
            .map_err(SelectorError::from_parse_error)
    }

    /// Whether `element` matches any selector in the list.
    pub fn matches<E: Element<Impl = Simple>>(&self, element: &E) -> bool {
        let mut nth_index_cache = NthIndexCache::default();
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut nth_index_cache,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            IgnoreNthChildForInvalidation::No,
        );
        matching::matches_selector_list(&self.list, element, &mut context)
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, NodeId};
    use crate::memory::MemoryDocument;
    use folio_core::geometry::Viewport;

    fn page() -> (MemoryDocument, Vec<NodeId>) {
        let mut doc = MemoryDocument::new(Viewport::new(0.0, 800.0, 600.0));
        let body = doc.body();
        let nav = doc.insert(body, "nav", &[("class", "navbar")]);
        let list = doc.insert(nav, "ul", &[("class", "nav-links")]);
        let about = doc.insert(list, "a", &[("href", "#about")]);
        let blog = doc.insert(list, "a", &[("href", "/blog")]);
        let shown = doc.insert(body, "div", &[("class", "reveal active")]);
        let hidden = doc.insert(body, "div", &[("class", "reveal")]);
        let form = doc.insert(body, "form", &[("id", "contact-form")]);
        let button = doc.insert(form, "button", &[("type", "submit")]);
        (
            doc,
            vec![body, nav, list, about, blog, shown, hidden, form, button],
        )
    }

    /// Indices into the fixture of the nodes matching `selector`.
    fn matching(selector: &str) -> Vec<usize> {
        let (doc, nodes) = page();
        let sel = Selector::parse(selector).unwrap();
        nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| doc.element(**node).is_some_and(|e| sel.matches(&e)))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn descendant_with_attribute_prefix() {
        assert_eq!(matching(r##".nav-links a[href^="#"]"##), vec![3]);
    }

    #[test]
    fn negated_class() {
        assert_eq!(matching(".reveal:not(.active)"), vec![6]);
    }

    #[test]
    fn id_and_attribute_equality() {
        assert_eq!(matching("#contact-form button[type='submit']"), vec![8]);
        assert_eq!(matching("form > button"), vec![8]);
        assert!(matching("body > button").is_empty());
    }

    #[test]
    fn selector_list() {
        assert_eq!(matching("nav, form"), vec![1, 7]);
    }

    #[test]
    fn names_are_case_insensitive_for_html() {
        assert_eq!(matching("[id]"), vec![7]);
        assert_eq!(matching("A[HREF]"), vec![3, 4]);
    }

    #[test]
    fn sibling_and_structural_selectors() {
        assert_eq!(matching("a + a"), vec![4]);
        assert_eq!(matching("a:first-child"), vec![3]);
        assert_eq!(matching("div ~ form"), vec![7]);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(Selector::parse("   ").unwrap_err(), SelectorError::Empty);
        assert!(Selector::parse("a:hover").is_err());
        assert!(Selector::parse("a::before").is_err());
        assert!(Selector::parse("a..b").is_err());
        assert!(Selector::parse("a >").is_err());
        assert!("nav > a".parse::<Selector>().is_ok());
    }
}
