use codemap::Span;

use crate::error::{SassError, SassErrorKind, SassResult};
use crate::lexer::Lexer;
use crate::selector::{Combinator, CompoundSelector, ComplexComponent, ComplexSelector, SelectorList, SimpleSelector};
use crate::utils::eat_ident;

/// Parses already-interpolation-resolved selector text (`.a.b > .c, &:hover`)
/// into a `SelectorList` (§4.C `SelectorParser`). Interpolation itself is
/// resolved by the evaluator before this runs, since `#{...}` may splice in
/// arbitrary text including combinators — this parser only ever sees plain
/// CSS-selector syntax plus `&`/`%placeholder`.
pub(crate) struct SelectorParser<'a> {
    lexer: Lexer<'a>,
    span: Span,
}

impl<'a> SelectorParser<'a> {
    pub fn new(lexer: Lexer<'a>, span: Span) -> Self {
        SelectorParser { lexer, span }
    }

    pub fn parse(mut self) -> SassResult<SelectorList> {
        let mut complexes = Vec::new();
        loop {
            self.lexer.scan_whitespace();
            complexes.push(self.parse_complex()?);
            self.lexer.scan_whitespace();
            if !self.lexer.scan_char(',') {
                break;
            }
        }
        Ok(SelectorList(complexes))
    }

    fn parse_complex(&mut self) -> SassResult<ComplexSelector> {
        let mut components = Vec::new();
        loop {
            self.lexer.scan_whitespace();
            match self.peek_combinator() {
                Some(comb) => {
                    components.push(ComplexComponent::Combinator(comb));
                    self.lexer.scan_whitespace();
                    continue;
                }
                None => {}
            }
            match self.lexer.peek(0) {
                None | Some(',') | Some('{') => break,
                _ => {
                    let compound = self.parse_compound()?;
                    if compound.0.is_empty() {
                        break;
                    }
                    components.push(ComplexComponent::Compound(compound));
                }
            }
        }
        Ok(ComplexSelector(components))
    }

    fn peek_combinator(&mut self) -> Option<Combinator> {
        match self.lexer.peek(0) {
            Some('>') => {
                self.lexer.advance(1);
                Some(Combinator::Child)
            }
            Some('+') => {
                self.lexer.advance(1);
                Some(Combinator::NextSibling)
            }
            Some('~') => {
                self.lexer.advance(1);
                Some(Combinator::SubsequentSibling)
            }
            _ => None,
        }
    }

    fn parse_compound(&mut self) -> SassResult<CompoundSelector> {
        let mut simples = Vec::new();
        loop {
            match self.lexer.peek(0) {
                Some('&') => {
                    self.lexer.advance(1);
                    simples.push(SimpleSelector::Parent);
                }
                Some('*') => {
                    self.lexer.advance(1);
                    simples.push(SimpleSelector::Universal);
                }
                Some('.') => {
                    self.lexer.advance(1);
                    let name = eat_ident(&mut self.lexer).ok_or_else(|| self.err("expected class name"))?;
                    simples.push(SimpleSelector::Class(name));
                }
                Some('#') => {
                    self.lexer.advance(1);
                    let name = eat_ident(&mut self.lexer).ok_or_else(|| self.err("expected id name"))?;
                    simples.push(SimpleSelector::Id(name));
                }
                Some('%') => {
                    self.lexer.advance(1);
                    let name = eat_ident(&mut self.lexer).ok_or_else(|| self.err("expected placeholder name"))?;
                    simples.push(SimpleSelector::Placeholder(name));
                }
                Some('[') => {
                    let start = self.lexer.cursor();
                    self.lexer.advance(1);
                    while let Some(c) = self.lexer.peek(0) {
                        if c == ']' {
                            self.lexer.advance(1);
                            break;
                        }
                        self.lexer.advance(1);
                    }
                    let text = self.lexer.substring(start + 1);
                    let text = text.trim_end_matches(']').to_string();
                    simples.push(SimpleSelector::Attribute(text));
                }
                Some(':') => {
                    self.lexer.advance(1);
                    let is_element = self.lexer.scan_char(':');
                    let name = eat_ident(&mut self.lexer).ok_or_else(|| self.err("expected pseudo name"))?;
                    let mut args = None;
                    let mut nested = None;
                    if self.lexer.scan_char('(') {
                        let start = self.lexer.cursor();
                        let mut depth = 1i32;
                        while depth > 0 {
                            match self.lexer.peek(0) {
                                Some('(') => {
                                    depth += 1;
                                    self.lexer.advance(1);
                                }
                                Some(')') => {
                                    depth -= 1;
                                    self.lexer.advance(1);
                                }
                                Some(_) => {
                                    self.lexer.advance(1);
                                }
                                None => return Err(self.err("expected \")\".")),
                            }
                        }
                        let inner = self.lexer.substring(start);
                        let inner = &inner[..inner.len() - 1];
                        if matches!(name.to_ascii_lowercase().as_str(), "not" | "is" | "matches" | "where" | "has" | "current" | "host" | "host-context" | "slotted") {
                            let mut sub_map = codemap::CodeMap::new();
                            let file = sub_map.add_file("<selector-arg>".into(), inner.to_string());
                            let sub_lexer = Lexer::new(file.clone(), inner);
                            nested = Some(Box::new(SelectorParser::new(sub_lexer, file.span).parse()?));
                        } else {
                            args = Some(inner.to_string());
                        }
                    }
                    simples.push(if is_element {
                        SimpleSelector::PseudoElement { name, args }
                    } else {
                        SimpleSelector::PseudoClass { name, args, selector: nested }
                    });
                }
                Some(c) if c.is_alphabetic() || c == '_' || c == '-' || c == '\\' => {
                    let name = eat_ident(&mut self.lexer).ok_or_else(|| self.err("expected type selector"))?;
                    simples.push(SimpleSelector::Type(name));
                }
                _ => break,
            }
        }
        Ok(CompoundSelector(simples))
    }

    fn err(&self, msg: &str) -> SassError {
        SassError::new(SassErrorKind::Parse, msg.to_string(), self.span)
    }
}

/// Parse a resolved selector string directly (used by `@extend` and by the
/// evaluator after interpolation has already been substituted into plain
/// text).
pub(crate) fn parse_selector_list(text: &str, span: Span) -> SassResult<SelectorList> {
    let mut map = codemap::CodeMap::new();
    let file = map.add_file("<selector>".into(), text.to_string());
    let lexer = Lexer::new(file, text);
    SelectorParser::new(lexer, span).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    #[test]
    fn parses_compound_with_class_and_pseudo() {
        let list = parse_selector_list(".a.b:hover", span()).unwrap();
        assert_eq!(list.to_string(), ".a.b:hover");
    }

    #[test]
    fn parses_comma_separated_list_with_combinators() {
        let list = parse_selector_list(".a > .b, .c + .d", span()).unwrap();
        assert_eq!(list.0.len(), 2);
        assert_eq!(list.to_string(), ".a > .b, .c + .d");
    }

    #[test]
    fn parses_ampersand_parent_reference() {
        let list = parse_selector_list("&:hover", span()).unwrap();
        assert_eq!(list.to_string(), "&:hover");
    }
}
