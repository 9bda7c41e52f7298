use crate::common::normalize;
use crate::lexer::Lexer;

/// Consume whitespace/comments; thin re-export of `Lexer::scan_whitespace`
/// kept as a free function so parser modules read the way the teacher's
/// `utils::devour_whitespace(toks)` call sites did.
pub(crate) fn devour_whitespace(lexer: &mut Lexer<'_>) -> bool {
    lexer.scan_whitespace()
}

/// Scan a Sass identifier: `-`/`_`/alpha start, then alnum/`-`/`_`, with
/// escape sequences (`\XX`) passed through verbatim. Returns the raw
/// (non-normalized) text so callers can decide whether they need the
/// normalized form (variable/function/mixin names) or the literal form
/// (a plain CSS property like `-webkit-transform`).
pub(crate) fn eat_ident(lexer: &mut Lexer<'_>) -> Option<String> {
    let mut out = String::new();
    if lexer.peek(0) == Some('-') && lexer.peek(1) == Some('-') {
        out.push_str("--");
        lexer.advance(2);
    } else if lexer.peek(0) == Some('-') {
        out.push('-');
        lexer.advance(1);
    }
    let mut first = out.is_empty();
    loop {
        match lexer.peek(0) {
            Some(c) if c == '_' || c == '-' || c.is_alphanumeric() => {
                if first && c.is_ascii_digit() {
                    break;
                }
                out.push(c);
                lexer.advance(1);
                first = false;
            }
            Some('\\') => {
                out.push('\\');
                lexer.advance(1);
                if let Some(escaped) = lexer.peek(0) {
                    out.push(escaped);
                    lexer.advance(1);
                }
                first = false;
            }
            _ => break,
        }
    }
    if out.is_empty() || out == "-" || out == "--" {
        None
    } else {
        Some(out)
    }
}

/// Identifier lookup key: folds `_`/`-` per invariant 1.
pub(crate) fn eat_ident_normalized(lexer: &mut Lexer<'_>) -> Option<String> {
    eat_ident(lexer).map(|s| normalize(&s))
}

/// Scan a bare (non-quoted) number literal: `[+-]?\d*(\.\d+)?([eE][+-]?\d+)?`.
pub(crate) fn eat_number(lexer: &mut Lexer<'_>) -> Option<String> {
    let start_state = lexer.state();
    let mut out = String::new();
    if matches!(lexer.peek(0), Some('+') | Some('-')) {
        out.push(lexer.peek(0).unwrap());
        lexer.advance(1);
    }
    let mut saw_digit = false;
    while let Some(c) = lexer.peek(0) {
        if c.is_ascii_digit() {
            out.push(c);
            lexer.advance(1);
            saw_digit = true;
        } else {
            break;
        }
    }
    if lexer.peek(0) == Some('.') && lexer.peek(1).map_or(false, |c| c.is_ascii_digit()) {
        out.push('.');
        lexer.advance(1);
        while let Some(c) = lexer.peek(0) {
            if c.is_ascii_digit() {
                out.push(c);
                lexer.advance(1);
                saw_digit = true;
            } else {
                break;
            }
        }
    }
    if !saw_digit {
        lexer.backtrack(start_state);
        return None;
    }
    if matches!(lexer.peek(0), Some('e') | Some('E')) {
        let exp_state = lexer.state();
        let mut exp = String::from(lexer.peek(0).unwrap());
        lexer.advance(1);
        if matches!(lexer.peek(0), Some('+') | Some('-')) {
            exp.push(lexer.peek(0).unwrap());
            lexer.advance(1);
        }
        let mut exp_digits = String::new();
        while let Some(c) = lexer.peek(0) {
            if c.is_ascii_digit() {
                exp_digits.push(c);
                lexer.advance(1);
            } else {
                break;
            }
        }
        if exp_digits.is_empty() {
            lexer.backtrack(exp_state);
        } else {
            out.push_str(&exp);
            out.push_str(&exp_digits);
        }
    }
    Some(out)
}

/// Scan a CSS unit following a number: letters/`%`, stopping before an
/// identifier boundary.
pub(crate) fn eat_unit(lexer: &mut Lexer<'_>) -> String {
    if lexer.peek(0) == Some('%') {
        lexer.advance(1);
        return "%".to_string();
    }
    eat_ident(lexer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemap::CodeMap;

    fn lexer(src: &'static str) -> Lexer<'static> {
        let mut map = CodeMap::new();
        let file = map.add_file("t".into(), src.into());
        Box::leak(Box::new(map));
        Lexer::new(file, src)
    }

    #[test]
    fn eat_ident_reads_hyphenated_name() {
        let mut l = lexer("foo-bar: 1px");
        assert_eq!(eat_ident(&mut l), Some("foo-bar".to_string()));
    }

    #[test]
    fn eat_number_reads_decimal_and_exponent() {
        let mut l = lexer("1.5e3px");
        assert_eq!(eat_number(&mut l), Some("1.5e3".to_string()));
        assert_eq!(eat_unit(&mut l), "px");
    }

    #[test]
    fn eat_number_rejects_bare_dot() {
        let mut l = lexer(".foo");
        assert_eq!(eat_number(&mut l), None);
    }
}
