pub(crate) mod at_root;
pub(crate) mod keyframes;
pub(crate) mod media;
pub(crate) mod selector;

use std::sync::Arc;

use codemap::{File, Span, Spanned};

use crate::args::FuncArgs;
use crate::ast::{Argument, Expr, ImportArg, Interpolation, InterpolationPart, Stmt, UseNamespace};
use crate::atrule::if_rule::{Branch, If};
use crate::atrule::{AtRule, Function, Mixin, UnknownAtRule};
use crate::common::{Brackets, ListSeparator, Op, QuoteKind, Syntax};
use crate::environment::Scope;
use crate::error::{SassError, SassErrorKind, SassResult};
use crate::lexer::Lexer;
use crate::unit::Unit;
use crate::utils::{devour_whitespace, eat_ident, eat_number, eat_unit};
use crate::value::SassColor;

/// Recursive-descent parser shared by every dialect (§4.C). One pass
/// produces the full `Spanned<Stmt>` tree; name resolution is deferred to
/// the evaluator (§4.C "Open Question resolved": no speculative eager
/// binding here).
pub(crate) struct StyleSheetParser<'a> {
    lexer: Lexer<'a>,
    file: Arc<File>,
    syntax: Syntax,
}

impl<'a> StyleSheetParser<'a> {
    pub fn new(file: Arc<File>, buf: &'a str, syntax: Syntax) -> Self {
        StyleSheetParser {
            lexer: Lexer::new(file.clone(), buf),
            file,
            syntax,
        }
    }

    fn span(&self, start: usize) -> Span {
        self.file.span.subspan(start as u64, self.lexer.cursor() as u64)
    }

    fn err(&self, msg: impl Into<String>, span: Span) -> SassError {
        SassError::new(SassErrorKind::Parse, msg, span)
    }

    pub fn parse(mut self) -> SassResult<Vec<Spanned<Stmt>>> {
        self.parse_statements(true)
    }

    fn parse_statements(&mut self, toplevel: bool) -> SassResult<Vec<Spanned<Stmt>>> {
        let mut stmts = Vec::new();
        loop {
            devour_whitespace(&mut self.lexer);
            match self.lexer.peek(0) {
                None => break,
                Some('}') => {
                    if toplevel {
                        return Err(self.err("unmatched \"}\".", self.current_span()));
                    }
                    break;
                }
                _ => {}
            }
            if let Some(stmt) = self.parse_statement()? {
                stmts.push(stmt);
            }
        }
        Ok(stmts)
    }

    fn current_span(&self) -> Span {
        self.span(self.lexer.cursor())
    }

    fn parse_block(&mut self) -> SassResult<Vec<Spanned<Stmt>>> {
        devour_whitespace(&mut self.lexer);
        self.lexer.expect_char('{', self.current_span())?;
        let stmts = self.parse_statements(false)?;
        devour_whitespace(&mut self.lexer);
        self.lexer.expect_char('}', self.current_span())?;
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> SassResult<Option<Spanned<Stmt>>> {
        let start = self.lexer.cursor();
        devour_whitespace(&mut self.lexer);

        match self.lexer.peek(0) {
            Some('/') if self.lexer.peek(1) == Some('/') => {
                let text = self.read_silent_comment();
                return Ok(Some(Spanned { node: Stmt::SilentComment(text), span: self.span(start) }));
            }
            Some('/') if self.lexer.peek(1) == Some('*') => {
                let text = self.read_loud_comment();
                return Ok(Some(Spanned { node: Stmt::LoudComment(text), span: self.span(start) }));
            }
            Some('$') => {
                let stmt = self.parse_variable_decl()?;
                return Ok(Some(Spanned { node: stmt, span: self.span(start) }));
            }
            Some('@') => {
                let stmt = self.parse_at_rule()?;
                return Ok(stmt.map(|node| Spanned { node, span: self.span(start) }));
            }
            _ => {}
        }

        let prelude_start = self.lexer.cursor();
        let terminator = self.scan_prelude_until_brace_or_semi()?;
        let prelude = self.lexer.substring(prelude_start).trim().to_string();

        if prelude.is_empty() && terminator == ';' {
            return Ok(None);
        }

        match terminator {
            ';' => {
                let (prop, value_src) = split_top_level_colon(&prelude)
                    .ok_or_else(|| self.err("Expected \":\".", self.span(prelude_start)))?;
                let value = parse_value_str(value_src.trim(), self.span(prelude_start))?;
                Ok(Some(Spanned {
                    node: Stmt::Declaration {
                        property: Interpolation::plain(prop.trim().to_string()),
                        value,
                    },
                    span: self.span(start),
                }))
            }
            '{' => {
                if let Some((prop, value_src)) = split_top_level_colon_simple(&prelude) {
                    let value = if value_src.trim().is_empty() {
                        None
                    } else {
                        Some(parse_value_str(value_src.trim(), self.span(prelude_start))?)
                    };
                    let body = self.parse_statements(false)?;
                    devour_whitespace(&mut self.lexer);
                    self.lexer.expect_char('}', self.current_span())?;
                    Ok(Some(Spanned {
                        node: Stmt::DeclarationBlock {
                            property: Interpolation::plain(prop.trim().to_string()),
                            value,
                            body,
                        },
                        span: self.span(start),
                    }))
                } else {
                    let body = self.parse_statements(false)?;
                    devour_whitespace(&mut self.lexer);
                    self.lexer.expect_char('}', self.current_span())?;
                    Ok(Some(Spanned {
                        node: Stmt::RuleSet {
                            selector: Interpolation::plain(prelude),
                            body,
                        },
                        span: self.span(start),
                    }))
                }
            }
            _ => unreachable!(),
        }
    }

    /// Advance through `prelude`, tracking nesting depth for `()`/`[]` and
    /// quoted strings, stopping at the first top-level `;` or `{`.
    /// Returns which terminator was found; the terminator itself is
    /// consumed.
    fn scan_prelude_until_brace_or_semi(&mut self) -> SassResult<char> {
        let mut depth = 0i32;
        let mut interp_depth = 0i32;
        let mut quote: Option<char> = None;
        loop {
            match self.lexer.peek(0) {
                None => return Err(self.err("expected \";\".", self.current_span())),
                Some(c) if quote == Some(c) => {
                    quote = None;
                    self.lexer.advance(1);
                }
                Some(_) if quote.is_some() => {
                    self.lexer.advance(1);
                }
                Some('#') if self.lexer.peek(1) == Some('{') => {
                    interp_depth += 1;
                    self.lexer.advance(2);
                }
                Some('{') if interp_depth > 0 => {
                    interp_depth += 1;
                    self.lexer.advance(1);
                }
                Some('}') if interp_depth > 0 => {
                    interp_depth -= 1;
                    self.lexer.advance(1);
                }
                Some(c @ ('"' | '\'')) => {
                    quote = Some(c);
                    self.lexer.advance(1);
                }
                Some('(') | Some('[') => {
                    depth += 1;
                    self.lexer.advance(1);
                }
                Some(')') | Some(']') => {
                    depth -= 1;
                    self.lexer.advance(1);
                }
                Some(';') if depth == 0 => {
                    self.lexer.advance(1);
                    return Ok(';');
                }
                Some('{') if depth == 0 => {
                    self.lexer.advance(1);
                    return Ok('{');
                }
                Some('}') if depth == 0 => {
                    return Err(self.err("expected \"{\".", self.current_span()));
                }
                _ => {
                    self.lexer.advance(1);
                }
            }
        }
    }

    fn read_silent_comment(&mut self) -> String {
        let start = self.lexer.cursor();
        while let Some(c) = self.lexer.peek(0) {
            if c == '\n' {
                break;
            }
            self.lexer.advance(1);
        }
        self.lexer.substring(start).to_string()
    }

    fn read_loud_comment(&mut self) -> String {
        let start = self.lexer.cursor();
        self.lexer.advance(2);
        loop {
            match self.lexer.peek(0) {
                None => break,
                Some('*') if self.lexer.peek(1) == Some('/') => {
                    self.lexer.advance(2);
                    break;
                }
                _ => {
                    self.lexer.advance(1);
                }
            }
        }
        self.lexer.substring(start).to_string()
    }

    fn parse_variable_decl(&mut self) -> SassResult<Stmt> {
        self.lexer.advance(1); // `$`
        let name = eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier.", self.current_span()))?;
        devour_whitespace(&mut self.lexer);
        self.lexer.expect_char(':', self.current_span())?;
        devour_whitespace(&mut self.lexer);

        let raw = self.scan_balanced_until(&[';', '}']);
        if self.lexer.peek(0) == Some(';') {
            self.lexer.advance(1);
        }
        let trimmed = raw.trim();
        let default = trimmed.ends_with("!default");
        let global = trimmed.ends_with("!global");
        let value_src = strip_trailing_flags(trimmed);
        let value = parse_value_str(value_src.trim(), self.current_span())?;
        Ok(Stmt::Assign {
            namespace: None,
            name,
            value,
            default,
            global,
        })
    }

    /// Consume text up to (not including) the first `;`/`}`/`,`/`)` named
    /// in `stops` at paren/bracket depth 0, outside quotes. Used for any
    /// value-bearing prelude that may itself contain parens, quotes, or
    /// nested braces inside a string (`@debug "a { b }";`).
    fn scan_balanced_until(&mut self, stops: &[char]) -> String {
        let start = self.lexer.cursor();
        let mut depth = 0i32;
        let mut interp_depth = 0i32;
        let mut quote: Option<char> = None;
        loop {
            match self.lexer.peek(0) {
                None => break,
                Some(c) if quote == Some(c) => {
                    quote = None;
                    self.lexer.advance(1);
                }
                Some(_) if quote.is_some() => {
                    self.lexer.advance(1);
                }
                Some('#') if self.lexer.peek(1) == Some('{') => {
                    interp_depth += 1;
                    self.lexer.advance(2);
                }
                Some('{') if interp_depth > 0 => {
                    interp_depth += 1;
                    self.lexer.advance(1);
                }
                Some('}') if interp_depth > 0 => {
                    interp_depth -= 1;
                    self.lexer.advance(1);
                }
                Some(c @ ('"' | '\'')) => {
                    quote = Some(c);
                    self.lexer.advance(1);
                }
                Some('(') | Some('[') => {
                    depth += 1;
                    self.lexer.advance(1);
                }
                Some(')') | Some(']') => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    self.lexer.advance(1);
                }
                Some(c) if depth == 0 && stops.contains(&c) => break,
                _ => {
                    self.lexer.advance(1);
                }
            }
        }
        self.lexer.substring(start).to_string()
    }

    /// Like `scan_balanced_until` but the stop condition is a whole-word
    /// keyword (`to`/`through` in `@for`) rather than a punctuation char.
    fn scan_balanced_until_keyword(&mut self, keywords: &[&str]) -> String {
        let start = self.lexer.cursor();
        let mut depth = 0i32;
        let mut quote: Option<char> = None;
        loop {
            match self.lexer.peek(0) {
                None => break,
                Some(c) if quote == Some(c) => {
                    quote = None;
                    self.lexer.advance(1);
                }
                Some(_) if quote.is_some() => {
                    self.lexer.advance(1);
                }
                Some(c @ ('"' | '\'')) => {
                    quote = Some(c);
                    self.lexer.advance(1);
                }
                Some('(') | Some('[') => {
                    depth += 1;
                    self.lexer.advance(1);
                }
                Some(')') | Some(']') => {
                    depth -= 1;
                    self.lexer.advance(1);
                }
                _ if depth == 0 => {
                    let save = self.lexer.state();
                    let mut matched = false;
                    for kw in keywords {
                        if self.lexer.scan_identifier(kw) {
                            self.lexer.backtrack(save);
                            matched = true;
                            break;
                        }
                    }
                    if matched {
                        break;
                    }
                    self.lexer.advance(1);
                }
                _ => {
                    self.lexer.advance(1);
                }
            }
        }
        self.lexer.substring(start).to_string()
    }

    fn parse_at_rule(&mut self) -> SassResult<Option<Stmt>> {
        self.lexer.advance(1); // `@`
        let name = eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier.", self.current_span()))?;
        let kind = crate::atrule::AtRuleKind::from(name.as_str());
        devour_whitespace(&mut self.lexer);

        use crate::atrule::AtRuleKind as K;
        match kind {
            K::If => self.parse_if().map(|i| Some(Stmt::If(i))),
            K::For => self.parse_for().map(Some),
            K::Each => self.parse_each().map(Some),
            K::While => self.parse_while().map(Some),
            K::Mixin => self.parse_mixin_decl().map(Some),
            K::Function => self.parse_function_decl().map(Some),
            K::Include => self.parse_include().map(Some),
            K::Content => self.parse_content().map(Some),
            K::Return => {
                let value = self.parse_rest_as_expr()?;
                Ok(Some(Stmt::Return(value)))
            }
            K::Extend => self.parse_extend().map(Some),
            K::Debug => {
                let value = self.parse_rest_as_expr()?;
                Ok(Some(Stmt::Debug(value)))
            }
            K::Warn => {
                let value = self.parse_rest_as_expr()?;
                Ok(Some(Stmt::Warn(value)))
            }
            K::Error => {
                let value = self.parse_rest_as_expr()?;
                Ok(Some(Stmt::Error(value)))
            }
            K::Media => self.parse_media().map(Some),
            K::Supports => self.parse_supports().map(Some),
            K::AtRoot => self.parse_at_root().map(Some),
            K::Use => self.parse_use().map(Some),
            K::Forward => self.parse_forward().map(Some),
            K::Import => self.parse_import().map(Some),
            K::Charset => {
                self.skip_to_semi();
                Ok(Some(Stmt::AtRule(AtRule::Charset)))
            }
            K::Else => Err(self.err("@else may only follow @if.", self.current_span())),
            K::Unknown => self.parse_unknown_at_rule(name).map(Some),
        }
    }

    fn skip_to_semi(&mut self) {
        while let Some(c) = self.lexer.peek(0) {
            if c == ';' || c == '{' || c == '}' {
                break;
            }
            self.lexer.advance(1);
        }
        if self.lexer.peek(0) == Some(';') {
            self.lexer.advance(1);
        }
    }

    fn parse_rest_as_expr(&mut self) -> SassResult<Expr> {
        let src = self.scan_balanced_until(&[';', '}']);
        if self.lexer.peek(0) == Some(';') {
            self.lexer.advance(1);
        }
        parse_value_str(src.trim(), self.current_span())
    }

    fn parse_paren_condition(&mut self) -> SassResult<Expr> {
        let src = self.scan_balanced_until(&['{']).trim().to_string();
        parse_value_str(&src, self.current_span())
    }

    fn parse_if(&mut self) -> SassResult<If> {
        let cond = self.parse_paren_condition()?;
        let body = self.parse_block()?;
        let mut branches = vec![Branch::new(cond, body)];
        let mut else_branch = None;
        loop {
            let save = self.lexer.state();
            devour_whitespace(&mut self.lexer);
            if self.lexer.peek(0) != Some('@') {
                self.lexer.backtrack(save);
                break;
            }
            let at_save = self.lexer.state();
            self.lexer.advance(1);
            if !self.lexer.scan_identifier("else") {
                self.lexer.backtrack(at_save);
                break;
            }
            devour_whitespace(&mut self.lexer);
            if self.lexer.scan_identifier("if") {
                devour_whitespace(&mut self.lexer);
                let cond = self.parse_paren_condition()?;
                let body = self.parse_block()?;
                branches.push(Branch::new(cond, body));
            } else {
                else_branch = Some(self.parse_block()?);
                break;
            }
        }
        Ok(If::new(branches, else_branch))
    }

    fn parse_for(&mut self) -> SassResult<Stmt> {
        self.lexer.expect_char('$', self.current_span())?;
        let var = eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier.", self.current_span()))?;
        devour_whitespace(&mut self.lexer);
        if !self.lexer.scan_identifier("from") {
            return Err(self.err("Expected \"from\".", self.current_span()));
        }
        devour_whitespace(&mut self.lexer);
        let from_src = self.scan_balanced_until_keyword(&["to", "through"]);
        let from = parse_value_str(from_src.trim(), self.current_span())?;
        devour_whitespace(&mut self.lexer);
        let inclusive = if self.lexer.scan_identifier("through") {
            true
        } else if self.lexer.scan_identifier("to") {
            false
        } else {
            return Err(self.err("Expected \"to\" or \"through\".", self.current_span()));
        };
        devour_whitespace(&mut self.lexer);
        let to = self.parse_paren_condition()?;
        let body = self.parse_block()?;
        Ok(Stmt::For { var, from, to, inclusive, body })
    }

    fn parse_each(&mut self) -> SassResult<Stmt> {
        let mut vars = Vec::new();
        loop {
            self.lexer.expect_char('$', self.current_span())?;
            vars.push(eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier.", self.current_span()))?);
            devour_whitespace(&mut self.lexer);
            if self.lexer.scan_char(',') {
                devour_whitespace(&mut self.lexer);
                continue;
            }
            break;
        }
        if !self.lexer.scan_identifier("in") {
            return Err(self.err("Expected \"in\".", self.current_span()));
        }
        devour_whitespace(&mut self.lexer);
        let iterable = self.parse_paren_condition()?;
        let body = self.parse_block()?;
        Ok(Stmt::Each { vars, iterable, body })
    }

    fn parse_while(&mut self) -> SassResult<Stmt> {
        let cond = self.parse_paren_condition()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_arg_decl(&mut self) -> SassResult<FuncArgs> {
        devour_whitespace(&mut self.lexer);
        self.lexer.expect_char('(', self.current_span())?;
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
                None => return Err(self.err("expected \")\".", self.current_span())),
            }
        }
        let inner = self.lexer.substring(start);
        let inner = &inner[..inner.len() - 1];
        Ok(FuncArgs::parse_signature(inner))
    }

    fn parse_mixin_decl(&mut self) -> SassResult<Stmt> {
        let name = eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier.", self.current_span()))?;
        let args = if self.lexer.peek(0) == Some('(') {
            self.parse_arg_decl()?
        } else {
            FuncArgs::new()
        };
        devour_whitespace(&mut self.lexer);
        let body = self.parse_block()?;
        let accepts_content = stmts_mention_content(&body);
        let mixin = Mixin::new(Scope::new(), args, body, accepts_content, self.current_span());
        Ok(Stmt::MixinDecl(name, mixin))
    }

    fn parse_function_decl(&mut self) -> SassResult<Stmt> {
        let name = eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier.", self.current_span()))?;
        let args = if self.lexer.peek(0) == Some('(') {
            self.parse_arg_decl()?
        } else {
            FuncArgs::new()
        };
        devour_whitespace(&mut self.lexer);
        let body = self.parse_block()?;
        let func = Function::new(Scope::new(), args, body, self.current_span());
        Ok(Stmt::FunctionDecl(name, func))
    }

    fn parse_call_args(&mut self) -> SassResult<Vec<Argument>> {
        let mut args = Vec::new();
        devour_whitespace(&mut self.lexer);
        if !self.lexer.scan_char('(') {
            return Ok(args);
        }
        devour_whitespace(&mut self.lexer);
        if self.lexer.scan_char(')') {
            return Ok(args);
        }
        loop {
            devour_whitespace(&mut self.lexer);
            let arg_start = self.lexer.cursor();
            if self.lexer.peek(0) == Some('$') {
                let save = self.lexer.state();
                self.lexer.advance(1);
                if let Some(name) = eat_ident(&mut self.lexer) {
                    devour_whitespace(&mut self.lexer);
                    if self.lexer.scan_char(':') {
                        devour_whitespace(&mut self.lexer);
                        let value = self.parse_expr_until(&[',', ')'])?;
                        args.push(Argument::Named(name, value));
                        devour_whitespace(&mut self.lexer);
                        if self.lexer.scan_char(',') {
                            continue;
                        }
                        break;
                    }
                }
                self.lexer.backtrack(save);
            }
            let (value, is_rest) = self.parse_expr_until_with_rest(&[',', ')'])?;
            if is_rest {
                args.push(Argument::Rest(value));
            } else {
                args.push(Argument::Positional(value));
            }
            let _ = arg_start;
            devour_whitespace(&mut self.lexer);
            if self.lexer.scan_char(',') {
                devour_whitespace(&mut self.lexer);
                if self.lexer.peek(0) == Some(')') {
                    break;
                }
                continue;
            }
            break;
        }
        devour_whitespace(&mut self.lexer);
        self.lexer.expect_char(')', self.current_span())?;
        Ok(args)
    }

    fn parse_include(&mut self) -> SassResult<Stmt> {
        let first = eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier.", self.current_span()))?;
        let (namespace, name) = if self.lexer.peek(0) == Some('.') {
            self.lexer.advance(1);
            let real = eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier.", self.current_span()))?;
            (Some(first), real)
        } else {
            (None, first)
        };
        let args = self.parse_call_args()?;
        devour_whitespace(&mut self.lexer);
        let content = if self.lexer.peek(0) == Some('{') {
            Some(self.parse_block()?)
        } else {
            if self.lexer.peek(0) == Some(';') {
                self.lexer.advance(1);
            }
            None
        };
        Ok(Stmt::Include { namespace, name, args, content })
    }

    fn parse_content(&mut self) -> SassResult<Stmt> {
        let args = self.parse_call_args()?;
        if self.lexer.peek(0) == Some(';') {
            self.lexer.advance(1);
        }
        Ok(Stmt::Content(args))
    }

    fn parse_extend(&mut self) -> SassResult<Stmt> {
        let mut text = self.scan_balanced_until(&[';', '}']).trim().to_string();
        if self.lexer.peek(0) == Some(';') {
            self.lexer.advance(1);
        }
        let is_optional = if let Some(stripped) = text.strip_suffix("!optional") {
            text = stripped.trim_end().to_string();
            true
        } else {
            false
        };
        Ok(Stmt::Extend { selector: Interpolation::plain(text), is_optional })
    }

    fn parse_media(&mut self) -> SassResult<Stmt> {
        let query = self.scan_balanced_until(&['{']).trim().to_string();
        let body = self.parse_block()?;
        Ok(Stmt::Media { query: Interpolation::plain(query), body })
    }

    fn parse_supports(&mut self) -> SassResult<Stmt> {
        let query = self.scan_balanced_until(&['{']).trim().to_string();
        let body = self.parse_block()?;
        Ok(Stmt::Supports { query: Interpolation::plain(query), body })
    }

    fn parse_at_root(&mut self) -> SassResult<Stmt> {
        devour_whitespace(&mut self.lexer);
        let query = if self.lexer.peek(0) == Some('(') {
            let start = self.lexer.cursor();
            self.lexer.advance(1);
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
                    None => return Err(self.err("expected \")\".", self.current_span())),
                }
            }
            let inner = self.lexer.substring(start + 1);
            Some(Interpolation::plain(inner[..inner.len() - 1].to_string()))
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(Stmt::AtRoot { query, body })
    }

    fn parse_use(&mut self) -> SassResult<Stmt> {
        devour_whitespace(&mut self.lexer);
        let url = self.parse_quoted_literal()?;
        devour_whitespace(&mut self.lexer);
        let namespace = if self.lexer.scan_identifier("as") {
            devour_whitespace(&mut self.lexer);
            if self.lexer.scan_char('*') {
                Some(UseNamespace::Star)
            } else {
                let n = eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier.", self.current_span()))?;
                Some(UseNamespace::Named(n))
            }
        } else {
            None
        };
        let configuration = self.parse_with_configuration()?;
        self.skip_to_semi();
        Ok(Stmt::Use { url, namespace, configuration })
    }

    fn parse_forward(&mut self) -> SassResult<Stmt> {
        devour_whitespace(&mut self.lexer);
        let url = self.parse_quoted_literal()?;
        devour_whitespace(&mut self.lexer);
        let prefix = if self.lexer.scan_identifier("as") {
            devour_whitespace(&mut self.lexer);
            let p = eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier.", self.current_span()))?;
            devour_whitespace(&mut self.lexer);
            self.lexer.scan_char('*');
            Some(p)
        } else {
            None
        };
        devour_whitespace(&mut self.lexer);
        let mut show = None;
        let mut hide = None;
        if self.lexer.scan_identifier("show") {
            show = Some(self.parse_ident_list()?);
        } else if self.lexer.scan_identifier("hide") {
            hide = Some(self.parse_ident_list()?);
        }
        let configuration = self.parse_with_configuration()?;
        self.skip_to_semi();
        Ok(Stmt::Forward { url, prefix, show, hide, configuration })
    }

    fn parse_ident_list(&mut self) -> SassResult<Vec<String>> {
        let mut out = Vec::new();
        loop {
            devour_whitespace(&mut self.lexer);
            if self.lexer.peek(0) == Some('$') {
                self.lexer.advance(1);
            }
            match eat_ident(&mut self.lexer) {
                Some(n) => out.push(n),
                None => break,
            }
            devour_whitespace(&mut self.lexer);
            if self.lexer.scan_char(',') {
                continue;
            }
            break;
        }
        Ok(out)
    }

    fn parse_with_configuration(&mut self) -> SassResult<Vec<(String, Expr)>> {
        devour_whitespace(&mut self.lexer);
        let mut out = Vec::new();
        if !self.lexer.scan_identifier("with") {
            return Ok(out);
        }
        devour_whitespace(&mut self.lexer);
        self.lexer.expect_char('(', self.current_span())?;
        loop {
            devour_whitespace(&mut self.lexer);
            self.lexer.expect_char('$', self.current_span())?;
            let name = eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier.", self.current_span()))?;
            devour_whitespace(&mut self.lexer);
            self.lexer.expect_char(':', self.current_span())?;
            devour_whitespace(&mut self.lexer);
            let value = self.parse_expr_until(&[',', ')'])?;
            out.push((name, value));
            devour_whitespace(&mut self.lexer);
            if self.lexer.scan_char(',') {
                continue;
            }
            break;
        }
        self.lexer.expect_char(')', self.current_span())?;
        Ok(out)
    }

    fn parse_quoted_literal(&mut self) -> SassResult<String> {
        let quote = self.lexer.peek(0);
        if quote != Some('"') && quote != Some('\'') {
            return Err(self.err("Expected string.", self.current_span()));
        }
        let q = quote.unwrap();
        self.lexer.advance(1);
        let start = self.lexer.cursor();
        while let Some(c) = self.lexer.peek(0) {
            if c == q {
                break;
            }
            self.lexer.advance(1);
        }
        let text = self.lexer.substring(start).to_string();
        self.lexer.expect_char(q, self.current_span())?;
        Ok(text)
    }

    fn parse_import(&mut self) -> SassResult<Stmt> {
        let mut args = Vec::new();
        loop {
            devour_whitespace(&mut self.lexer);
            let text = self.parse_quoted_literal()?;
            args.push(ImportArg::Sass(text));
            devour_whitespace(&mut self.lexer);
            if self.lexer.scan_char(',') {
                continue;
            }
            break;
        }
        self.skip_to_semi();
        Ok(Stmt::Import(args))
    }

    fn parse_unknown_at_rule(&mut self, name: String) -> SassResult<Stmt> {
        let params = self.scan_balanced_until(&['{', ';']).trim().to_string();
        let body = if self.lexer.peek(0) == Some('{') {
            self.parse_block()?
        } else {
            if self.lexer.peek(0) == Some(';') {
                self.lexer.advance(1);
            }
            Vec::new()
        };
        Ok(Stmt::AtRule(AtRule::Unknown(UnknownAtRule::new(name, Interpolation::plain(params), body))))
    }

    fn parse_expr_until(&mut self, stop: &[char]) -> SassResult<Expr> {
        let raw = self.scan_balanced_until(stop);
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_suffix("...").map(str::trim_end).unwrap_or(trimmed);
        parse_value_str(trimmed, self.current_span())
    }

    /// Like `parse_expr_until` but also reports whether the value was
    /// followed by `...` (the `@include`/mixin-call rest-argument marker).
    fn parse_expr_until_with_rest(&mut self, stop: &[char]) -> SassResult<(Expr, bool)> {
        let raw = self.scan_balanced_until(stop);
        let trimmed = raw.trim();
        let is_rest = trimmed.ends_with("...");
        let value_src = if is_rest { trimmed[..trimmed.len() - 3].trim_end() } else { trimmed };
        Ok((parse_value_str(value_src, self.current_span())?, is_rest))
    }
}

fn stmts_mention_content(stmts: &[Spanned<Stmt>]) -> bool {
    stmts.iter().any(|s| match &s.node {
        Stmt::Content(_) => true,
        Stmt::RuleSet { body, .. }
        | Stmt::DeclarationBlock { body, .. }
        | Stmt::Media { body, .. }
        | Stmt::Supports { body, .. }
        | Stmt::AtRoot { body, .. }
        | Stmt::For { body, .. }
        | Stmt::Each { body, .. }
        | Stmt::While { body, .. } => stmts_mention_content(body),
        Stmt::If(if_rule) => {
            if_rule.branches.iter().any(|b| stmts_mention_content(&b.body))
                || if_rule.else_branch.as_deref().map_or(false, stmts_mention_content)
        }
        _ => false,
    })
}

fn strip_trailing_flags(raw: &str) -> &str {
    let trimmed = raw.trim_end();
    let trimmed = trimmed.strip_suffix("!default").map(str::trim_end).unwrap_or(trimmed);
    trimmed.strip_suffix("!global").map(str::trim_end).unwrap_or(trimmed)
}

/// Find the first `:` at paren/bracket depth 0 and not part of `::`.
fn split_top_level_colon(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let bytes = s.as_bytes();
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ':' if depth == 0 => {
                return Some((&s[..i], &s[i + 1..]));
            }
            _ => {}
        }
        let _ = bytes;
    }
    None
}

/// Like `split_top_level_colon` but requires the property side to be a
/// plain identifier (no selector-only punctuation), used to disambiguate
/// a nested declaration block (`font: { ... }`) from a style rule whose
/// selector happens to contain a `:` (a pseudo-class).
fn split_top_level_colon_simple(s: &str) -> Option<(&str, &str)> {
    let (prop, rest) = split_top_level_colon(s)?;
    let trimmed = prop.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        Some((prop, rest))
    } else {
        None
    }
}

/// Parse a standalone expression source string (already extracted from
/// the token stream by the caller) into an `Expr` tree.
pub(crate) fn parse_value_str(src: &str, span: Span) -> SassResult<Expr> {
    let mut map = codemap::CodeMap::new();
    let file = map.add_file("<value>".into(), src.to_string());
    let lexer = Lexer::new(file, src);
    let mut parser = ExprParser { lexer, span };
    parser.parse_list(true)
}

struct ExprParser<'a> {
    lexer: Lexer<'a>,
    span: Span,
}

impl<'a> ExprParser<'a> {
    fn err(&self, msg: impl Into<String>) -> SassError {
        SassError::new(SassErrorKind::Parse, msg, self.span)
    }

    fn ws(&mut self) {
        devour_whitespace(&mut self.lexer);
    }

    /// Top-level: comma list, then space list inside each comma element.
    fn parse_list(&mut self, allow_comma: bool) -> SassResult<Expr> {
        self.ws();
        let mut space_items = vec![self.parse_or()?];
        self.ws();
        while self.lexer.peek(0).is_some() && !matches!(self.lexer.peek(0), Some(',') | Some(')') | Some(']')) {
            let save = self.lexer.state();
            self.ws();
            if self.lexer.is_done() || matches!(self.lexer.peek(0), Some(',') | Some(')') | Some(']')) {
                self.lexer.backtrack(save);
                break;
            }
            space_items.push(self.parse_or()?);
            self.ws();
        }
        let space_expr = if space_items.len() == 1 {
            space_items.pop().unwrap()
        } else {
            Expr::List(space_items, ListSeparator::Space, Brackets::None)
        };

        if !allow_comma {
            return Ok(space_expr);
        }

        self.ws();
        if self.lexer.peek(0) != Some(',') {
            return Ok(space_expr);
        }
        let mut comma_items = vec![space_expr];
        while self.lexer.scan_char(',') {
            self.ws();
            if self.lexer.is_done() {
                break;
            }
            comma_items.push(self.parse_list(false)?);
            self.ws();
        }
        Ok(Expr::List(comma_items, ListSeparator::Comma, Brackets::None))
    }

    fn parse_or(&mut self) -> SassResult<Expr> {
        let mut lhs = self.parse_and()?;
        loop {
            self.ws();
            if self.lexer.scan_identifier("or") {
                self.ws();
                let rhs = self.parse_and()?;
                lhs = Expr::BinaryOp(Box::new(lhs), Op::Or, Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> SassResult<Expr> {
        let mut lhs = self.parse_equality()?;
        loop {
            self.ws();
            if self.lexer.scan_identifier("and") {
                self.ws();
                let rhs = self.parse_equality()?;
                lhs = Expr::BinaryOp(Box::new(lhs), Op::And, Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> SassResult<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            self.ws();
            if self.scan_str("==") {
                self.ws();
                lhs = Expr::BinaryOp(Box::new(lhs), Op::Equal, Box::new(self.parse_relational()?));
            } else if self.scan_str("!=") {
                self.ws();
                lhs = Expr::BinaryOp(Box::new(lhs), Op::NotEqual, Box::new(self.parse_relational()?));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn scan_str(&mut self, s: &str) -> bool {
        let save = self.lexer.state();
        for c in s.chars() {
            if self.lexer.peek(0) != Some(c) {
                self.lexer.backtrack(save);
                return false;
            }
            self.lexer.advance(1);
        }
        true
    }

    fn parse_relational(&mut self) -> SassResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            self.ws();
            let op = if self.scan_str(">=") {
                Some(Op::GreaterThanEqual)
            } else if self.scan_str("<=") {
                Some(Op::LessThanEqual)
            } else if self.scan_str(">") {
                Some(Op::GreaterThan)
            } else if self.scan_str("<") {
                Some(Op::LessThan)
            } else {
                None
            };
            match op {
                Some(op) => {
                    self.ws();
                    lhs = Expr::BinaryOp(Box::new(lhs), op, Box::new(self.parse_additive()?));
                }
                None => break,
            }
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> SassResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            match self.lexer.peek(0) {
                Some('+') => {
                    self.lexer.advance(1);
                    self.ws();
                    lhs = Expr::BinaryOp(Box::new(lhs), Op::Plus, Box::new(self.parse_multiplicative()?));
                }
                Some('-') if self.lexer.peek(1).map_or(true, |c| c.is_whitespace() || c.is_ascii_digit() || c == '(' || c == '$') => {
                    self.lexer.advance(1);
                    self.ws();
                    lhs = Expr::BinaryOp(Box::new(lhs), Op::Minus, Box::new(self.parse_multiplicative()?));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> SassResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            self.ws();
            match self.lexer.peek(0) {
                Some('*') => {
                    self.lexer.advance(1);
                    self.ws();
                    lhs = Expr::BinaryOp(Box::new(lhs), Op::Mul, Box::new(self.parse_unary()?));
                }
                Some('%') => {
                    self.lexer.advance(1);
                    self.ws();
                    lhs = Expr::BinaryOp(Box::new(lhs), Op::Rem, Box::new(self.parse_unary()?));
                }
                Some('/') => {
                    self.lexer.advance(1);
                    self.ws();
                    lhs = Expr::BinaryOp(Box::new(lhs), Op::Div, Box::new(self.parse_unary()?));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> SassResult<Expr> {
        self.ws();
        if self.lexer.scan_identifier("not") {
            self.ws();
            return Ok(Expr::UnaryOp(Op::Not, Box::new(self.parse_unary()?)));
        }
        if self.lexer.peek(0) == Some('-')
            && self
                .lexer
                .peek(1)
                .map_or(false, |c| c.is_ascii_digit() || c == '.' || c == '$' || c == '(')
        {
            self.lexer.advance(1);
            return Ok(Expr::UnaryOp(Op::Minus, Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> SassResult<Expr> {
        self.ws();
        match self.lexer.peek(0) {
            None => Err(self.err("Expected expression.")),
            Some('$') => {
                self.lexer.advance(1);
                let name = eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier."))?;
                Ok(Expr::Variable(name))
            }
            Some('&') => {
                self.lexer.advance(1);
                Ok(Expr::ParentSelector)
            }
            Some('(') => {
                self.lexer.advance(1);
                self.ws();
                if self.lexer.scan_char(')') {
                    return Ok(Expr::List(Vec::new(), ListSeparator::Undecided, Brackets::None));
                }
                let inner = self.parse_map_or_list()?;
                self.ws();
                self.lexer.expect_char(')', self.span)?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            Some('[') => {
                self.lexer.advance(1);
                self.ws();
                if self.lexer.scan_char(']') {
                    return Ok(Expr::List(Vec::new(), ListSeparator::Undecided, Brackets::Bracketed));
                }
                let inner = self.parse_list(true)?;
                self.ws();
                self.lexer.expect_char(']', self.span)?;
                Ok(match inner {
                    Expr::List(items, sep, _) => Expr::List(items, sep, Brackets::Bracketed),
                    other => Expr::List(vec![other], ListSeparator::Space, Brackets::Bracketed),
                })
            }
            Some('#') if self.lexer.peek(1) == Some('{') => self.parse_interpolated_text(),
            Some('"') | Some('\'') => self.parse_quoted_string(),
            Some('#') => self.parse_hex_color(),
            Some(c) if c.is_ascii_digit() || (c == '.' && self.lexer.peek(1).map_or(false, |d| d.is_ascii_digit())) => {
                self.parse_number()
            }
            Some(c) if c.is_alphabetic() || c == '_' || c == '-' || c == '\\' => self.parse_ident_led(),
            Some(c) => Err(self.err(format!("Unexpected character \"{}\".", c))),
        }
    }

    fn parse_map_or_list(&mut self) -> SassResult<Expr> {
        let start_state = self.lexer.state();
        let first = self.parse_or()?;
        self.ws();
        if self.lexer.scan_char(':') {
            self.ws();
            let value = self.parse_or()?;
            let mut entries = vec![(first, value)];
            self.ws();
            while self.lexer.scan_char(',') {
                self.ws();
                if self.lexer.peek(0) == Some(')') {
                    break;
                }
                let k = self.parse_or()?;
                self.ws();
                self.lexer.expect_char(':', self.span)?;
                self.ws();
                let v = self.parse_or()?;
                entries.push((k, v));
                self.ws();
            }
            return Ok(Expr::Map(entries));
        }
        self.lexer.backtrack(start_state);
        self.parse_list(true)
    }

    fn parse_interpolated_text(&mut self) -> SassResult<Expr> {
        let mut parts = Vec::new();
        loop {
            self.lexer.advance(2); // `#{`
            let start = self.lexer.cursor();
            let mut depth = 1i32;
            while depth > 0 {
                match self.lexer.peek(0) {
                    Some('{') => {
                        depth += 1;
                        self.lexer.advance(1);
                    }
                    Some('}') => {
                        depth -= 1;
                        self.lexer.advance(1);
                    }
                    Some(_) => {
                        self.lexer.advance(1);
                    }
                    None => return Err(self.err("expected \"}\".")),
                }
            }
            let inner_text = self.lexer.substring(start);
            let inner = &inner_text[..inner_text.len() - 1];
            let inner_expr = parse_value_str(inner, self.span)?;
            parts.push(InterpolationPart::Expr(Box::new(inner_expr)));
            if self.lexer.peek(0) == Some('#') && self.lexer.peek(1) == Some('{') {
                continue;
            }
            break;
        }
        Ok(Expr::Interpolated(Interpolation(parts)))
    }

    fn parse_quoted_string(&mut self) -> SassResult<Expr> {
        let quote = self.lexer.peek(0).unwrap();
        self.lexer.advance(1);
        let mut parts = Vec::new();
        let mut literal = String::new();
        loop {
            match self.lexer.peek(0) {
                None => return Err(self.err("expected closing quote.")),
                Some(c) if c == quote => {
                    self.lexer.advance(1);
                    break;
                }
                Some('#') if self.lexer.peek(1) == Some('{') => {
                    if !literal.is_empty() {
                        parts.push(InterpolationPart::Literal(std::mem::take(&mut literal)));
                    }
                    self.lexer.advance(2);
                    let start = self.lexer.cursor();
                    let mut depth = 1i32;
                    while depth > 0 {
                        match self.lexer.peek(0) {
                            Some('{') => {
                                depth += 1;
                                self.lexer.advance(1);
                            }
                            Some('}') => {
                                depth -= 1;
                                self.lexer.advance(1);
                            }
                            Some(_) => {
                                self.lexer.advance(1);
                            }
                            None => return Err(self.err("expected \"}\".")),
                        }
                    }
                    let inner_text = self.lexer.substring(start);
                    let inner = &inner_text[..inner_text.len() - 1];
                    parts.push(InterpolationPart::Expr(Box::new(parse_value_str(inner, self.span)?)));
                }
                Some('\\') => {
                    self.lexer.advance(1);
                    if let Some(c) = self.lexer.peek(0) {
                        literal.push(c);
                        self.lexer.advance(1);
                    }
                }
                Some(c) => {
                    literal.push(c);
                    self.lexer.advance(1);
                }
            }
        }
        if !literal.is_empty() || parts.is_empty() {
            parts.push(InterpolationPart::Literal(literal));
        }
        Ok(Expr::Str(Interpolation(parts), QuoteKind::Quoted))
    }

    fn parse_hex_color(&mut self) -> SassResult<Expr> {
        self.lexer.advance(1);
        let start = self.lexer.cursor();
        while self.lexer.peek(0).map_or(false, |c| c.is_ascii_hexdigit()) {
            self.lexer.advance(1);
        }
        let hex = self.lexer.substring(start);
        let color = SassColor::from_hex(hex).ok_or_else(|| self.err("Invalid hex color."))?;
        Ok(Expr::Color(color))
    }

    fn parse_number(&mut self) -> SassResult<Expr> {
        let raw = eat_number(&mut self.lexer).ok_or_else(|| self.err("Expected number."))?;
        let value: f64 = raw.parse().map_err(|_| self.err("Invalid number."))?;
        let unit_str = eat_unit(&mut self.lexer);
        let unit = if unit_str.is_empty() { Unit::None } else { Unit::from(unit_str.as_str()) };
        Ok(Expr::Number(value, unit))
    }

    fn parse_ident_led(&mut self) -> SassResult<Expr> {
        if self.lexer.scan_identifier("true") {
            return Ok(Expr::True);
        }
        if self.lexer.scan_identifier("null") {
            return Ok(Expr::Null);
        }
        let save = self.lexer.state();
        if self.lexer.scan_identifier("false") {
            return Ok(Expr::False);
        }
        self.lexer.backtrack(save);
        if self.lexer.scan_identifier("if") && self.lexer.peek(0) == Some('(') {
            let args = self.parse_fn_call_args()?;
            return Ok(Expr::If(args));
        } else {
            self.lexer.backtrack(save);
        }
        let name = eat_ident(&mut self.lexer).ok_or_else(|| self.err("Expected identifier."))?;
        if self.lexer.peek(0) == Some('.') && self.lexer.peek(1).map_or(false, |c| c.is_alphabetic() || c == '_' || c == '-') {
            let dot_save = self.lexer.state();
            self.lexer.advance(1);
            if let Some(member) = eat_ident(&mut self.lexer) {
                if self.lexer.peek(0) == Some('(') {
                    let args = self.parse_fn_call_args()?;
                    return Ok(Expr::NamespacedFunctionCall(name, member, args));
                }
                return Ok(Expr::NamespacedVariable(name, member));
            }
            self.lexer.backtrack(dot_save);
        }
        if self.lexer.peek(0) == Some('(') {
            let args = self.parse_fn_call_args()?;
            return Ok(Expr::FunctionCall(name, args));
        }
        Ok(Expr::Str(Interpolation::plain(name), QuoteKind::None))
    }

    fn parse_fn_call_args(&mut self) -> SassResult<Vec<Argument>> {
        self.lexer.expect_char('(', self.span)?;
        let mut args = Vec::new();
        self.ws();
        if self.lexer.scan_char(')') {
            return Ok(args);
        }
        loop {
            self.ws();
            if self.lexer.peek(0) == Some('$') {
                let save = self.lexer.state();
                self.lexer.advance(1);
                if let Some(name) = eat_ident(&mut self.lexer) {
                    self.ws();
                    if self.lexer.scan_char(':') {
                        self.ws();
                        let value = self.parse_or()?;
                        args.push(Argument::Named(name, value));
                        self.ws();
                        if self.lexer.scan_char(',') {
                            continue;
                        }
                        break;
                    }
                }
                self.lexer.backtrack(save);
            }
            let value = self.parse_or()?;
            self.ws();
            if self.scan_str("...") {
                args.push(Argument::Rest(value));
            } else {
                args.push(Argument::Positional(value));
            }
            self.ws();
            if self.lexer.scan_char(',') {
                continue;
            }
            break;
        }
        self.ws();
        self.lexer.expect_char(')', self.span)?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_top_level_colon_ignores_nested_parens() {
        let (prop, value) = split_top_level_colon("width: rgba(0, 0, 0, .5)").unwrap();
        assert_eq!(prop.trim(), "width");
        assert_eq!(value.trim(), "rgba(0, 0, 0, .5)");
    }

    #[test]
    fn simple_split_rejects_selector_with_pseudo() {
        assert!(split_top_level_colon_simple(".a:hover").is_none());
    }

    #[test]
    fn simple_split_accepts_plain_property_name() {
        assert!(split_top_level_colon_simple("font").is_some());
    }

    #[test]
    fn parse_value_str_builds_binary_op_tree() {
        let span = parse_value_str("1px + 2px", dummy_span());
        match span.unwrap() {
            Expr::BinaryOp(_, Op::Plus, _) => {}
            other => panic!("expected BinaryOp, got {:?}", other),
        }
    }

    #[test]
    fn parse_value_str_builds_comma_list() {
        let expr = parse_value_str("1, 2, 3", dummy_span()).unwrap();
        match expr {
            Expr::List(items, ListSeparator::Comma, _) => assert_eq!(items.len(), 3),
            other => panic!("expected comma list, got {:?}", other),
        }
    }

    fn dummy_span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }
}
