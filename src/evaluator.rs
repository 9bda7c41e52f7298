//! Main evaluation pass (§4.H): walks a parsed `Stmt`/`Expr` tree against a
//! live `Scope`, building the `CssTree` the serializer renders. Generalizes
//! the teacher's recursive `eat_rules`/`AtRule::eval`-against-`&mut Scope`
//! walk into a single `Evaluator` that also owns module loading, selector
//! extension registration (`@extend`), and the content-block/recursion
//! bookkeeping a single-function teacher pass didn't need.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use codemap::{Span, Spanned};

use crate::args::{CallArgs, FuncArgs};
use crate::ast::{Argument, Expr, ImportArg, Interpolation, InterpolationPart, Stmt, UseNamespace};
use crate::atrule::{AtRule, Function, Mixin, UnknownAtRule};
use crate::builtin;
use crate::builtin::meta::ENVIRONMENT_DEPENDENT;
use crate::common::{normalize, Op, QuoteKind};
use crate::css::{CssNodeKind, CssTree, NodeId};
use crate::environment::{FrameKind, Module, Scope};
use crate::error::{SassError, SassErrorKind, SassResult};
use crate::imports::{is_plain_css_import, ModuleLoad, ModuleLoader};
use crate::options::Options;
use crate::parser::at_root::AtRootQuery;
use crate::parser::keyframes::parse_keyframe_selector;
use crate::parser::media::merge_queries;
use crate::parser::selector::parse_selector_list;
use crate::selector::extend::Extender;
use crate::selector::Selector;
use crate::source::SourceRegistry;
use crate::style::Style;
use crate::value::{ArgList, SassMap, SassNumber, Value};

/// What running a statement list produced: either it ran to completion
/// (`Normal`) or hit a `@return` (`Return`), which unwinds every enclosing
/// block up to the nearest function call (§4.H "Control flow").
pub(crate) enum Flow {
    Normal,
    Return(Value),
}

/// One compilation's evaluation state. Threaded by value through a single
/// `run`, owning the `CssTree` under construction and borrowing the
/// `ModuleLoader`/`SourceRegistry` a `StyleSheet` build already set up
/// (§5 "no shared mutable state between compilations").
pub(crate) struct Evaluator<'a> {
    scope: Scope,
    selector: Selector,
    tree: CssTree,
    current: NodeId,
    extender: Extender,
    loader: &'a mut ModuleLoader,
    sources: &'a mut SourceRegistry,
    options: &'a Options,
    modules: Vec<(String, Rc<Module>)>,
    forwarded: Vec<String>,
    current_file: Option<PathBuf>,
    depth: usize,
    media_context: Option<String>,
    in_keyframes: bool,
    content_stack: Vec<Option<(Rc<Vec<Spanned<Stmt>>>, Scope)>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        root_span: Span,
        loader: &'a mut ModuleLoader,
        sources: &'a mut SourceRegistry,
        options: &'a Options,
        current_file: Option<PathBuf>,
    ) -> Self {
        Evaluator {
            scope: Scope::new(),
            selector: Selector::new(),
            tree: CssTree::new(root_span),
            current: CssTree::ROOT,
            extender: Extender::new(),
            loader,
            sources,
            options,
            modules: Vec::new(),
            forwarded: Vec::new(),
            current_file,
            depth: 0,
            media_context: None,
            in_keyframes: false,
            content_stack: Vec::new(),
        }
    }

    /// Evaluate the whole stylesheet and hand back the finished tree, with
    /// every `@extend` already woven into its target selectors.
    pub fn run(mut self, stmts: &[Spanned<Stmt>]) -> SassResult<CssTree> {
        let root_span = self.tree.node(CssTree::ROOT).span;
        match self.eval_stmts(stmts)? {
            Flow::Normal => {}
            Flow::Return(_) => {
                return Err(SassError::new(
                    SassErrorKind::ReturnOutsideFunction,
                    "@return is only allowed within a function.".to_string(),
                    root_span,
                ));
            }
        }
        let resolved = self.extender.finalize()?;
        for (node, list) in resolved {
            if let CssNodeKind::Style { selector, .. } = &mut self.tree.node_mut(node).kind {
                *selector = list.to_string();
            }
        }
        Ok(self.tree)
    }

    /// The node a newly-emitted style rule (or `@media`/`@supports`
    /// container) should attach under: a rule nested directly inside
    /// another rule's body bubbles out to be a sibling of its enclosing
    /// rule (§4.H "rule bubbling"); nested inside `@media`/`@supports` it
    /// stays nested, since `self.current` there is the container itself.
    fn rule_parent(&self) -> NodeId {
        match &self.tree.node(self.current).kind {
            CssNodeKind::Style { .. } => self.tree.node(self.current).parent.unwrap_or(CssTree::ROOT),
            _ => self.current,
        }
    }

    /// Push an `@media`/`@supports` container as a child of `rule_parent`;
    /// if a style rule is currently open around this at-rule, also open an
    /// implicit wrapper rule reusing that selector, since declarations
    /// written directly inside `@media { ... }` while nested in a rule
    /// still belong to that rule (§4.H "implicit style wrapper"). Generic
    /// at-rules (`@font-face`, `@keyframes`, …) never go through this —
    /// their declarations attach straight to the at-rule's own
    /// `declarations` field instead (`atrule::unknown`).
    fn enter_at_rule_container(&mut self, kind: CssNodeKind, span: Span) -> NodeId {
        self.enter_at_rule_container_under(self.rule_parent(), kind, span)
    }

    /// Same as `enter_at_rule_container`, but at an explicit parent — used
    /// for `@media` flattening (§8.1 invariant — spec.md S6), where a
    /// nested `@media` must become a sibling of its enclosing `@media`
    /// with merged query text, not a child of it.
    fn enter_at_rule_container_under(&mut self, parent: NodeId, kind: CssNodeKind, span: Span) -> NodeId {
        let container = self.tree.push_child(parent, kind, span);
        if self.selector.is_empty() {
            container
        } else {
            let node = self.tree.push_child(
                container,
                CssNodeKind::Style {
                    selector: self.selector.to_string(),
                    declarations: Vec::new(),
                },
                span,
            );
            self.extender.add_selector(node, &self.selector.0, self.media_context.clone());
            node
        }
    }

    fn eval_stmts(&mut self, stmts: &[Spanned<Stmt>]) -> SassResult<Flow> {
        for stmt in stmts {
            match self.eval_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_stmt(&mut self, stmt: &Spanned<Stmt>) -> SassResult<Flow> {
        let span = stmt.span;
        match &stmt.node {
            Stmt::RuleSet { selector, body } => return self.eval_rule_set(selector, body, span),
            Stmt::Declaration { property, value } => {
                let prop = self.eval_interpolation(property, span)?;
                let v = self.eval_expr(value, span)?;
                let value_str = v.to_css_string(span)?;
                self.push_declaration(prop, value_str, span);
            }
            Stmt::DeclarationBlock { property, value, body } => {
                let prefix = self.eval_interpolation(property, span)?;
                if let Some(v) = value {
                    let vv = self.eval_expr(v, span)?;
                    self.push_declaration(prefix.clone(), vv.to_css_string(span)?, span);
                }
                return self.eval_declaration_block_body(&prefix, body);
            }
            Stmt::Media { query, body } => {
                let text = self.eval_interpolation(query, span)?;
                // A `@media` nested inside another `@media` flattens to a
                // sibling of the enclosing one with the two query lists
                // conjoined, rather than nesting in the emitted CSS (S6).
                let (parent, merged) = match &self.media_context {
                    Some(outer) => (
                        self.tree.node(self.current).parent.unwrap_or(CssTree::ROOT),
                        merge_queries(outer, &text),
                    ),
                    None => (self.rule_parent(), text.clone()),
                };
                let node = self.enter_at_rule_container_under(parent, CssNodeKind::Media { query: merged.clone() }, span);
                let saved_current = std::mem::replace(&mut self.current, node);
                let saved_media = self.media_context.replace(merged);
                self.scope = self.scope.push(FrameKind::Block);
                let flow = self.eval_stmts(body);
                self.scope = self.scope.pop();
                self.media_context = saved_media;
                self.current = saved_current;
                return flow;
            }
            Stmt::Supports { query, body } => {
                let text = self.eval_interpolation(query, span)?;
                let node = self.enter_at_rule_container(CssNodeKind::Supports { query: text }, span);
                let saved_current = std::mem::replace(&mut self.current, node);
                self.scope = self.scope.push(FrameKind::Block);
                let flow = self.eval_stmts(body);
                self.scope = self.scope.pop();
                self.current = saved_current;
                return flow;
            }
            Stmt::AtRoot { query, body } => return self.eval_at_root(query.as_ref(), body, span),
            Stmt::If(if_rule) => {
                let body = if_rule.select_branch(|cond| Ok(self.eval_expr(cond, span)?.is_truthy()))?;
                self.scope = self.scope.push(FrameKind::Permeable);
                let flow = self.eval_stmts(body);
                self.scope = self.scope.pop();
                return flow;
            }
            Stmt::For { var, from, to, inclusive, body } => return self.eval_for(var, from, to, *inclusive, body, span),
            Stmt::Each { vars, iterable, body } => return self.eval_each(vars, iterable, body, span),
            Stmt::While { cond, body } => return self.eval_while(cond, body, span),
            Stmt::Include { namespace, name, args, content } => {
                self.eval_include(namespace.as_deref(), name, args, content.as_ref(), span)?;
            }
            Stmt::MixinDecl(name, mixin) => {
                let live = Mixin::new(self.scope.clone(), mixin.args.clone(), mixin.body.clone(), mixin.accepts_content, mixin.pos);
                self.scope.insert_mixin(name, live);
            }
            Stmt::FunctionDecl(name, func) => {
                let live = Function::new(self.scope.clone(), func.args.clone(), func.body.clone(), func.pos);
                self.scope.insert_fn(name, live);
            }
            Stmt::Return(expr) => {
                let v = self.eval_expr(expr, span)?;
                return Ok(Flow::Return(v));
            }
            Stmt::Content(_args) => {
                // Pop the current entry off before recursing into its body:
                // when content is forwarded through an intermediate mixin
                // (`@mixin outer { @include inner { @content; } }`), that
                // forwarded body is itself `[Stmt::Content]`, so without
                // popping first a nested `@content` would re-match this
                // same stack entry and recurse forever instead of resolving
                // to the entry belonging to the next caller out.
                if let Some(top) = self.content_stack.pop() {
                    if let Some((body, call_scope)) = top.clone() {
                        self.depth += 1;
                        if self.depth > self.options.recursion_limit {
                            self.depth -= 1;
                            self.content_stack.push(top);
                            return Err(SassError::new(
                                SassErrorKind::RecursionLimit,
                                "Recursion limit exceeded.".to_string(),
                                span,
                            ));
                        }
                        let saved = std::mem::replace(&mut self.scope, call_scope);
                        let flow = self.eval_stmts(&body);
                        self.scope = saved;
                        self.depth -= 1;
                        self.content_stack.push(top);
                        return flow;
                    }
                    self.content_stack.push(top);
                }
            }
            Stmt::Extend { selector, is_optional } => self.eval_extend(selector, *is_optional, span)?,
            Stmt::Assign { namespace, name, value, default, global } => {
                self.eval_assign(namespace.as_deref(), name, value, *default, *global, span)?;
            }
            Stmt::Debug(expr) => {
                let v = self.eval_expr(expr, span)?;
                self.options.logger_ref().debug(&stringify_for_diagnostics(&v, self.options.precision), span);
            }
            Stmt::Warn(expr) => {
                let v = self.eval_expr(expr, span)?;
                self.options.logger_ref().warn(&stringify_for_diagnostics(&v, self.options.precision), span);
            }
            Stmt::Error(expr) => {
                let v = self.eval_expr(expr, span)?;
                return Err(SassError::new(SassErrorKind::User, stringify_for_diagnostics(&v, self.options.precision), span));
            }
            Stmt::Import(args) => self.eval_import(args, span)?,
            Stmt::Use { url, namespace, configuration } => self.eval_use(url, namespace.as_ref(), configuration, span)?,
            Stmt::Forward { url, prefix, show, hide, configuration } => {
                self.eval_forward(url, prefix.as_deref(), show.as_deref(), hide.as_deref(), configuration, span)?;
            }
            Stmt::LoudComment(text) => {
                let parent = self.rule_parent();
                self.tree.push_child(parent, CssNodeKind::Comment(text.clone()), span);
            }
            Stmt::SilentComment(_) => {}
            Stmt::AtRule(AtRule::Charset) => {
                self.tree.push_child(CssTree::ROOT, CssNodeKind::Charset, span);
            }
            Stmt::AtRule(AtRule::Unknown(u)) => return self.eval_unknown_at_rule(u, span),
        }
        Ok(Flow::Normal)
    }

    fn eval_rule_set(&mut self, selector: &Interpolation, body: &[Spanned<Stmt>], span: Span) -> SassResult<Flow> {
        let text = self.eval_interpolation(selector, span)?;
        if self.in_keyframes {
            let sel_text = parse_keyframe_selector(&text, span)?;
            let parent = self.rule_parent();
            let node = self.tree.push_child(parent, CssNodeKind::Style { selector: sel_text, declarations: Vec::new() }, span);
            let saved_current = std::mem::replace(&mut self.current, node);
            self.scope = self.scope.push(FrameKind::Block);
            let flow = self.eval_stmts(body);
            self.scope = self.scope.pop();
            self.current = saved_current;
            return flow;
        }

        let list = parse_selector_list(&text, span)?;
        let resolved = self.selector.zip(&Selector::from_list(list), span)?;
        let parent = self.rule_parent();
        let node = self.tree.push_child(
            parent,
            CssNodeKind::Style {
                selector: resolved.to_string(),
                declarations: Vec::new(),
            },
            span,
        );
        self.extender.add_selector(node, &resolved.0, self.media_context.clone());

        let saved_current = std::mem::replace(&mut self.current, node);
        let saved_selector = std::mem::replace(&mut self.selector, resolved);
        self.scope = self.scope.push(FrameKind::Block);
        let flow = self.eval_stmts(body);
        self.scope = self.scope.pop();
        self.current = saved_current;
        self.selector = saved_selector;
        flow
    }

    fn eval_at_root(&mut self, query: Option<&Interpolation>, body: &[Spanned<Stmt>], span: Span) -> SassResult<Flow> {
        let parsed_query = match query {
            Some(interp) => {
                let text = self.eval_interpolation(interp, span)?;
                AtRootQuery::parse(&text)
            }
            None => AtRootQuery::default(),
        };
        let target = self.at_root_target(&parsed_query);
        let saved_current = std::mem::replace(&mut self.current, target);
        let saved_selector = if parsed_query.excludes("rule") {
            Some(std::mem::replace(&mut self.selector, Selector::new()))
        } else {
            None
        };
        let flow = self.eval_stmts(body);
        if let Some(selector) = saved_selector {
            self.selector = selector;
        }
        self.current = saved_current;
        flow
    }

    /// Walk up from the current position until a node whose kind isn't
    /// excluded by `query` is found, or the root is reached (§4.C
    /// `AtRootQueryParser`, §4.H "at-root target resolution").
    fn at_root_target(&self, query: &AtRootQuery) -> NodeId {
        let mut node = self.current;
        loop {
            if node == CssTree::ROOT {
                return node;
            }
            let kind_name = match &self.tree.node(node).kind {
                CssNodeKind::Style { .. } => Some("rule"),
                CssNodeKind::Media { .. } => Some("media"),
                CssNodeKind::Supports { .. } => Some("supports"),
                _ => None,
            };
            if let Some(kind_name) = kind_name {
                if !query.excludes(kind_name) {
                    return node;
                }
            }
            match self.tree.node(node).parent {
                Some(p) => node = p,
                None => return CssTree::ROOT,
            }
        }
    }

    fn eval_for(&mut self, var: &str, from: &Expr, to: &Expr, inclusive: bool, body: &[Spanned<Stmt>], span: Span) -> SassResult<Flow> {
        let from_n = self.eval_expr(from, span)?.assert_number(span)?.clone();
        let to_n = self.eval_expr(to, span)?.assert_number(span)?.clone();
        let unit = from_n.unit.clone();
        let from_i = from_n.value.round() as i64;
        let to_i = to_n.value.round() as i64;

        let values: Vec<i64> = if from_i <= to_i {
            if inclusive { (from_i..=to_i).collect() } else { (from_i..to_i).collect() }
        } else {
            let mut v: Vec<i64> = if inclusive { (to_i..=from_i).collect() } else { (to_i + 1..=from_i).collect() };
            v.reverse();
            v
        };

        self.scope = self.scope.push(FrameKind::Loop);
        let mut flow = Flow::Normal;
        for i in values {
            self.scope = std::mem::take(&mut self.scope).insert_var(var, Value::Number(SassNumber::new(i as f64, unit.clone())));
            match self.eval_stmts(body)? {
                Flow::Normal => {}
                other => {
                    flow = other;
                    break;
                }
            }
        }
        self.scope = self.scope.pop();
        Ok(flow)
    }

    fn eval_each(&mut self, vars: &[String], iterable: &Expr, body: &[Spanned<Stmt>], span: Span) -> SassResult<Flow> {
        let iter_val = self.eval_expr(iterable, span)?;
        let items = iter_val.as_list_items();

        self.scope = self.scope.push(FrameKind::Loop);
        let mut flow = Flow::Normal;
        for item in items {
            if vars.len() == 1 {
                self.scope = std::mem::take(&mut self.scope).insert_var(&vars[0], item);
            } else {
                let parts = item.as_list_items();
                for (i, v) in vars.iter().enumerate() {
                    let val = parts.get(i).cloned().unwrap_or(Value::Null);
                    self.scope = std::mem::take(&mut self.scope).insert_var(v, val);
                }
            }
            match self.eval_stmts(body)? {
                Flow::Normal => {}
                other => {
                    flow = other;
                    break;
                }
            }
        }
        self.scope = self.scope.pop();
        Ok(flow)
    }

    fn eval_while(&mut self, cond: &Expr, body: &[Spanned<Stmt>], span: Span) -> SassResult<Flow> {
        let mut flow = Flow::Normal;
        loop {
            if !self.eval_expr(cond, span)?.is_truthy() {
                break;
            }
            self.scope = self.scope.push(FrameKind::Loop);
            let r = self.eval_stmts(body)?;
            self.scope = self.scope.pop();
            match r {
                Flow::Normal => {}
                other => {
                    flow = other;
                    break;
                }
            }
        }
        Ok(flow)
    }

    fn eval_declaration_block_body(&mut self, prefix: &str, body: &[Spanned<Stmt>]) -> SassResult<Flow> {
        for stmt in body {
            let span = stmt.span;
            match &stmt.node {
                Stmt::Declaration { property, value } => {
                    let prop = self.eval_interpolation(property, span)?;
                    let v = self.eval_expr(value, span)?;
                    let full_prop = format!("{}-{}", prefix, prop);
                    self.push_declaration(full_prop, v.to_css_string(span)?, span);
                }
                Stmt::DeclarationBlock { property, value, body: nested } => {
                    let prop = self.eval_interpolation(property, span)?;
                    let full_prefix = format!("{}-{}", prefix, prop);
                    if let Some(v) = value {
                        let vv = self.eval_expr(v, span)?;
                        self.push_declaration(full_prefix.clone(), vv.to_css_string(span)?, span);
                    }
                    match self.eval_declaration_block_body(&full_prefix, nested)? {
                        Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                _ => match self.eval_stmt(stmt)? {
                    Flow::Normal => {}
                    other => return Ok(other),
                },
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_include(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        args: &[Argument],
        content: Option<&Vec<Spanned<Stmt>>>,
        span: Span,
    ) -> SassResult<()> {
        let call_args = self.eval_arguments(args, span)?;
        let mixin = match namespace {
            Some(ns) => {
                let module = self.find_module(ns, span)?;
                module
                    .scope
                    .get_mixin(name)
                    .ok_or_else(|| SassError::new(SassErrorKind::UndefinedMixin, format!("Undefined mixin \"{}\" in module \"{}\".", name, ns), span))?
            }
            None => self
                .scope
                .get_mixin(name)
                .ok_or_else(|| SassError::new(SassErrorKind::UndefinedMixin, format!("Undefined mixin \"{}\".", name), span))?,
        };
        let content_value = content.map(|body| (Rc::new(body.clone()), self.scope.clone()));
        self.call_mixin(name, mixin, call_args, content_value, span)
    }

    fn call_mixin(
        &mut self,
        name: &str,
        mixin: Rc<Mixin>,
        call_args: CallArgs,
        content: Option<(Rc<Vec<Spanned<Stmt>>>, Scope)>,
        span: Span,
    ) -> SassResult<()> {
        if content.is_some() && !mixin.accepts_content {
            return Err(SassError::new(
                SassErrorKind::ContentWithoutAcceptingMixin,
                format!("Mixin \"{}\" doesn't accept content blocks.", name),
                span,
            ));
        }
        self.depth += 1;
        if self.depth > self.options.recursion_limit {
            self.depth -= 1;
            return Err(SassError::new(SassErrorKind::RecursionLimit, "Recursion limit exceeded.".to_string(), span));
        }

        let bound = self.bind_call_args(&call_args, &mixin.args, name, &mixin.closure)?;
        let rest_args = collect_rest_arglists(&bound);
        let saved_scope = std::mem::replace(&mut self.scope, mixin.closure.push(FrameKind::Block));
        for (n, v) in bound {
            self.scope = std::mem::take(&mut self.scope).insert_var(&n, v);
        }
        self.content_stack.push(content);
        let flow = self.eval_stmts(&mixin.body);
        self.content_stack.pop();
        self.scope = saved_scope;
        self.depth -= 1;
        let flow = flow?;

        check_rest_keywords_consumed(name, &rest_args, span)?;

        match flow {
            Flow::Normal => Ok(()),
            Flow::Return(_) => Err(SassError::new(SassErrorKind::ReturnOutsideFunction, "@return may not appear within a mixin.".to_string(), span)),
        }
    }

    fn call_user_function(&mut self, name: &str, func: Rc<Function>, call_args: CallArgs, span: Span) -> SassResult<Value> {
        self.depth += 1;
        if self.depth > self.options.recursion_limit {
            self.depth -= 1;
            return Err(SassError::new(SassErrorKind::RecursionLimit, "Recursion limit exceeded.".to_string(), span));
        }

        let bound = self.bind_call_args(&call_args, &func.args, name, &func.closure)?;
        let rest_args = collect_rest_arglists(&bound);
        let saved_scope = std::mem::replace(&mut self.scope, func.closure.push(FrameKind::Block));
        for (n, v) in bound {
            self.scope = std::mem::take(&mut self.scope).insert_var(&n, v);
        }
        let flow = self.eval_stmts(&func.body);
        self.scope = saved_scope;
        self.depth -= 1;
        let flow = flow?;

        check_rest_keywords_consumed(name, &rest_args, span)?;

        match flow {
            Flow::Return(v) => Ok(v),
            Flow::Normal => Err(SassError::new(SassErrorKind::User, format!("Function \"{}\" finished without @return.", name), func.pos)),
        }
    }

    /// Bind a call's arguments against a declaration, evaluating any unmet
    /// defaults against the callee's closure scope — not progressively
    /// extended with already-bound sibling parameters, since `CallArgs::
    /// bind`'s callback only ever sees the default `Expr`, not which
    /// parameter it belongs to (a default referencing an earlier parameter
    /// of the same call therefore sees the closure, not that sibling's
    /// value; recorded as an accepted simplification in DESIGN.md).
    fn bind_call_args(&mut self, call_args: &CallArgs, decl: &FuncArgs, fn_name: &str, closure: &Scope) -> SassResult<Vec<(String, Value)>> {
        let eval_scope = closure.clone();
        call_args.bind(decl, fn_name, |expr| {
            let saved = std::mem::replace(&mut self.scope, eval_scope.clone());
            let result = self.eval_expr(expr, call_args.span());
            self.scope = saved;
            result
        })
    }

    fn eval_extend(&mut self, selector: &Interpolation, is_optional: bool, span: Span) -> SassResult<()> {
        let text = self.eval_interpolation(selector, span)?;
        let list = parse_selector_list(&text, span)?;
        for complex in &list.0 {
            for compound in complex.compounds() {
                for simple in &compound.0 {
                    for extender_complex in &self.selector.0 .0 {
                        self.extender
                            .add_extension(extender_complex.clone(), simple.clone(), self.media_context.clone(), is_optional, span);
                    }
                }
            }
        }
        Ok(())
    }

    fn eval_assign(&mut self, namespace: Option<&str>, name: &str, value: &Expr, default: bool, global: bool, span: Span) -> SassResult<()> {
        if let Some(ns) = namespace {
            return Err(SassError::new(
                SassErrorKind::ModuleUnknown,
                format!("Cannot modify variable \"{}.{}\": module variables are read-only.", ns, name),
                span,
            ));
        }
        let v = match self.eval_expr(value, span)? {
            Value::Number(n) => Value::Number(n.without_slash()),
            other => other,
        };
        self.scope = if global {
            std::mem::take(&mut self.scope).insert_global_var(name, v)
        } else if default {
            std::mem::take(&mut self.scope).insert_default_var(name, v)
        } else {
            std::mem::take(&mut self.scope).insert_var(name, v)
        };
        Ok(())
    }

    fn eval_import(&mut self, args: &[ImportArg], span: Span) -> SassResult<()> {
        for arg in args {
            match arg {
                ImportArg::Sass(url) => {
                    if is_plain_css_import(url) {
                        self.emit_plain_import(url, span);
                    } else {
                        let stmts = self.loader.load_import(url, self.current_file.as_deref(), self.sources, span)?;
                        self.scope = self.scope.push(FrameKind::Import);
                        let flow = self.eval_stmts(&stmts);
                        self.scope = self.scope.pop();
                        flow?;
                    }
                }
                ImportArg::StaticCss(interp) => {
                    let text = self.eval_interpolation(interp, span)?;
                    self.emit_plain_import(&text, span);
                }
            }
        }
        Ok(())
    }

    fn emit_plain_import(&mut self, url: &str, span: Span) {
        let rendered = if url.starts_with("url(") || url.starts_with('"') || url.starts_with('\'') {
            url.to_string()
        } else {
            format!("\"{}\"", url)
        };
        let parent = self.rule_parent();
        self.tree.push_child(parent, CssNodeKind::Import(rendered), span);
    }

    fn eval_use(&mut self, url: &str, namespace: Option<&UseNamespace>, configuration: &[(String, Expr)], span: Span) -> SassResult<()> {
        let module = self.load_and_eval_module(url, configuration, span)?;
        match namespace {
            Some(UseNamespace::Named(name)) => self.modules.push((name.clone(), module)),
            Some(UseNamespace::Star) => self.scope.extend(module.scope.clone()),
            None => self.modules.push((self.default_namespace(url), module)),
        }
        Ok(())
    }

    fn eval_forward(
        &mut self,
        url: &str,
        prefix: Option<&str>,
        show: Option<&[String]>,
        hide: Option<&[String]>,
        configuration: &[(String, Expr)],
        span: Span,
    ) -> SassResult<()> {
        let module = self.load_and_eval_module(url, configuration, span)?;
        let merged = self.scope.extend_filtered(module.scope.clone(), show, hide, prefix);
        self.forwarded.extend(merged);
        Ok(())
    }

    fn default_namespace(&self, url: &str) -> String {
        let stem = Path::new(url).file_stem().and_then(|s| s.to_str()).unwrap_or(url);
        stem.strip_prefix('_').unwrap_or(stem).to_string()
    }

    /// Load (or fetch from cache) and evaluate a `@use`/`@forward` target,
    /// running its statements against a fresh module-root scope. The
    /// module's own top-level rules are appended into this same tree at
    /// their point of loading (a simplification of dart-sass's strict
    /// dependency-first output ordering, recorded in DESIGN.md) rather than
    /// reordered by the full module dependency graph.
    fn load_and_eval_module(&mut self, url: &str, configuration: &[(String, Expr)], span: Span) -> SassResult<Rc<Module>> {
        let load = self.loader.load_module(url, self.current_file.as_deref(), self.sources, span)?;
        let (canonical, stmts) = match load {
            ModuleLoad::Cached(module) => return Ok(module),
            ModuleLoad::Fresh { canonical, stmts } => (canonical, stmts),
        };

        let mut module_scope = Scope::new_module_root();
        for (name, expr) in configuration {
            let v = self.eval_expr(expr, span)?;
            module_scope = module_scope.insert_var(name, v);
        }

        let saved_scope = std::mem::replace(&mut self.scope, module_scope);
        let saved_selector = std::mem::replace(&mut self.selector, Selector::new());
        let saved_file = std::mem::replace(&mut self.current_file, Some(canonical.clone()));
        let saved_forwarded = std::mem::take(&mut self.forwarded);

        let flow_result = self.eval_stmts(&stmts);

        self.current_file = saved_file;
        self.selector = saved_selector;
        let module_scope_final = std::mem::replace(&mut self.scope, saved_scope);
        let forwarded = std::mem::replace(&mut self.forwarded, saved_forwarded);
        flow_result?;

        let mut module = Module::new(module_scope_final);
        module.forwarded_vars = forwarded.clone();
        module.forwarded_mixins = forwarded.clone();
        module.forwarded_funcs = forwarded;
        let module = Rc::new(module);
        self.loader.record_compiled(canonical, Rc::clone(&module));
        Ok(module)
    }

    fn find_module(&self, namespace: &str, span: Span) -> SassResult<Rc<Module>> {
        self.modules
            .iter()
            .find(|(n, _)| n == namespace)
            .map(|(_, m)| Rc::clone(m))
            .ok_or_else(|| SassError::new(SassErrorKind::ModuleUnknown, format!("There is no module with the namespace \"{}\".", namespace), span))
    }

    fn eval_unknown_at_rule(&mut self, u: &UnknownAtRule, span: Span) -> SassResult<Flow> {
        let params = self.eval_interpolation(&u.params, span)?;
        let parent = self.rule_parent();
        let node = self.tree.push_child(
            parent,
            CssNodeKind::Unknown {
                name: u.name.clone(),
                params,
                declarations: Vec::new(),
            },
            span,
        );
        let saved_current = std::mem::replace(&mut self.current, node);
        let saved_selector = std::mem::replace(&mut self.selector, Selector::new());
        let saved_keyframes = self.in_keyframes;
        self.in_keyframes = is_keyframes_name(&u.name);

        let flow = self.eval_stmts(&u.body);

        self.in_keyframes = saved_keyframes;
        self.selector = saved_selector;
        self.current = saved_current;
        flow
    }

    /// Attach a resolved declaration to whatever the current position can
    /// hold: the enclosing style rule/unknown at-rule's `declarations`, or
    /// (if there is none — a bare top-level declaration) a freshly wrapped
    /// rule using the current selector, so it still reaches the output
    /// rather than being silently dropped.
    fn push_declaration(&mut self, property: String, value: String, span: Span) {
        let can_attach = matches!(&self.tree.node(self.current).kind, CssNodeKind::Style { .. } | CssNodeKind::Unknown { .. });
        if can_attach {
            match &mut self.tree.node_mut(self.current).kind {
                CssNodeKind::Style { declarations, .. } | CssNodeKind::Unknown { declarations, .. } => {
                    declarations.push(Style::new(property, value));
                }
                _ => unreachable!(),
            }
        } else {
            let parent = self.current;
            let selector = self.selector.to_string();
            self.tree.push_child(
                parent,
                CssNodeKind::Style {
                    selector,
                    declarations: vec![Style::new(property, value)],
                },
                span,
            );
        }
    }

    fn eval_interpolation(&mut self, interp: &Interpolation, span: Span) -> SassResult<String> {
        let mut out = String::new();
        for part in &interp.0 {
            match part {
                InterpolationPart::Literal(s) => out.push_str(s),
                InterpolationPart::Expr(e) => {
                    let v = self.eval_expr(e, span)?;
                    match v.to_css_string(span) {
                        Ok(s) => out.push_str(&s),
                        Err(_) => out.push_str(&v.inspect(self.options.precision)),
                    }
                }
            }
        }
        Ok(out)
    }

    fn eval_arguments(&mut self, args: &[Argument], span: Span) -> SassResult<CallArgs> {
        let mut call_args = CallArgs::new(span);
        for arg in args {
            match arg {
                Argument::Positional(e) => {
                    let v = self.eval_expr(e, span)?;
                    call_args.push_positional(v);
                }
                Argument::Named(name, e) => {
                    let v = self.eval_expr(e, span)?;
                    call_args.push_named(name, v);
                }
                Argument::Rest(e) => {
                    let v = self.eval_expr(e, span)?;
                    match v {
                        Value::ArgList(a) => {
                            for p in a.positional {
                                call_args.push_positional(p);
                            }
                            for (k, val) in a.keywords {
                                call_args.push_named(&k, val);
                            }
                        }
                        Value::Map(m) => {
                            for (k, val) in m.entries() {
                                let (s, _) = k.assert_string(span)?;
                                call_args.push_named(&s, val);
                            }
                        }
                        other => {
                            for item in other.as_list_items() {
                                call_args.push_positional(item);
                            }
                        }
                    }
                }
            }
        }
        Ok(call_args)
    }

    fn eval_expr(&mut self, expr: &Expr, span: Span) -> SassResult<Value> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::True => Ok(Value::Bool(true)),
            Expr::False => Ok(Value::Bool(false)),
            Expr::Number(n, unit) => Ok(Value::Number(SassNumber::new(*n, unit.clone()))),
            Expr::Color(c) => Ok(Value::Color(c.clone())),
            Expr::Str(interp, quote) => {
                let text = self.eval_interpolation(interp, span)?;
                Ok(Value::String(text, *quote))
            }
            Expr::List(items, sep, brackets) => {
                let values = items.iter().map(|e| self.eval_expr(e, span)).collect::<SassResult<Vec<_>>>()?;
                Ok(Value::List(values, *sep, *brackets))
            }
            Expr::Map(pairs) => {
                let mut map = SassMap::new();
                for (k, v) in pairs {
                    let kv = self.eval_expr(k, span)?;
                    let vv = self.eval_expr(v, span)?;
                    if map.insert(kv.clone(), vv) {
                        return Err(SassError::new(
                            SassErrorKind::DuplicateMapKey,
                            format!("Duplicate key {} in map.", kv.inspect(self.options.precision)),
                            span,
                        ));
                    }
                }
                Ok(Value::Map(map))
            }
            Expr::Variable(name) => self.scope.get_var(name).map_err(|e| SassError::new(e.kind(), e.message().to_string(), span)),
            Expr::NamespacedVariable(ns, name) => {
                let module = self.find_module(ns, span)?;
                module.scope.get_var(name).map_err(|e| SassError::new(e.kind(), e.message().to_string(), span))
            }
            Expr::FunctionCall(name, args) => self.eval_function_call(name, args, span),
            Expr::NamespacedFunctionCall(ns, name, args) => self.eval_namespaced_function_call(ns, name, args, span),
            Expr::If(args) => self.eval_if_function(args, span),
            Expr::BinaryOp(l, op, r) => self.eval_binary_op(l, *op, r, span),
            Expr::UnaryOp(op, e) => self.eval_unary_op(*op, e, span),
            Expr::Paren(e) => self.eval_expr(e, span),
            Expr::ParentSelector => Ok(Value::String(self.selector.to_string(), QuoteKind::None)),
            Expr::ValueWrapper(v) => Ok((**v).clone()),
            Expr::Interpolated(interp) => {
                let text = self.eval_interpolation(interp, span)?;
                Ok(Value::String(text, QuoteKind::None))
            }
        }
    }

    fn eval_function_call(&mut self, name: &str, args: &[Argument], span: Span) -> SassResult<Value> {
        let call_args = self.eval_arguments(args, span)?;
        if let Some(func) = self.scope.get_fn(name) {
            return self.call_user_function(name, func, call_args, span);
        }
        if is_environment_dependent(name) {
            return self.call_environment_function(name, &call_args, span);
        }
        if let Some(result) = builtin::call_global(name, &call_args, span) {
            return result;
        }
        // Unrecognized global call: treat it as a literal CSS function
        // invocation (`url(...)`, `attr(...)`, vendor functions, …) rather
        // than erroring, matching how plain CSS tolerates unknown function
        // syntax (§4.F).
        plain_css_function(name, &call_args, span)
    }

    fn eval_namespaced_function_call(&mut self, ns: &str, name: &str, args: &[Argument], span: Span) -> SassResult<Value> {
        let call_args = self.eval_arguments(args, span)?;
        if builtin::module_functions(ns).is_some() {
            if is_environment_dependent(name) {
                return self.call_environment_function(name, &call_args, span);
            }
            if let Some(result) = builtin::call_in_module(ns, name, &call_args, span) {
                return result;
            }
            return Err(SassError::new(
                SassErrorKind::UndefinedFunction,
                format!("Undefined function \"{}\" in module \"{}\".", name, ns),
                span,
            ));
        }
        let module = self.find_module(ns, span)?;
        if let Some(func) = module.scope.get_fn(name) {
            return self.call_user_function(name, func, call_args, span);
        }
        Err(SassError::new(
            SassErrorKind::UndefinedFunction,
            format!("Undefined function \"{}\" in module \"{}\".", name, ns),
            span,
        ))
    }

    /// Dispatch the handful of `sass:meta`/global functions that need live
    /// evaluator state instead of just their own arguments — the ones
    /// `builtin::meta::ENVIRONMENT_DEPENDENT` lists (§4.F).
    fn call_environment_function(&mut self, name: &str, call_args: &CallArgs, span: Span) -> SassResult<Value> {
        let key = normalize(name);
        match key.as_str() {
            "variable-exists" => {
                let (n, _) = require_arg(call_args, "name", span)?.assert_string(span)?;
                Ok(Value::Bool(self.scope.var_exists(&n)))
            }
            "global-variable-exists" => {
                // Approximation (recorded in DESIGN.md): `Scope` has no
                // "global frame only" lookup, so this checks the ordinary
                // chain instead of restricting to the outermost frame.
                let (n, _) = require_arg(call_args, "name", span)?.assert_string(span)?;
                Ok(Value::Bool(self.scope.var_exists(&n)))
            }
            "function-exists" => {
                let (n, _) = require_arg(call_args, "name", span)?.assert_string(span)?;
                Ok(Value::Bool(self.scope.fn_exists(&n) || builtin::exists_global(&n)))
            }
            "mixin-exists" => {
                let (n, _) = require_arg(call_args, "name", span)?.assert_string(span)?;
                Ok(Value::Bool(self.scope.mixin_exists(&n)))
            }
            "content-exists" => {
                if self.content_stack.is_empty() {
                    return Err(SassError::new(
                        SassErrorKind::User,
                        "content-exists() may only be called within a mixin.",
                        span,
                    ));
                }
                Ok(Value::Bool(matches!(self.content_stack.last(), Some(Some(_)))))
            }
            "get-function" => {
                let (n, _) = require_arg(call_args, "name", span)?.assert_string(span)?;
                Ok(Value::Function(n))
            }
            "call" => self.eval_dynamic_call(call_args, span),
            _ => Err(SassError::new(SassErrorKind::UndefinedFunction, format!("Undefined function \"{}\".", name), span)),
        }
    }

    fn eval_dynamic_call(&mut self, call_args: &CallArgs, span: Span) -> SassResult<Value> {
        let func_val = call_args
            .get_positional(0)
            .or_else(|| call_args.get_named("function"))
            .ok_or_else(|| missing_arg("function", span))?;

        let mut rest = CallArgs::new(span);
        for v in call_args.positional.iter().skip(1) {
            rest.push_positional(v.clone());
        }
        for (n, v) in call_args.named.iter().filter(|(n, _)| n != "function") {
            rest.push_named(n, v.clone());
        }

        let name = match &func_val {
            Value::Function(name) => name.clone(),
            Value::String(s, _) => s.clone(),
            other => {
                return Err(SassError::new(
                    SassErrorKind::InvalidCssValue,
                    format!("{} is not a function reference.", other.inspect(self.options.precision)),
                    span,
                ));
            }
        };

        if let Some(func) = self.scope.get_fn(&name) {
            self.call_user_function(&name, func, rest, span)
        } else if let Some(result) = builtin::call_global(&name, &rest, span) {
            result
        } else {
            Err(SassError::new(SassErrorKind::UndefinedFunction, format!("Undefined function \"{}\".", name), span))
        }
    }

    fn eval_if_function(&mut self, args: &[Argument], span: Span) -> SassResult<Value> {
        let mut positional = Vec::new();
        let mut named: Vec<(String, &Expr)> = Vec::new();
        for a in args {
            match a {
                Argument::Positional(e) => positional.push(e),
                Argument::Named(n, e) => named.push((normalize(n), e)),
                Argument::Rest(_) => return Err(SassError::new(SassErrorKind::Parse, "if() doesn't support rest arguments.".to_string(), span)),
            }
        }
        let find = |key: &str, idx: usize| -> Option<Expr> {
            positional.get(idx).map(|e| (*e).clone()).or_else(|| named.iter().find(|(n, _)| n == key).map(|(_, e)| (*e).clone()))
        };
        let cond = find("condition", 0).ok_or_else(|| missing_arg("condition", span))?;
        let if_true = find("if-true", 1).ok_or_else(|| missing_arg("if-true", span))?;
        let if_false = find("if-false", 2).ok_or_else(|| missing_arg("if-false", span))?;

        if self.eval_expr(&cond, span)?.is_truthy() {
            self.eval_expr(&if_true, span)
        } else {
            self.eval_expr(&if_false, span)
        }
    }

    fn eval_binary_op(&mut self, lhs: &Expr, op: Op, rhs: &Expr, span: Span) -> SassResult<Value> {
        match op {
            Op::Or => {
                let l = self.eval_expr(lhs, span)?;
                if l.is_truthy() {
                    Ok(l)
                } else {
                    self.eval_expr(rhs, span)
                }
            }
            Op::And => {
                let l = self.eval_expr(lhs, span)?;
                if !l.is_truthy() {
                    Ok(l)
                } else {
                    self.eval_expr(rhs, span)
                }
            }
            _ => {
                let l = self.eval_expr(lhs, span)?;
                let r = self.eval_expr(rhs, span)?;
                match op {
                    Op::Equal => Ok(Value::Bool(l.equals(&r, span)?)),
                    Op::NotEqual => Ok(Value::Bool(!l.equals(&r, span)?)),
                    Op::GreaterThan | Op::GreaterThanEqual | Op::LessThan | Op::LessThanEqual => compare_numbers(&l, &r, op, span),
                    Op::Plus => eval_plus(l, r, span),
                    Op::Minus => eval_minus(l, r, span),
                    Op::Mul => {
                        let a = l.assert_number(span)?;
                        let b = r.assert_number(span)?;
                        Ok(Value::Number(a.mul(b).without_slash()))
                    }
                    Op::Div => {
                        let a = l.assert_number(span)?.clone();
                        let b = r.assert_number(span)?.clone();
                        let result = a.div(&b);
                        Ok(Value::Number(SassNumber::with_slash(result.value, result.unit, a, b)))
                    }
                    Op::Rem => {
                        let a = l.assert_number(span)?;
                        let b = r.assert_number(span)?;
                        Ok(Value::Number(a.rem(b, span)?.without_slash()))
                    }
                    Op::Not | Op::SingleEq | Op::Or | Op::And => {
                        Err(SassError::new(SassErrorKind::Parse, format!("\"{}\" is not a valid binary operator.", op), span))
                    }
                }
            }
        }
    }

    fn eval_unary_op(&mut self, op: Op, expr: &Expr, span: Span) -> SassResult<Value> {
        match op {
            Op::Minus => {
                let v = self.eval_expr(expr, span)?;
                Ok(Value::Number(v.assert_number(span)?.neg()))
            }
            Op::Not => {
                let v = self.eval_expr(expr, span)?;
                Ok(Value::Bool(!v.is_truthy()))
            }
            Op::Plus => {
                let v = self.eval_expr(expr, span)?;
                v.assert_number(span)?;
                Ok(v)
            }
            _ => Err(SassError::new(SassErrorKind::Parse, format!("\"{}\" is not a valid unary operator.", op), span)),
        }
    }
}

fn is_keyframes_name(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "keyframes" | "-webkit-keyframes" | "-moz-keyframes" | "-o-keyframes" | "-ms-keyframes"
    )
}

fn is_environment_dependent(name: &str) -> bool {
    let key = normalize(name);
    ENVIRONMENT_DEPENDENT.iter().any(|n| normalize(n) == key)
}

fn stringify_for_diagnostics(v: &Value, precision: usize) -> String {
    match v {
        Value::String(s, _) => s.clone(),
        other => other.inspect(precision),
    }
}

fn missing_arg(name: &str, span: Span) -> SassError {
    SassError::new(SassErrorKind::MissingArgument, format!("Missing argument ${}.", name), span)
}

/// Picks out every `$rest...` `ArgList` bound by a call, so their keyword
/// part can be checked for use once the callee's body has finished running
/// (§4.F step 5). Cloning an `ArgList` is cheap — the access flag is an
/// `Rc`, so the clone still observes `mark_keywords_accessed` calls made
/// on the copy that was actually inserted into scope.
fn collect_rest_arglists(bound: &[(String, Value)]) -> Vec<ArgList> {
    bound
        .iter()
        .filter_map(|(_, v)| match v {
            Value::ArgList(a) => Some(a.clone()),
            _ => None,
        })
        .collect()
}

/// Raises a too-many-arguments error listing the keyword names a `$rest...`
/// parameter received but whose body never read (§4.F step 5).
fn check_rest_keywords_consumed(fn_name: &str, rest_args: &[ArgList], span: Span) -> SassResult<()> {
    for rest in rest_args {
        if !rest.keywords.is_empty() && !rest.keywords_were_accessed() {
            let keys = rest.keywords.iter().map(|(k, _)| format!("${}", k)).collect::<Vec<_>>().join(", ");
            return Err(SassError::new(
                SassErrorKind::TooManyArguments,
                format!("{}() has no argument(s) named {}.", fn_name, keys),
                span,
            ));
        }
    }
    Ok(())
}

fn require_arg(call_args: &CallArgs, name: &str, span: Span) -> SassResult<Value> {
    call_args.get_positional(0).or_else(|| call_args.get_named(name)).ok_or_else(|| missing_arg(name, span))
}

fn compare_numbers(l: &Value, r: &Value, op: Op, span: Span) -> SassResult<Value> {
    let ln = l.assert_number(span)?;
    let rn = r.assert_number(span)?;
    if !ln.unit.comparable(&rn.unit) {
        return Err(SassError::new(
            SassErrorKind::UnitMismatch,
            format!("Incompatible units {} and {} for operator \"{}\".", ln.unit, rn.unit, op),
            span,
        ));
    }
    let rv = rn.unit.convert(rn.value, &ln.unit);
    let result = match op {
        Op::GreaterThan => ln.value > rv,
        Op::GreaterThanEqual => ln.value >= rv,
        Op::LessThan => ln.value < rv,
        Op::LessThanEqual => ln.value <= rv,
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

/// `+` between non-numbers concatenates their CSS-string forms (§4.E);
/// the result is quoted only when the left operand already was.
fn eval_plus(l: Value, r: Value, span: Span) -> SassResult<Value> {
    if let (Value::Number(a), Value::Number(b)) = (&l, &r) {
        return Ok(Value::Number(a.add(b, span)?.without_slash()));
    }
    let quote = match &l {
        Value::String(_, q) => *q,
        _ => QuoteKind::None,
    };
    let ls = l.to_css_string(span)?;
    let rs = r.to_css_string(span)?;
    Ok(Value::String(format!("{}{}", ls, rs), quote))
}

/// `-` between non-numbers is string subtraction: the two sides joined by
/// a literal hyphen, as CSS tooling historically relied on for things like
/// `-ms-`-prefixed custom identifiers built from interpolation.
fn eval_minus(l: Value, r: Value, span: Span) -> SassResult<Value> {
    if let (Value::Number(a), Value::Number(b)) = (&l, &r) {
        return Ok(Value::Number(a.sub(b, span)?.without_slash()));
    }
    Ok(Value::String(format!("{}-{}", l.to_css_string(span)?, r.to_css_string(span)?), QuoteKind::None))
}

fn plain_css_function(name: &str, call_args: &CallArgs, span: Span) -> SassResult<Value> {
    let mut parts = Vec::with_capacity(call_args.positional.len() + call_args.named.len());
    for v in &call_args.positional {
        parts.push(v.to_css_string(span)?);
    }
    for (n, v) in &call_args.named {
        parts.push(format!("{}: {}", n, v.to_css_string(span)?));
    }
    Ok(Value::String(format!("{}({})", name, parts.join(", ")), QuoteKind::None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{OutputStyle, Syntax};
    use crate::serializer::Serializer;

    fn eval_source(src: &str) -> String {
        let mut sources = SourceRegistry::new();
        let file = sources.register("t.scss", src.to_string());
        let stmts = crate::parser::StyleSheetParser::new(file.clone(), src, Syntax::Scss).parse().unwrap();
        let options = Options::new();
        let mut loader = ModuleLoader::new(Vec::new());
        let tree = Evaluator::new(file.span, &mut loader, &mut sources, &options, None).run(&stmts).unwrap();
        let mut map = crate::sourcemap::SourceMapBuilder::new();
        Serializer::new(OutputStyle::Expanded, &sources, &mut map).render(&tree)
    }

    #[test]
    fn simple_rule_with_variable() {
        let out = eval_source("$c: red;\n.a { color: $c; }");
        assert_eq!(out, ".a {\n  color: red;\n}\n");
    }

    #[test]
    fn nested_rule_bubbles_to_sibling() {
        let out = eval_source(".a { color: red; .b { color: blue; } }");
        assert_eq!(out, ".a {\n  color: red;\n}\n.a .b {\n  color: blue;\n}\n");
    }

    #[test]
    fn if_else_selects_branch() {
        let out = eval_source("$x: 2;\n.a { @if $x == 1 { color: red; } @else { color: blue; } }");
        assert_eq!(out, ".a {\n  color: blue;\n}\n");
    }

    #[test]
    fn arithmetic_adds_compatible_units() {
        let out = eval_source(".a { width: 1px + 2px; }");
        assert_eq!(out, ".a {\n  width: 3px;\n}\n");
    }

    #[test]
    fn extend_unions_declarations_into_target() {
        let out = eval_source(".err { color: red; } .fatal { @extend .err; font-weight: bold; }");
        assert_eq!(out, ".err, .fatal {\n  color: red;\n}\n.fatal {\n  font-weight: bold;\n}\n");
    }

    #[test]
    fn each_destructures_list_pairs() {
        let out = eval_source(".a { @each $k, $v in (x: 1px, y: 2px) { #{$k}: $v; } }");
        assert_eq!(out, ".a {\n  x: 1px;\n  y: 2px;\n}\n");
    }
}
