pub(crate) mod function;
pub(crate) mod if_rule;
pub(crate) mod mixin;
pub(crate) mod unknown;

pub(crate) use function::Function;
pub(crate) use mixin::Mixin;
pub(crate) use unknown::UnknownAtRule;

/// Unknown (to this compiler) at-rule: anything without dedicated
/// handling (`@charset`, `@font-face`, `@keyframes`, `@page`, vendor
/// at-rules, …) passes through as name + interpolated params + body,
/// matching the teacher's `UnknownAtRule` (§4.H "At-rule (generic,
/// unknown)").
#[derive(Debug, Clone)]
pub(crate) enum AtRule {
    Unknown(UnknownAtRule),
    Charset,
}

/// Recognize the at-rule keywords this compiler gives dedicated statement
/// handling to; anything else is `AtRuleKind::Unknown` and is parsed as a
/// generic `UnknownAtRule` instead (§4.C "one parser... differ only in
/// ... which constructs error out").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AtRuleKind {
    Use,
    Forward,
    Import,
    Include,
    Mixin,
    Function,
    Return,
    Content,
    If,
    Else,
    For,
    Each,
    While,
    Extend,
    Debug,
    Warn,
    Error,
    Media,
    Supports,
    AtRoot,
    Charset,
    Unknown,
}

impl From<&str> for AtRuleKind {
    fn from(s: &str) -> AtRuleKind {
        match s.to_ascii_lowercase().as_str() {
            "use" => AtRuleKind::Use,
            "forward" => AtRuleKind::Forward,
            "import" => AtRuleKind::Import,
            "include" => AtRuleKind::Include,
            "mixin" => AtRuleKind::Mixin,
            "function" => AtRuleKind::Function,
            "return" => AtRuleKind::Return,
            "content" => AtRuleKind::Content,
            "if" => AtRuleKind::If,
            "else" => AtRuleKind::Else,
            "for" => AtRuleKind::For,
            "each" => AtRuleKind::Each,
            "while" => AtRuleKind::While,
            "extend" => AtRuleKind::Extend,
            "debug" => AtRuleKind::Debug,
            "warn" => AtRuleKind::Warn,
            "error" => AtRuleKind::Error,
            "media" => AtRuleKind::Media,
            "supports" => AtRuleKind::Supports,
            "at-root" => AtRuleKind::AtRoot,
            "charset" => AtRuleKind::Charset,
            _ => AtRuleKind::Unknown,
        }
    }
}
