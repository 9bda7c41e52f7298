//! End-to-end scenarios from spec.md §8.2 (S1-S6), covering parent
//! references, `@extend`, `@content`, unit arithmetic, map functions,
//! and nested-`@media` merging.

#[macro_use]
mod macros;

test!(
    s1_parent_reference,
    ".a { color: red; &:hover { color: blue; } }",
    ".a {\n  color: red;\n}\n.a:hover {\n  color: blue;\n}\n"
);

test!(
    s2_extend_unions_into_target,
    ".err { color: red; }\n.fatal { @extend .err; font-weight: bold; }",
    ".err, .fatal {\n  color: red;\n}\n.fatal {\n  font-weight: bold;\n}\n"
);

test!(
    s3_mixin_with_content_nests_under_parent_reference,
    "@mixin hover { &:hover { @content; } }\na { @include hover { color: blue; } }",
    "a:hover {\n  color: blue;\n}\n"
);

test!(
    s4_math_with_units,
    "$w: 10px;\n.a { width: $w * 2; height: $w / 2; margin: $w + 5px; }",
    ".a {\n  width: 20px;\n  height: 5px;\n  margin: 15px;\n}\n"
);

test!(
    s5_map_get,
    "$m: (a: 1, b: 2);\n.x { value: map-get($m, b); }",
    ".x {\n  value: 2;\n}\n"
);

test!(
    s6_media_merge_conjoins_queries,
    "@media screen {\n  .a { color: red; }\n  @media (min-width: 500px) { .a { color: blue; } }\n}",
    "@media screen {\n  .a {\n    color: red;\n  }\n}\n@media screen and (min-width: 500px) {\n  .a {\n    color: blue;\n  }\n}\n"
);

test!(
    invariant_9_default_law_keeps_existing_value,
    "$x: a;\n$x: b !default;\n.a { value: $x; }",
    ".a {\n  value: a;\n}\n"
);

test!(
    invariant_9_default_law_sets_when_null,
    "$x: null;\n$x: b !default;\n.a { value: $x; }",
    ".a {\n  value: b;\n}\n"
);

error!(
    invariant_8_recursion_limit_is_enforced,
    "@function f($n) { @return f($n + 1); }\n.a { value: f(0); }",
    "Error: Recursion limit exceeded."
);
