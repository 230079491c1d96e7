#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::errors::EvalErrorKind;
use nds_ir::{BinaryOp, Expr, Stmt};

fn double() -> Arc<Definition> {
    Arc::new(Definition::new(
        "double",
        &["x"],
        vec![Stmt::expr(Expr::binary(
            BinaryOp::Add,
            Expr::ident("x"),
            Expr::ident("x"),
        ))],
    ))
}

fn processor() -> MacroProcessor {
    let mut macros = MacroProcessor::default();
    macros.register(double());
    macros
}

fn is_macro_error(err: &crate::errors::EvalError) -> bool {
    matches!(err.kind, EvalErrorKind::MacroExpansion { .. })
}

mod registry_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_register_and_lookup() {
        let macros = processor();
        assert!(macros.has("double"));
        assert_eq!(macros.len(), 1);
        assert_eq!(macros.names(), vec!["double".to_string()]);
        assert_eq!(macros.max_expansion_depth(), DEFAULT_MAX_EXPANSION_DEPTH);
    }

    #[test]
    fn test_redefinition_replaces() {
        let mut macros = processor();
        macros.register(Arc::new(Definition::new(
            "double",
            &["x", "y"],
            vec![Stmt::expr(Expr::ident("y"))],
        )));
        assert_eq!(macros.len(), 1);
        assert_eq!(macros.get("double").map(|d| d.arity()), Some(2));
    }
}

mod expand_call_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_non_atomic_argument_is_parenthesized() {
        assert_eq!(
            processor().expand_call("double", &["3+1"]).unwrap(),
            "(3+1) + (3+1)"
        );
    }

    #[test]
    fn test_atomic_argument_is_inserted_bare() {
        let macros = processor();
        assert_eq!(macros.expand_call("double", &["n"]).unwrap(), "n + n");
        assert_eq!(macros.expand_call("double", &["2.5"]).unwrap(), "2.5 + 2.5");
        assert_eq!(macros.expand_call("double", &["(a)"]).unwrap(), "(a) + (a)");
    }

    #[test]
    fn test_substitution_is_whole_word_and_skips_strings() {
        let mut macros = MacroProcessor::default();
        macros.register(Arc::new(Definition::new(
            "tag",
            &["x"],
            vec![Stmt::expr(Expr::call(
                "join",
                vec![Expr::ident("x"), Expr::ident("xx"), Expr::string("x")],
            ))],
        )));
        assert_eq!(
            macros.expand_call("tag", &["5"]).unwrap(),
            r#"join(5, xx, "x")"#
        );
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let mut macros = MacroProcessor::default();
        macros.register(Arc::new(Definition::new(
            "pair",
            &["a", "b"],
            vec![Stmt::expr(Expr::binary(
                BinaryOp::Sub,
                Expr::ident("a"),
                Expr::ident("b"),
            ))],
        )));
        assert_eq!(macros.expand_call("pair", &["b", "a"]).unwrap(), "b - a");
    }

    #[test]
    fn test_arity_mismatch() {
        let err = processor().expand_call("double", &["1", "2"]).unwrap_err();
        assert!(is_macro_error(&err));
        assert_eq!(err.message, "macro expansion failed: macro 'double' expects 1 arguments, got 2");
    }

    #[test]
    fn test_unknown_macro() {
        let err = processor().expand_call("triple", &["1"]).unwrap_err();
        assert!(is_macro_error(&err));
    }
}

mod expand_source_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expression_macro_keeps_precedence() {
        assert_eq!(
            processor().expand_source("y = 2 * double(3)").unwrap(),
            "y = 2 * (3 + 3)"
        );
    }

    #[test]
    fn test_nested_calls_expand_over_rounds() {
        assert_eq!(
            processor().expand_source("double(double(1))").unwrap(),
            "(((1 + 1)) + ((1 + 1)))"
        );
    }

    #[test]
    fn test_definition_header_and_strings_are_untouched() {
        let source = "macro double(x): { x + x }\nprint(\"double(2)\")\ndouble(2) # double(9)";
        assert_eq!(
            processor().expand_source(source).unwrap(),
            "macro double(x): { x + x }\nprint(\"double(2)\")\n(2 + 2) # double(9)"
        );
    }

    #[test]
    fn test_unrelated_identifiers_are_untouched() {
        let source = "redouble(2) + double_it(3) + 2e5";
        assert_eq!(processor().expand_source(source).unwrap(), source);
    }

    #[test]
    fn test_arabic_comma_separates_arguments() {
        let err = processor().expand_source("double(1، 2)").unwrap_err();
        assert_eq!(err.message, "macro expansion failed: macro 'double' expects 1 arguments, got 2");
    }

    #[test]
    fn test_self_referential_macro_hits_depth_limit() {
        let mut macros = MacroProcessor::new(3);
        macros.register(Arc::new(Definition::new(
            "spin",
            &["x"],
            vec![Stmt::expr(Expr::call("spin", vec![Expr::ident("x")]))],
        )));

        let err = macros.expand_source("spin(1)").unwrap_err();

        assert!(is_macro_error(&err));
        assert!(err.message.contains("maximum expansion depth 3 exceeded"));
        assert_eq!(err.notes, vec!["still expanding: spin".to_string()]);
    }

    #[test]
    fn test_unterminated_call() {
        let err = processor().expand_source("double(1 + 2").unwrap_err();
        assert!(is_macro_error(&err));
    }
}
