//! Test suite for the whitelisted formula evaluator
//!
//! Tests cover:
//! - Arithmetic, precedence, and exponentiation
//! - Whitelisted functions and constants
//! - Variable binding and compiled formulas
//! - Saved formula definitions with defaults and overrides
//! - Rejection of anything outside the formula vocabulary

use chrono::Utc;
use rangesync::formula::{
    default_bindings, evaluate, CompiledFormula, FormulaError, FormulaEvaluator, MAX_TOKENS,
};
use rangesync::store::{CustomFormula, FormulaVariable};
use std::collections::HashMap;

fn vars(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

fn saved(formula: &str, variables: Vec<FormulaVariable>) -> CustomFormula {
    CustomFormula {
        id: "f-1".to_string(),
        name: "test".to_string(),
        formula: formula.to_string(),
        description: String::new(),
        variables,
        created_at: Utc::now(),
    }
}

#[test]
fn test_simple_arithmetic() {
    let eval = FormulaEvaluator::new();
    let none = HashMap::new();
    assert_eq!(eval.evaluate("2 + 2", &none).unwrap(), 4.0);
    assert_eq!(eval.evaluate("10 - 3", &none).unwrap(), 7.0);
    assert_eq!(eval.evaluate("4 * 5", &none).unwrap(), 20.0);
    assert_eq!(eval.evaluate("20 / 4", &none).unwrap(), 5.0);
    assert_eq!(eval.evaluate("  7  ", &none).unwrap(), 7.0);
}

#[test]
fn test_order_of_operations() {
    let none = HashMap::new();
    assert_eq!(evaluate("2 + 3 * 4", &none).unwrap(), 14.0);
    assert_eq!(evaluate("(2 + 3) * 4", &none).unwrap(), 20.0);
    assert_eq!(evaluate("10 - 5 - 2", &none).unwrap(), 3.0);
    assert_eq!(evaluate("2^3 * 2", &none).unwrap(), 16.0);
    assert_eq!(evaluate("2^3^2", &none).unwrap(), 512.0);
    assert_eq!(evaluate("-2^2", &none).unwrap(), -4.0);
    assert_eq!(evaluate("(-2)^2", &none).unwrap(), 4.0);
    assert_eq!(evaluate("2**3", &none).unwrap(), 8.0);
    assert_eq!(evaluate("--3", &none).unwrap(), 3.0);
}

#[test]
fn test_whitelisted_functions() {
    let none = HashMap::new();
    assert_eq!(evaluate("sqrt(16)", &none).unwrap(), 4.0);
    assert_eq!(evaluate("abs(-3.5)", &none).unwrap(), 3.5);
    assert_eq!(evaluate("pow(2, 10)", &none).unwrap(), 1024.0);
    assert_eq!(evaluate("sin(0)", &none).unwrap(), 0.0);
    assert_eq!(evaluate("cos(0)", &none).unwrap(), 1.0);
    assert_eq!(evaluate("tan(0)", &none).unwrap(), 0.0);
    assert!(approx_eq(evaluate("log(E)", &none).unwrap(), 1.0));
    assert!(approx_eq(evaluate("sin(PI / 2)", &none).unwrap(), 1.0));
}

#[test]
fn test_variables_are_bound() {
    let x = vars(&[("x", 3.0)]);
    assert_eq!(evaluate("x^2", &x).unwrap(), 9.0);
    assert_eq!(evaluate("sqrt(x)", &vars(&[("x", 16.0)])).unwrap(), 4.0);
    assert_eq!(
        evaluate("a * x + b", &vars(&[("a", 2.0), ("x", 5.0), ("b", -1.0)])).unwrap(),
        9.0
    );
}

#[test]
fn test_constants_take_precedence_over_variables() {
    let shadow = vars(&[("PI", 3.0), ("pi", 3.0)]);
    assert_eq!(evaluate("PI", &shadow).unwrap(), std::f64::consts::PI);
    // Constants are case-sensitive, so lowercase `pi` is an ordinary variable.
    assert_eq!(evaluate("pi", &shadow).unwrap(), 3.0);
}

#[test]
fn test_non_finite_results_are_errors() {
    let none = HashMap::new();
    assert_eq!(
        evaluate("1/0", &none),
        Err(FormulaError::NonFinite(f64::INFINITY))
    );
    assert!(matches!(
        evaluate("sqrt(-1)", &none),
        Err(FormulaError::NonFinite(_))
    ));
    assert!(matches!(
        evaluate("log(0)", &none),
        Err(FormulaError::NonFinite(_))
    ));
}

#[test]
fn test_unknown_names_are_errors() {
    let none = HashMap::new();
    assert_eq!(
        evaluate("y + 1", &none),
        Err(FormulaError::UnknownIdentifier("y".to_string()))
    );
    assert_eq!(
        evaluate("exp(1)", &none),
        Err(FormulaError::UnknownFunction("exp".to_string()))
    );
    assert!(matches!(
        evaluate("pow(2)", &none),
        Err(FormulaError::WrongArity { expected: 2, found: 1, .. })
    ));
}

#[test]
fn test_code_like_input_is_rejected() {
    let none = HashMap::new();
    let attempts = [
        "alert(1)",
        "eval(1)",
        "constructor",
        "Math.sin(1)",
        "x; y",
        "'abc'",
        "[1, 2]",
        "a = 1",
        "process.exit()",
        "1 % 2",
        "x => x",
    ];
    for attempt in &attempts {
        assert!(
            evaluate(attempt, &none).is_err(),
            "{:?} should have been rejected",
            attempt
        );
    }
}

#[test]
fn test_syntax_errors() {
    let none = HashMap::new();
    assert_eq!(evaluate("", &none), Err(FormulaError::EmptyExpression));
    assert_eq!(evaluate("   ", &none), Err(FormulaError::EmptyExpression));
    assert_eq!(evaluate("(1 + 2", &none), Err(FormulaError::UnexpectedEnd));
    assert!(matches!(
        evaluate("2 +* 3", &none),
        Err(FormulaError::UnexpectedToken { .. })
    ));
    assert!(matches!(
        evaluate("1 2", &none),
        Err(FormulaError::UnexpectedToken { .. })
    ));
    assert_eq!(
        evaluate("x; y", &none),
        Err(FormulaError::UnexpectedCharacter {
            character: ';',
            position: 1
        })
    );
}

#[test]
fn test_pathological_input_fails_cleanly() {
    let none = HashMap::new();
    let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
    assert!(evaluate(&deep, &none).is_err());

    let signs = format!("{}1", "-".repeat(10_000));
    assert!(evaluate(&signs, &none).is_err());

    let long = vec!["1"; MAX_TOKENS].join("+");
    assert_eq!(evaluate(&long, &none), Err(FormulaError::TooLong(MAX_TOKENS)));

    let fits = vec!["1"; 500].join("+");
    assert_eq!(evaluate(&fits, &none).unwrap(), 500.0);
}

#[test]
fn test_error_messages() {
    assert_eq!(
        FormulaError::UnknownFunction("exp".into()).to_string(),
        "Unknown function: exp"
    );
    assert_eq!(
        FormulaError::UnknownIdentifier("y".into()).to_string(),
        "Unknown variable: y"
    );
    assert_eq!(
        FormulaError::WrongArity {
            function: "pow".into(),
            expected: 2,
            found: 1
        }
        .to_string(),
        "pow() takes 2 argument(s), got 1"
    );
}

#[test]
fn test_compiled_formula_reuse_and_variables() {
    let formula = CompiledFormula::parse("pow(x, 2) + y * PI - x").unwrap();
    assert_eq!(formula.source(), "pow(x, 2) + y * PI - x");
    let names: Vec<String> = formula.variables().into_iter().collect();
    assert_eq!(names, vec!["x".to_string(), "y".to_string()]);

    for x in 0..5 {
        let value = formula.evaluate(&vars(&[("x", x as f64), ("y", 0.0)])).unwrap();
        assert_eq!(value, (x * x - x) as f64);
    }
}

#[test]
fn test_custom_formula_uses_declared_defaults() {
    let eval = FormulaEvaluator::new();
    let formula = saved(
        "sqrt(pow(a, 2) + pow(b, 2))",
        vec![FormulaVariable::new("a", 3.0), FormulaVariable::new("b", 4.0)],
    );
    assert_eq!(eval.evaluate_custom_formula(&formula).unwrap(), 5.0);

    let bindings = default_bindings(&formula);
    assert_eq!(bindings.get("a"), Some(&3.0));
    assert_eq!(bindings.len(), 2);
}

#[test]
fn test_custom_formula_overrides() {
    let eval = FormulaEvaluator::new();
    let formula = saved("a * x", vec![FormulaVariable::new("a", 2.0)]);

    // `x` is not declared, so the defaults alone cannot evaluate it.
    assert_eq!(
        eval.evaluate_custom_formula(&formula),
        Err(FormulaError::UnknownIdentifier("x".to_string()))
    );
    assert_eq!(
        eval.evaluate_with_overrides(&formula, &vars(&[("x", 10.0)]))
            .unwrap(),
        20.0
    );
    assert_eq!(
        eval.evaluate_with_overrides(&formula, &vars(&[("x", 10.0), ("a", 5.0)]))
            .unwrap(),
        50.0
    );
}

#[test]
fn test_repeated_variable_takes_later_default() {
    let formula = saved(
        "k",
        vec![FormulaVariable::new("k", 1.0), FormulaVariable::new("k", 7.0)],
    );
    assert_eq!(
        FormulaEvaluator::new().evaluate_custom_formula(&formula).unwrap(),
        7.0
    );
}
