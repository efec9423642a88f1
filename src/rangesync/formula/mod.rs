//! # Formula Evaluator
//!
//! Evaluates user-authored formulas such as `pow(x, 2) + sqrt(y)` over a set of named
//! variables.
//!
//! Expressions are never executed as code. They are tokenized, parsed by a small
//! recursive-descent parser into an expression tree, and that tree is walked. Only
//! the following vocabulary exists:
//!
//! - **Literals**: `42`, `3.14`, `.5`, `1e-3`
//! - **Operators**: `+`, `-`, `*`, `/`, `^` (exponentiation, `**` also accepted),
//!   unary `+`/`-`, parentheses
//! - **Functions**: `sin()`, `cos()`, `tan()` (radians), `sqrt()`, `abs()`,
//!   `log()` (natural logarithm), `pow(base, exponent)`
//! - **Constants**: `PI`, `E` (case-sensitive)
//! - **Variables**: any other identifier, resolved from the bindings
//!
//! ```rust
//! use rangesync::formula::FormulaEvaluator;
//! use std::collections::HashMap;
//!
//! let evaluator = FormulaEvaluator::new();
//! let mut vars = HashMap::new();
//! vars.insert("x".to_string(), 16.0);
//!
//! assert_eq!(evaluator.evaluate("sqrt(x)", &vars).unwrap(), 4.0);
//! assert_eq!(evaluator.evaluate("x^2", &vars).unwrap(), 256.0);
//! assert!(evaluator.evaluate("1/0", &vars).is_err());
//! ```
//!
//! ## Error Handling
//!
//! Every failure comes back as a [`FormulaError`]; nothing panics:
//!
//! - **Syntax**: `2 +* 3`, `(1`, `x; y`
//! - **Unknown names**: `foo(1)`, an unbound variable
//! - **Arity**: `pow(2)`
//! - **Non-finite results**: `1/0`, `sqrt(-1)`, `log(0)`

mod lexer;
mod parser;

use crate::rangesync::store::CustomFormula;
use parser::{BinaryOp, Expr};
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt;

/// Deepest nesting of parentheses, signs, and exponents a formula may use.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Longest formula, in tokens, that will be parsed.
pub const MAX_TOKENS: usize = 1024;

/// Why a formula could not be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// The expression was blank.
    EmptyExpression,
    /// A character outside the formula vocabulary.
    UnexpectedCharacter { character: char, position: usize },
    /// A numeric literal that could not be read.
    InvalidNumber { literal: String, position: usize },
    /// A token in a place the grammar does not allow it.
    UnexpectedToken { found: String, position: usize },
    /// The expression stopped while more input was required.
    UnexpectedEnd,
    /// A call to a function outside the whitelist.
    UnknownFunction(String),
    /// A whitelisted function called with the wrong number of arguments.
    WrongArity {
        function: String,
        expected: usize,
        found: usize,
    },
    /// A variable with no binding.
    UnknownIdentifier(String),
    /// Nesting beyond [`MAX_NESTING_DEPTH`].
    NestingTooDeep(usize),
    /// More than [`MAX_TOKENS`] tokens.
    TooLong(usize),
    /// The result was infinite or NaN.
    NonFinite(f64),
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaError::EmptyExpression => write!(f, "Formula is empty"),
            FormulaError::UnexpectedCharacter {
                character,
                position,
            } => write!(f, "Unexpected character '{}' at {}", character, position),
            FormulaError::InvalidNumber { literal, position } => {
                write!(f, "Invalid number '{}' at {}", literal, position)
            }
            FormulaError::UnexpectedToken { found, position } => {
                write!(f, "Unexpected '{}' at {}", found, position)
            }
            FormulaError::UnexpectedEnd => write!(f, "Unexpected end of formula"),
            FormulaError::UnknownFunction(name) => write!(f, "Unknown function: {}", name),
            FormulaError::WrongArity {
                function,
                expected,
                found,
            } => write!(
                f,
                "{}() takes {} argument(s), got {}",
                function, expected, found
            ),
            FormulaError::UnknownIdentifier(name) => write!(f, "Unknown variable: {}", name),
            FormulaError::NestingTooDeep(limit) => {
                write!(f, "Formula nests deeper than {} levels", limit)
            }
            FormulaError::TooLong(limit) => write!(f, "Formula exceeds {} tokens", limit),
            FormulaError::NonFinite(value) => {
                write!(f, "Result is not a finite number ({})", value)
            }
        }
    }
}

impl Error for FormulaError {}

/// Either a finite `f64` or the reason evaluation failed.
pub type FormulaResult = Result<f64, FormulaError>;

/// The whitelisted function vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Sqrt,
    Abs,
    Log,
    Pow,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "tan" => Some(Function::Tan),
            "sqrt" => Some(Function::Sqrt),
            "abs" => Some(Function::Abs),
            "log" => Some(Function::Log),
            "pow" => Some(Function::Pow),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Sqrt => "sqrt",
            Function::Abs => "abs",
            Function::Log => "log",
            Function::Pow => "pow",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Function::Pow => 2,
            _ => 1,
        }
    }

    fn apply(&self, args: &[f64]) -> f64 {
        match (self, args) {
            (Function::Sin, [x]) => x.sin(),
            (Function::Cos, [x]) => x.cos(),
            (Function::Tan, [x]) => x.tan(),
            (Function::Sqrt, [x]) => x.sqrt(),
            (Function::Abs, [x]) => x.abs(),
            (Function::Log, [x]) => x.ln(),
            (Function::Pow, [base, exponent]) => base.powf(*exponent),
            // Arity is checked during parsing.
            _ => f64::NAN,
        }
    }
}

/// The whitelisted named constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PI" => Some(Constant::Pi),
            "E" => Some(Constant::E),
            _ => None,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Constant::Pi => std::f64::consts::PI,
            Constant::E => std::f64::consts::E,
        }
    }
}

/// A parsed formula, ready to be evaluated any number of times.
///
/// ```rust
/// use rangesync::formula::CompiledFormula;
/// use std::collections::HashMap;
///
/// let formula = CompiledFormula::parse("a * x + b").unwrap();
/// let mut vars = HashMap::new();
/// vars.insert("a".to_string(), 2.0);
/// vars.insert("b".to_string(), 1.0);
///
/// let ys: Vec<f64> = (0..3)
///     .map(|x| {
///         vars.insert("x".to_string(), x as f64);
///         formula.evaluate(&vars).unwrap()
///     })
///     .collect();
/// assert_eq!(ys, vec![1.0, 3.0, 5.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    source: String,
    expr: Expr,
}

impl CompiledFormula {
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let tokens = lexer::tokenize(source)?;
        if tokens.len() > MAX_TOKENS {
            return Err(FormulaError::TooLong(MAX_TOKENS));
        }
        let expr = parser::parse(&tokens)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of every variable the formula reads, sorted.
    ///
    /// Useful for checking a formula against its declared variable list before saving.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        collect_variables(&self.expr, &mut names);
        names
    }

    pub fn evaluate(&self, variables: &HashMap<String, f64>) -> FormulaResult {
        let value = eval(&self.expr, variables)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite(value))
        }
    }
}

fn collect_variables(expr: &Expr, names: &mut BTreeSet<String>) {
    match expr {
        Expr::Variable(name) => {
            names.insert(name.clone());
        }
        Expr::Negate(inner) => collect_variables(inner, names),
        Expr::Binary(_, left, right) => {
            collect_variables(left, names);
            collect_variables(right, names);
        }
        Expr::Call(_, args) => args.iter().for_each(|arg| collect_variables(arg, names)),
        Expr::Number(_) | Expr::Constant(_) => {}
    }
}

fn eval(expr: &Expr, variables: &HashMap<String, f64>) -> FormulaResult {
    Ok(match expr {
        Expr::Number(value) => *value,
        Expr::Constant(constant) => constant.value(),
        Expr::Variable(name) => *variables
            .get(name)
            .ok_or_else(|| FormulaError::UnknownIdentifier(name.clone()))?,
        Expr::Negate(inner) => -eval(inner, variables)?,
        Expr::Binary(op, left, right) => {
            let left = eval(left, variables)?;
            let right = eval(right, variables)?;
            match op {
                BinaryOp::Add => left + right,
                BinaryOp::Subtract => left - right,
                BinaryOp::Multiply => left * right,
                BinaryOp::Divide => left / right,
                BinaryOp::Power => left.powf(right),
            }
        }
        Expr::Call(function, args) => {
            let values = args
                .iter()
                .map(|arg| eval(arg, variables))
                .collect::<Result<Vec<f64>, FormulaError>>()?;
            function.apply(&values)
        }
    })
}

/// Stateless entry point for evaluating formulas.
#[derive(Debug, Clone, Default)]
pub struct FormulaEvaluator {}

impl FormulaEvaluator {
    pub fn new() -> Self {
        FormulaEvaluator {}
    }

    /// Parse and evaluate `expression` against `variables`.
    pub fn evaluate(&self, expression: &str, variables: &HashMap<String, f64>) -> FormulaResult {
        let result = CompiledFormula::parse(expression).and_then(|f| f.evaluate(variables));
        if let Err(err) = &result {
            log::debug!("Formula evaluation failed for {:?}: {}", expression, err);
        }
        result
    }

    /// Evaluate a saved formula with each declared variable bound to its default.
    ///
    /// Variables are bound in declaration order; a repeated name takes the later
    /// default.
    pub fn evaluate_custom_formula(&self, formula: &CustomFormula) -> FormulaResult {
        self.evaluate_with_overrides(formula, &HashMap::new())
    }

    /// Like [`evaluate_custom_formula`](Self::evaluate_custom_formula), with
    /// `overrides` replacing (or adding to) the declared defaults.
    pub fn evaluate_with_overrides(
        &self,
        formula: &CustomFormula,
        overrides: &HashMap<String, f64>,
    ) -> FormulaResult {
        let mut bindings = default_bindings(formula);
        for (name, value) in overrides {
            bindings.insert(name.clone(), *value);
        }
        self.evaluate(&formula.formula, &bindings)
    }
}

/// The variable map a saved formula declares, built from its defaults.
pub fn default_bindings(formula: &CustomFormula) -> HashMap<String, f64> {
    formula
        .variables
        .iter()
        .map(|var| (var.name.clone(), var.default))
        .collect()
}

/// Shorthand for `FormulaEvaluator::new().evaluate(expression, variables)`.
pub fn evaluate(expression: &str, variables: &HashMap<String, f64>) -> FormulaResult {
    FormulaEvaluator::new().evaluate(expression, variables)
}
