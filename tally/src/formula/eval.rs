//! AST evaluation over a frozen metric value table.

use super::parser::{BinaryOp, Expr, UnaryOp};
use super::{FormulaError, MetricValues};

/// The supported `Math.*` functions. Anything outside this set fails the
/// parse, so formulas cannot reach arbitrary code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MathFunction {
    Round,
    Floor,
    Ceil,
    Abs,
    Max,
    Min,
    Sqrt,
    Pow,
    Exp,
    Log,
    Log10,
    Sin,
    Cos,
    Tan,
}

impl MathFunction {
    /// Look up by lowercased member name, as produced by the lexer.
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "round" => Self::Round,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "abs" => Self::Abs,
            "max" => Self::Max,
            "min" => Self::Min,
            "sqrt" => Self::Sqrt,
            "pow" => Self::Pow,
            "exp" => Self::Exp,
            "log" => Self::Log,
            "log10" => Self::Log10,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            _ => return None,
        })
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Round => "round",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Abs => "abs",
            Self::Max => "max",
            Self::Min => "min",
            Self::Sqrt => "sqrt",
            Self::Pow => "pow",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Log10 => "log10",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MathConstant {
    Pi,
    E,
}

impl MathConstant {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "pi" => Some(Self::Pi),
            "e" => Some(Self::E),
            _ => None,
        }
    }

    fn value(&self) -> f64 {
        match self {
            Self::Pi => std::f64::consts::PI,
            Self::E => std::f64::consts::E,
        }
    }
}

pub(crate) fn eval(expr: &Expr, values: &MetricValues) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Constant(constant) => Ok(constant.value()),
        Expr::Metric(name) => values
            .get(name.as_str())
            .copied()
            .ok_or_else(|| FormulaError::UnknownMetric(name.clone())),
        Expr::Unary { op: UnaryOp::Neg, operand } => Ok(-eval(operand, values)?),
        Expr::Binary { op, left, right } => {
            let left = eval(left, values)?;
            let right = eval(right, values)?;
            Ok(match op {
                BinaryOp::Add => left + right,
                BinaryOp::Sub => left - right,
                BinaryOp::Mul => left * right,
                BinaryOp::Div => left / right,
            })
        }
        Expr::Call { function, arguments } => call(*function, arguments, values),
    }
}

fn call(function: MathFunction, arguments: &[Expr], values: &MetricValues) -> Result<f64, FormulaError> {
    let args = arguments
        .iter()
        .map(|arg| eval(arg, values))
        .collect::<Result<Vec<_>, _>>()?;

    let unary = |args: &[f64]| -> Result<f64, FormulaError> {
        match args {
            [only] => Ok(*only),
            _ => Err(FormulaError::WrongArity {
                name: function.name(),
                expected: 1,
                got: args.len(),
            }),
        }
    };

    Ok(match function {
        MathFunction::Round => unary(&args)?.round(),
        MathFunction::Floor => unary(&args)?.floor(),
        MathFunction::Ceil => unary(&args)?.ceil(),
        MathFunction::Abs => unary(&args)?.abs(),
        MathFunction::Sqrt => unary(&args)?.sqrt(),
        MathFunction::Exp => unary(&args)?.exp(),
        MathFunction::Log => unary(&args)?.ln(),
        MathFunction::Log10 => unary(&args)?.log10(),
        MathFunction::Sin => unary(&args)?.sin(),
        MathFunction::Cos => unary(&args)?.cos(),
        MathFunction::Tan => unary(&args)?.tan(),
        MathFunction::Pow => match args[..] {
            [base, exponent] => base.powf(exponent),
            _ => {
                return Err(FormulaError::WrongArity {
                    name: function.name(),
                    expected: 2,
                    got: args.len(),
                })
            }
        },
        MathFunction::Max => fold_variadic(function, &args, f64::max)?,
        MathFunction::Min => fold_variadic(function, &args, f64::min)?,
    })
}

fn fold_variadic(function: MathFunction, args: &[f64], combine: fn(f64, f64) -> f64) -> Result<f64, FormulaError> {
    let (first, rest) = args.split_first().ok_or(FormulaError::WrongArity {
        name: function.name(),
        expected: 1,
        got: 0,
    })?;
    Ok(rest.iter().fold(*first, |acc, &x| combine(acc, x)))
}
