//! Vector formula evaluator.
//!
//! Walks a parsed [`Expr`] over a whole [`Series`] at once and produces one
//! [`Value`] per node.
//!
//! # Evaluation Semantics
//!
//! - `O/H/L/C/V`: the numeric column; literals stay scalar
//! - Binary operators broadcast a scalar operand against a vector operand
//! - Arithmetic: division by zero gives NaN at that index, never an error
//! - Comparisons: any NaN operand makes the comparison `false`
//! - `AND`/`OR`/`NOT`: numeric operands coerce via `!= 0`, NaN is `false`
//! - Calls: arguments are evaluated first, then dispatched to the indicator
//!   library

use crate::domain::error::FormulaError;
use crate::domain::formula::{BinaryOp, Expr, UnaryOp};
use crate::domain::indicator::{self, IndicatorFn, Signature};
use crate::domain::ohlcv::Series;
use crate::domain::value::{bool_to_f64, truthy, Value};

/// Evaluate `expr` across every bar of `series`.
pub fn evaluate(expr: &Expr, series: &Series) -> Result<Value, FormulaError> {
    Evaluator::new(series).eval(expr)
}

struct Evaluator<'a> {
    series: &'a Series,
    len: usize,
}

impl<'a> Evaluator<'a> {
    fn new(series: &'a Series) -> Self {
        Self {
            series,
            len: series.len(),
        }
    }

    fn eval(&self, expr: &Expr) -> Result<Value, FormulaError> {
        match expr {
            Expr::Literal(v) => Ok(Value::Scalar(*v)),
            Expr::SeriesRef(field) => Ok(Value::Numeric(self.series.column(*field))),
            Expr::Identifier { name, position } => Err(FormulaError::UnknownIdentifier {
                name: name.clone(),
                position: *position,
            }),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(self.unary(*op, value))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(self.binary(*op, &left, &right))
            }
            Expr::Call {
                name,
                args,
                position,
            } => self.call(name, args, *position),
        }
    }

    fn unary(&self, op: UnaryOp, value: Value) -> Value {
        match (op, value) {
            (UnaryOp::Neg, Value::Scalar(v)) => Value::Scalar(-v),
            (UnaryOp::Neg, value) => {
                Value::Numeric(value.into_numeric(self.len).into_iter().map(|v| -v).collect())
            }
            (UnaryOp::Not, Value::Scalar(v)) => Value::Scalar(bool_to_f64(!truthy(v))),
            (UnaryOp::Not, value) => {
                Value::Boolean((0..self.len).map(|i| !value.truthy_at(i)).collect())
            }
        }
    }

    fn binary(&self, op: BinaryOp, left: &Value, right: &Value) -> Value {
        let vector = left.is_vector() || right.is_vector();

        if op.is_arithmetic() {
            if !vector {
                return Value::Scalar(arithmetic(op, left.number_at(0), right.number_at(0)));
            }
            return Value::Numeric(
                (0..self.len)
                    .map(|i| arithmetic(op, left.number_at(i), right.number_at(i)))
                    .collect(),
            );
        }

        let at = |i: usize| -> bool {
            if op.is_comparison() {
                compare(op, left.number_at(i), right.number_at(i))
            } else {
                logical(op, left.truthy_at(i), right.truthy_at(i))
            }
        };

        if !vector {
            return Value::Scalar(bool_to_f64(at(0)));
        }
        Value::Boolean((0..self.len).map(at).collect())
    }

    fn call(&self, name: &str, args: &[Expr], position: usize) -> Result<Value, FormulaError> {
        let function =
            IndicatorFn::from_name(name).ok_or_else(|| FormulaError::UnknownFunction {
                name: name.to_string(),
                position,
            })?;

        let count_error = || FormulaError::ArgumentCount {
            function: function.to_string(),
            expected: function.arity(),
            found: args.len(),
            position,
        };
        if args.len() != function.arity() {
            return Err(count_error());
        }

        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let mut values = values.into_iter();
        let (Some(first), Some(second)) = (values.next(), values.next()) else {
            return Err(count_error());
        };

        match function.signature() {
            Signature::SeriesSeries => {
                let a = first.into_numeric(self.len);
                let b = second.into_numeric(self.len);
                Ok(Value::Boolean(indicator::cross(&a, &b)))
            }
            Signature::SeriesWindow => {
                let n = window_argument(function, &second, position)?;
                let x = first.into_numeric(self.len);
                let result = function
                    .apply_window(&x, n)
                    .unwrap_or_else(|| vec![f64::NAN; self.len]);
                Ok(Value::Numeric(result))
            }
        }
    }
}

/// Validate a window/lag argument: a numeric scalar holding an integer >= 1.
fn window_argument(
    function: IndicatorFn,
    value: &Value,
    position: usize,
) -> Result<usize, FormulaError> {
    let type_error = |found: String| FormulaError::ArgumentType {
        function: function.to_string(),
        argument: 2,
        expected: "an integer >= 1".to_string(),
        found,
        position,
    };

    match value {
        Value::Scalar(n) if n.is_finite() && *n >= 1.0 && n.fract() == 0.0 => Ok(*n as usize),
        Value::Scalar(n) => Err(type_error(n.to_string())),
        other => Err(type_error(other.kind_name().to_string())),
    }
}

fn arithmetic(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                f64::NAN
            } else {
                a / b
            }
        }
        _ => f64::NAN,
    }
}

/// IEEE comparisons already answer `false` for NaN on every operator except
/// `!=`, which has to be forced.
fn compare(op: BinaryOp, a: f64, b: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    match op {
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Eq => a == b,
        BinaryOp::Ne => a != b,
        _ => false,
    }
}

fn logical(op: BinaryOp, a: bool, b: bool) -> bool {
    match op {
        BinaryOp::And => a && b,
        BinaryOp::Or => a || b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::formula_parser::parse;
    use crate::domain::ohlcv::OhlcvBar;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_bar(date: u32, open: f64, high: f64, low: f64, close: f64, volume: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, date).unwrap(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    fn worked_series() -> Series {
        Series::new(vec![
            make_bar(1, 10.0, 11.0, 9.0, 10.0, 100.0),
            make_bar(2, 10.0, 12.0, 10.0, 11.0, 100.0),
            make_bar(3, 11.0, 13.0, 10.0, 12.0, 100.0),
        ])
    }

    fn eval_text(text: &str, series: &Series) -> Result<Value, FormulaError> {
        evaluate(&parse(text).unwrap(), series)
    }

    fn numeric(value: Value) -> Vec<f64> {
        match value {
            Value::Numeric(v) => v,
            other => panic!("expected numeric series, got {:?}", other),
        }
    }

    fn boolean(value: Value) -> Vec<bool> {
        match value {
            Value::Boolean(v) => v,
            other => panic!("expected boolean series, got {:?}", other),
        }
    }

    #[test]
    fn series_ref_is_column() {
        let series = worked_series();
        assert_eq!(numeric(eval_text("H", &series).unwrap()), vec![11.0, 12.0, 13.0]);
        assert_eq!(numeric(eval_text("v", &series).unwrap()), vec![100.0; 3]);
    }

    #[test]
    fn literal_is_scalar() {
        assert_eq!(eval_text("42", &worked_series()).unwrap(), Value::Scalar(42.0));
    }

    #[test]
    fn scalar_arithmetic_stays_scalar() {
        let series = worked_series();
        assert_eq!(eval_text("1 + 2 * 3", &series).unwrap(), Value::Scalar(7.0));
        assert_eq!(eval_text("-(4 - 6)", &series).unwrap(), Value::Scalar(2.0));
    }

    #[test]
    fn scalar_broadcasts_against_vector() {
        let series = worked_series();
        assert_eq!(
            numeric(eval_text("C * 2 - 1", &series).unwrap()),
            vec![19.0, 21.0, 23.0]
        );
        assert_eq!(
            numeric(eval_text("100 / C", &series).unwrap())[0],
            10.0
        );
    }

    #[test]
    fn division_by_zero_is_nan() {
        let series = worked_series();
        let values = numeric(eval_text("C / (H - 12)", &series).unwrap());
        assert_relative_eq!(values[0], -10.0);
        assert!(values[1].is_nan());
        assert_relative_eq!(values[2], 12.0);
        assert!(match eval_text("1 / 0", &series).unwrap() {
            Value::Scalar(v) => v.is_nan(),
            _ => false,
        });
    }

    #[test]
    fn comparison_with_warmup_nan_is_false() {
        let series = worked_series();
        assert_eq!(
            boolean(eval_text("C > MA(C, 2)", &series).unwrap()),
            vec![false, true, true]
        );
        assert_eq!(
            boolean(eval_text("C <= MA(C, 2)", &series).unwrap()),
            vec![false, false, false]
        );
        assert_eq!(
            boolean(eval_text("REF(C, 1) != 0", &series).unwrap()),
            vec![false, true, true]
        );
    }

    #[test]
    fn scalar_comparison_is_boolean_scalar() {
        let series = worked_series();
        assert_eq!(eval_text("1 > 0", &series).unwrap(), Value::Scalar(1.0));
        assert_eq!(eval_text("1 < 0", &series).unwrap(), Value::Scalar(0.0));
        assert_eq!(eval_text("2 == 2", &series).unwrap(), Value::Scalar(1.0));
    }

    #[test]
    fn logical_operators_coerce_numbers() {
        let series = worked_series();
        assert_eq!(
            boolean(eval_text("C > 10 AND H < 13", &series).unwrap()),
            vec![false, true, false]
        );
        assert_eq!(
            boolean(eval_text("C > 11 OR L < 10", &series).unwrap()),
            vec![true, false, true]
        );
        // numeric operand: REF(C,1) is NaN at 0, so false there
        assert_eq!(
            boolean(eval_text("REF(C, 1) AND 1", &series).unwrap()),
            vec![false, true, true]
        );
        assert_eq!(eval_text("0 OR 2", &series).unwrap(), Value::Scalar(1.0));
    }

    #[test]
    fn not_negates_with_coercion() {
        let series = worked_series();
        assert_eq!(
            boolean(eval_text("NOT C > 10", &series).unwrap()),
            vec![true, false, false]
        );
        assert_eq!(
            boolean(eval_text("NOT REF(C, 1)", &series).unwrap()),
            vec![true, false, false]
        );
        assert_eq!(eval_text("NOT 0", &series).unwrap(), Value::Scalar(1.0));
    }

    #[test]
    fn booleans_in_arithmetic_are_zero_one() {
        let series = worked_series();
        assert_eq!(
            numeric(eval_text("(C > 10) + (C > 11)", &series).unwrap()),
            vec![0.0, 1.0, 2.0]
        );
        assert_eq!(
            numeric(eval_text("-(C > 10)", &series).unwrap()),
            vec![-0.0, -1.0, -1.0]
        );
    }

    #[test]
    fn indicator_calls() {
        let series = worked_series();
        let ma = numeric(eval_text("MA(C, 2)", &series).unwrap());
        assert!(ma[0].is_nan());
        assert_relative_eq!(ma[1], 10.5);
        assert_relative_eq!(ma[2], 11.5);

        assert_eq!(
            numeric(eval_text("HHV(H, 2)", &series).unwrap()),
            vec![11.0, 12.0, 13.0]
        );
        assert_eq!(
            numeric(eval_text("LLV(L, 3)", &series).unwrap()),
            vec![9.0, 9.0, 9.0]
        );
        assert_eq!(numeric(eval_text("EMA(C, 1)", &series).unwrap()), vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn nested_calls_and_expressions_as_arguments() {
        let series = worked_series();
        let values = numeric(eval_text("REF(MA((H + L) / 2, 2), 1)", &series).unwrap());
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert_relative_eq!(values[2], 10.5);
    }

    #[test]
    fn boolean_series_argument_is_coerced() {
        let series = worked_series();
        assert_eq!(
            numeric(eval_text("MA(C > 10, 2)", &series).unwrap())[2],
            1.0
        );
    }

    #[test]
    fn scalar_series_argument_broadcasts() {
        let series = worked_series();
        assert_eq!(numeric(eval_text("HHV(5, 3)", &series).unwrap()), vec![5.0; 3]);
    }

    #[test]
    fn cross_worked_example() {
        let series = worked_series();
        assert_eq!(
            boolean(eval_text("CROSS(C, MA(C, 2))", &series).unwrap()),
            vec![false, false, false]
        );
        assert_eq!(
            boolean(eval_text("CROSS(C, 10.5)", &series).unwrap()),
            vec![false, true, false]
        );
    }

    #[test]
    fn unknown_function() {
        let err = eval_text("FOO(C, 5)", &worked_series()).unwrap_err();
        assert_eq!(
            err,
            FormulaError::UnknownFunction {
                name: "FOO".into(),
                position: 0
            }
        );
    }

    #[test]
    fn unknown_identifier() {
        let err = eval_text("C > X", &worked_series()).unwrap_err();
        assert_eq!(
            err,
            FormulaError::UnknownIdentifier {
                name: "X".into(),
                position: 4
            }
        );
    }

    #[test]
    fn unknown_function_reported_before_argument_errors() {
        let err = eval_text("FOO(X)", &worked_series()).unwrap_err();
        assert!(matches!(err, FormulaError::UnknownFunction { .. }));
    }

    #[test]
    fn argument_count_reported_before_argument_errors() {
        assert!(matches!(
            eval_text("MA(X)", &worked_series()),
            Err(FormulaError::ArgumentCount { function, found: 1, .. }) if function == "MA"
        ));
        assert!(matches!(
            eval_text("REF(C, 0, BAD)", &worked_series()),
            Err(FormulaError::ArgumentCount { found: 3, .. })
        ));
        // with the right count, the bad argument itself is reported
        assert!(matches!(
            eval_text("MA(X, 2)", &worked_series()),
            Err(FormulaError::UnknownIdentifier { .. })
        ));
    }

    #[test]
    fn argument_count() {
        let err = eval_text("MA(C)", &worked_series()).unwrap_err();
        assert_eq!(
            err,
            FormulaError::ArgumentCount {
                function: "MA".into(),
                expected: 2,
                found: 1,
                position: 0
            }
        );
        assert!(matches!(
            eval_text("C > CROSS(C, O, H)", &worked_series()),
            Err(FormulaError::ArgumentCount { found: 3, position: 4, .. })
        ));
    }

    #[test]
    fn window_argument_type() {
        let series = worked_series();
        for text in ["MA(C, C)", "REF(C, 0)", "HHV(C, 2.5)", "LLV(C, -1)", "EMA(C, C > 1)"] {
            assert!(
                matches!(
                    eval_text(text, &series),
                    Err(FormulaError::ArgumentType { argument: 2, .. })
                ),
                "{}",
                text
            );
        }
        match eval_text("MA(C, C)", &series).unwrap_err() {
            FormulaError::ArgumentType { found, .. } => assert_eq!(found, "a numeric series"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn window_may_be_a_constant_expression() {
        let series = worked_series();
        let ma = numeric(eval_text("MA(C, 1 + 1)", &series).unwrap());
        assert_relative_eq!(ma[2], 11.5);
    }

    #[test]
    fn empty_series_yields_empty_vectors() {
        let series = Series::default();
        assert_eq!(numeric(eval_text("MA(C, 5)", &series).unwrap()), Vec::<f64>::new());
        assert_eq!(boolean(eval_text("C > 1", &series).unwrap()), Vec::<bool>::new());
    }

    #[test]
    fn every_vector_has_series_length() {
        let series = worked_series();
        for text in [
            "C",
            "C + 1",
            "C > 1",
            "NOT C",
            "-C",
            "MA(C, 5)",
            "EMA(C, 5)",
            "REF(C, 9)",
            "HHV(C, 9)",
            "LLV(C, 9)",
            "CROSS(C, O)",
        ] {
            let len = match eval_text(text, &series).unwrap() {
                Value::Numeric(v) => v.len(),
                Value::Boolean(v) => v.len(),
                Value::Scalar(_) => panic!("{} should be a vector", text),
            };
            assert_eq!(len, series.len(), "{}", text);
        }
    }
}
