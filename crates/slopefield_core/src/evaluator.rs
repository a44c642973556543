use crate::expression::{parse, Expr, ExpressionError, Variable};
use crate::grid::Grid;
use log::{debug, warn};
use nalgebra::DMatrix;

/// Slopes dy/dx sampled on a [`Grid`], one value per cell.
///
/// Cells may hold NaN or an infinity where the right-hand side is singular.
#[derive(Debug, Clone, PartialEq)]
pub struct SlopeField {
    values: DMatrix<f64>,
}

impl SlopeField {
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get((row, col)).copied()
    }

    /// Smallest and largest finite slope, or `None` if no cell is finite.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn non_finite_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_finite()).count()
    }

    pub fn into_values(self) -> DMatrix<f64> {
        self.values
    }
}

/// Intermediate result while walking the tree: either a single number or one value per cell.
#[derive(Debug, Clone)]
enum Value {
    Scalar(f64),
    Matrix(DMatrix<f64>),
}

impl Value {
    fn map(self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(v) => Value::Scalar(f(v)),
            Value::Matrix(mut m) => {
                m.apply(|v| *v = f(*v));
                Value::Matrix(m)
            }
        }
    }

    fn combine(self, other: Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, ExpressionError> {
        let combined = match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(f(a, b)),
            (Value::Scalar(a), Value::Matrix(mut m)) => {
                m.apply(|v| *v = f(a, *v));
                Value::Matrix(m)
            }
            (Value::Matrix(mut m), Value::Scalar(b)) => {
                m.apply(|v| *v = f(*v, b));
                Value::Matrix(m)
            }
            (Value::Matrix(a), Value::Matrix(b)) => {
                if a.shape() != b.shape() {
                    return Err(ExpressionError::Evaluation(format!(
                        "operands have different shapes {:?} and {:?}",
                        a.shape(),
                        b.shape()
                    )));
                }
                Value::Matrix(a.zip_map(&b, f))
            }
        };
        Ok(combined)
    }

    fn broadcast(self, shape: (usize, usize)) -> Result<DMatrix<f64>, ExpressionError> {
        match self {
            Value::Scalar(v) => Ok(DMatrix::from_element(shape.0, shape.1, v)),
            Value::Matrix(m) if m.shape() == shape => Ok(m),
            Value::Matrix(m) => Err(ExpressionError::Evaluation(format!(
                "result shape {:?} does not match grid shape {:?}",
                m.shape(),
                shape
            ))),
        }
    }
}

/// Parses `expression` and evaluates it on every cell of `grid`.
///
/// Any parse or evaluation problem fails the whole field; there is no partial result.
/// Numeric singularities are not failures and show up as NaN or infinite cells.
pub fn evaluate(expression: &str, grid: &Grid) -> Result<SlopeField, ExpressionError> {
    let result = parse(expression).and_then(|expr| evaluate_expr(&expr, grid));
    if let Err(err) = &result {
        warn!("Error evaluating function {expression:?}: {err}");
    }
    result
}

/// Evaluates an already parsed expression on every cell of `grid`.
pub fn evaluate_expr(expr: &Expr, grid: &Grid) -> Result<SlopeField, ExpressionError> {
    let shape = grid.shape();
    let values = evaluate_node(expr, grid)?.broadcast(shape)?;
    let field = SlopeField { values };

    debug!(
        "Evaluated {expr} on a {}x{} grid{}",
        shape.0,
        shape.1,
        if expr.is_constant() { " (constant)" } else { "" }
    );
    let anomalies = field.non_finite_count();
    if anomalies > 0 {
        warn!("{anomalies} cell(s) have an undefined or infinite slope");
    }
    Ok(field)
}

fn evaluate_node(expr: &Expr, grid: &Grid) -> Result<Value, ExpressionError> {
    let value = match expr {
        Expr::Number(n) => Value::Scalar(*n),
        Expr::Constant(c) => Value::Scalar(c.value()),
        Expr::Variable(Variable::X) => Value::Matrix(grid.x().clone()),
        Expr::Variable(Variable::Y) => Value::Matrix(grid.y().clone()),
        Expr::Unary(op, operand) => evaluate_node(operand, grid)?.map(|v| op.apply(v)),
        Expr::Binary(left, op, right) => {
            let a = evaluate_node(left, grid)?;
            let b = evaluate_node(right, grid)?;
            a.combine(b, |a, b| op.apply(a, b))?
        }
        Expr::Call(func, arg) => evaluate_node(arg, grid)?.map(|v| func.apply(v)),
    };
    Ok(value)
}
