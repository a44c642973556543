/// The `slopefield_core` crate computes direction fields for first-order equations
/// `dy/dx = f(x, y)` where `f` is typed in by a user.
///
/// Key components:
/// - **Grid**: evenly spaced sample points over the requested x and y ranges.
/// - **Expression**: a recursive-descent parser whose vocabulary is a fixed whitelist
///   of variables, constants and functions.
/// - **Evaluator**: walks the parsed tree over whole grids at once.
/// - **Direction**: turns slopes into fixed-length arrows, keeping singular cells well defined.
pub mod direction;
pub mod evaluator;
pub mod expression;
pub mod grid;
pub mod traits;

pub use direction::{Arrow, DirectionField, FieldConfig, DEFAULT_ARROW_LENGTH};
pub use evaluator::{evaluate, evaluate_expr, SlopeField};
pub use expression::{parse, Expr, ExpressionError, Function};
pub use grid::{AxisRange, Grid, DEFAULT_SAMPLES};
