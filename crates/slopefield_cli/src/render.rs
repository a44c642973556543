use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use slopefield_core::{Arrow, DirectionField, ExpressionError, Grid, SlopeField};
use std::path::Path;

const COLORBAR_WIDTH: u32 = 130;
const COLORBAR_STEPS: usize = 128;
/// Arrowhead stroke length as a fraction of the shaft.
const HEAD_FRACTION: f64 = 0.3;
const HEAD_ANGLE: f64 = 25.0 * std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Grid cells covered by an arrow of unit normalized length.
    pub arrow_scale: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 800,
            arrow_scale: 2.5,
        }
    }
}

/// What to draw: the equation as typed, where it was sampled, and the arrow length.
pub struct PlotRequest<'a> {
    pub expression: &'a str,
    pub grid: &'a Grid,
    pub arrow_length: f64,
}

impl PlotRequest<'_> {
    fn title(&self) -> String {
        format!("Direction Field for dy/dx = {}", self.expression)
    }
}

/// Maps raw slopes onto the viridis gradient.
pub struct SlopeColorScale {
    gradient: Box<dyn colorgrad::Gradient>,
    min: f64,
    max: f64,
}

impl SlopeColorScale {
    /// `range` is the finite slope range of the field, if any cell is finite.
    pub fn new(range: Option<(f64, f64)>) -> Self {
        let (min, max) = range.unwrap_or((-1.0, 1.0));
        Self {
            gradient: Box::new(colorgrad::preset::viridis()),
            min,
            max,
        }
    }

    /// Bounds for the colorbar axis; a constant field gets a unit-wide band around its value.
    pub fn axis_bounds(&self) -> (f64, f64) {
        if self.max > self.min {
            (self.min, self.max)
        } else {
            (self.min - 0.5, self.max + 0.5)
        }
    }

    /// Position of `slope` on the scale in `[0, 1]`. Infinities clamp to the ends.
    pub fn position(&self, slope: f64) -> f64 {
        if slope.is_nan() {
            return 0.5;
        }
        let normalized = if self.max > self.min {
            (slope - self.min) / (self.max - self.min)
        } else if slope > self.max {
            1.0
        } else if slope < self.min {
            0.0
        } else {
            0.5
        };
        normalized.clamp(0.0, 1.0)
    }

    pub fn color(&self, slope: f64) -> RGBColor {
        let rgba = self.gradient.at(self.position(slope) as f32).to_rgba8();
        RGBColor(rgba[0], rgba[1], rgba[2])
    }
}

/// Line strokes for one arrow in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowGeometry {
    pub shaft: [(f64, f64); 2],
    pub head_left: [(f64, f64); 2],
    pub head_right: [(f64, f64); 2],
}

impl ArrowGeometry {
    pub fn strokes(&self) -> [[(f64, f64); 2]; 3] {
        [self.shaft, self.head_left, self.head_right]
    }
}

/// Places an arrow with its tail on the grid point, stretched by `scale` data units
/// per unit of normalized length.
pub fn arrow_geometry(arrow: &Arrow, scale: f64) -> ArrowGeometry {
    let tail = (arrow.x, arrow.y);
    let (vx, vy) = (arrow.dx * scale, arrow.dy * scale);
    let tip = (tail.0 + vx, tail.1 + vy);
    let length = vx.hypot(vy);
    if length == 0.0 || !length.is_finite() {
        return ArrowGeometry {
            shaft: [tail, tail],
            head_left: [tail, tail],
            head_right: [tail, tail],
        };
    }

    let head = length * HEAD_FRACTION;
    let (bx, by) = (-vx / length, -vy / length);
    let (sin, cos) = HEAD_ANGLE.sin_cos();
    let left = (bx * cos - by * sin, bx * sin + by * cos);
    let right = (bx * cos + by * sin, -bx * sin + by * cos);

    ArrowGeometry {
        shaft: [tail, tip],
        head_left: [tip, (tip.0 + left.0 * head, tip.1 + left.1 * head)],
        head_right: [tip, (tip.0 + right.0 * head, tip.1 + right.1 * head)],
    }
}

/// Draws either the direction field or, for a failed expression, the error placeholder.
pub fn render<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    request: &PlotRequest,
    outcome: Result<&SlopeField, &ExpressionError>,
    config: &RenderConfig,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    match outcome {
        Ok(slopes) => draw_field(root, request, slopes, config),
        Err(err) => draw_invalid(root, request, err),
    }
}

/// Renders to a PNG file at `path`.
pub fn render_png(
    path: &Path,
    request: &PlotRequest,
    outcome: Result<&SlopeField, &ExpressionError>,
    config: &RenderConfig,
) -> Result<()> {
    let root = BitMapBackend::new(path, (config.width, config.height)).into_drawing_area();
    render(&root, request, outcome, config)?;
    root.present()
        .with_context(|| format!("Failed to write plot to {}", path.display()))?;
    Ok(())
}

fn draw_invalid<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    request: &PlotRequest,
    err: &ExpressionError,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let x_range = request.grid.x_range();
    let y_range = request.grid.y_range();
    let mut chart = ChartBuilder::on(root)
        .caption(request.title(), ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range.min..x_range.max, y_range.min..y_range.max)?;
    chart
        .configure_mesh()
        .x_desc("x")
        .y_desc("y")
        .light_line_style(BLACK.mix(0.04))
        .draw()?;

    let center = (
        (x_range.min + x_range.max) / 2.0,
        (y_range.min + y_range.max) / 2.0,
    );
    let below = (center.0, center.1 - y_range.span() * 0.08);
    let anchor = Pos::new(HPos::Center, VPos::Center);
    chart.draw_series([
        Text::new(
            "Invalid function!".to_string(),
            center,
            ("sans-serif", 32).into_font().color(&RED).pos(anchor),
        ),
        Text::new(
            err.to_string(),
            below,
            ("sans-serif", 16).into_font().color(&BLACK).pos(anchor),
        ),
    ])?;
    Ok(())
}

fn draw_field<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    request: &PlotRequest,
    slopes: &SlopeField,
    config: &RenderConfig,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let grid = request.grid;
    let x_range = grid.x_range();
    let y_range = grid.y_range();
    let field = DirectionField::from_slopes(slopes, request.arrow_length);
    let scale = SlopeColorScale::new(slopes.finite_range());

    let (width, _) = root.dim_in_pixel();
    let (plot_area, bar_area) = root.split_horizontally(width.saturating_sub(COLORBAR_WIDTH));

    let mut chart = ChartBuilder::on(&plot_area)
        .caption(request.title(), ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range.min..x_range.max, y_range.min..y_range.max)?;
    chart
        .configure_mesh()
        .x_desc("x")
        .y_desc("y")
        .bold_line_style(BLACK.mix(0.12))
        .light_line_style(BLACK.mix(0.04))
        .draw()?;

    // Axes through the origin.
    let axis_style = BLACK.mix(0.6).stroke_width(1);
    if x_range.contains(0.0) {
        chart.draw_series(LineSeries::new(
            [(0.0, y_range.min), (0.0, y_range.max)],
            axis_style,
        ))?;
    }
    if y_range.contains(0.0) {
        chart.draw_series(LineSeries::new(
            [(x_range.min, 0.0), (x_range.max, 0.0)],
            axis_style,
        ))?;
    }

    let (cell_x, cell_y) = grid.cell_size();
    let data_scale = config.arrow_scale * cell_x.min(cell_y);
    chart.draw_series(field.arrows(grid).flat_map(|arrow| {
        let style = scale.color(arrow.slope).mix(0.8).stroke_width(2);
        arrow_geometry(&arrow, data_scale)
            .strokes()
            .into_iter()
            .map(move |stroke| PathElement::new(stroke.to_vec(), style))
    }))?;

    if field.gap_count() > 0 {
        log::info!("{} cell(s) left blank where the slope is undefined", field.gap_count());
    }

    draw_colorbar(&bar_area, &scale)
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    scale: &SlopeColorScale,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (lo, hi) = scale.axis_bounds();
    let mut bar = ChartBuilder::on(area)
        .margin_top(60)
        .margin_bottom(60)
        .margin_right(10)
        .x_label_area_size(0)
        .y_label_area_size(90)
        .build_cartesian_2d(0.0..1.0, lo..hi)?;
    bar.configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(0)
        .y_desc("Slope (dy/dx)")
        .draw()?;

    let step = (hi - lo) / COLORBAR_STEPS as f64;
    bar.draw_series((0..COLORBAR_STEPS).map(|i| {
        let y0 = lo + step * i as f64;
        let y1 = y0 + step;
        Rectangle::new(
            [(0.0, y0), (1.0, y1)],
            scale.color((y0 + y1) / 2.0).filled(),
        )
    }))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{arrow_geometry, render, PlotRequest, RenderConfig, SlopeColorScale};
    use approx::assert_relative_eq;
    use plotters::prelude::*;
    use slopefield_core::{evaluate, Arrow, AxisRange, DirectionField, Grid, DEFAULT_ARROW_LENGTH};

    const WIDTH: u32 = 640;
    const HEIGHT: u32 = 480;

    fn render_to_buffer(expression: &str, grid: &Grid) -> anyhow::Result<Vec<u8>> {
        let outcome = evaluate(expression, grid);
        let request = PlotRequest {
            expression,
            grid,
            arrow_length: DEFAULT_ARROW_LENGTH,
        };
        let config = RenderConfig {
            width: WIDTH,
            height: HEIGHT,
            ..RenderConfig::default()
        };
        let mut buffer = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT)).into_drawing_area();
            render(&root, &request, outcome.as_ref(), &config)?;
            root.present()?;
        }
        Ok(buffer)
    }

    fn default_grid(samples: usize) -> Grid {
        Grid::square(AxisRange::default(), AxisRange::default(), samples)
            .expect("grid should build")
    }

    fn arrow(dx: f64, dy: f64) -> Arrow {
        Arrow {
            row: 0,
            col: 0,
            x: 1.0,
            y: -1.0,
            dx,
            dy,
            slope: dy / dx,
        }
    }

    #[test]
    fn horizontal_arrow_points_right_with_symmetric_head() {
        let geometry = arrow_geometry(&arrow(0.3, 0.0), 2.0);
        assert_eq!(geometry.shaft[0], (1.0, -1.0));
        assert_relative_eq!(geometry.shaft[1].0, 1.6, epsilon = 1e-12);
        assert_relative_eq!(geometry.shaft[1].1, -1.0, epsilon = 1e-12);

        let left = geometry.head_left[1];
        let right = geometry.head_right[1];
        assert!(left.0 < 1.6 && right.0 < 1.6, "head should trail the tip");
        assert_relative_eq!(left.0, right.0, epsilon = 1e-12);
        assert_relative_eq!(left.1 + 1.0, -(right.1 + 1.0), epsilon = 1e-12);
        let head_length = (left.0 - 1.6).hypot(left.1 + 1.0);
        assert_relative_eq!(head_length, 0.6 * 0.3, epsilon = 1e-12);
    }

    #[test]
    fn vertical_arrow_points_up() {
        let geometry = arrow_geometry(&arrow(0.0, 0.3), 1.0);
        assert_relative_eq!(geometry.shaft[1].0, 1.0, epsilon = 1e-12);
        assert_relative_eq!(geometry.shaft[1].1, -0.7, epsilon = 1e-12);
        assert!(geometry.head_left[1].1 < -0.7);
    }

    #[test]
    fn degenerate_arrow_collapses_to_its_tail() {
        let geometry = arrow_geometry(&arrow(0.0, 0.0), 1.0);
        for stroke in geometry.strokes() {
            assert_eq!(stroke, [(1.0, -1.0), (1.0, -1.0)]);
        }
    }

    #[test]
    fn singular_field_geometry_is_finite() {
        let grid = Grid::square(AxisRange::default(), AxisRange::default(), 21)
            .expect("grid should build");
        let slopes = evaluate("1/x + log(y)", &grid).expect("evaluate");
        let field = DirectionField::from_slopes(&slopes, 0.3);
        let (cell_x, cell_y) = grid.cell_size();
        let scale = RenderConfig::default().arrow_scale * cell_x.min(cell_y);
        let mut drawn = 0;
        for arrow in field.arrows(&grid) {
            for stroke in arrow_geometry(&arrow, scale).strokes() {
                for (px, py) in stroke {
                    assert!(px.is_finite() && py.is_finite());
                }
            }
            drawn += 1;
        }
        assert!(drawn > 0 && drawn < 21 * 21);
    }

    #[test]
    fn color_scale_orders_and_clamps_slopes() {
        let scale = SlopeColorScale::new(Some((-2.0, 2.0)));
        assert_relative_eq!(scale.position(-2.0), 0.0);
        assert_relative_eq!(scale.position(0.0), 0.5);
        assert_relative_eq!(scale.position(2.0), 1.0);
        assert_relative_eq!(scale.position(f64::INFINITY), 1.0);
        assert_relative_eq!(scale.position(f64::NEG_INFINITY), 0.0);
        assert_relative_eq!(scale.position(f64::NAN), 0.5);
        assert_ne!(scale.color(-2.0), scale.color(2.0));
    }

    #[test]
    fn constant_field_gets_a_padded_colorbar() {
        let scale = SlopeColorScale::new(Some((2.0, 2.0)));
        assert_eq!(scale.axis_bounds(), (1.5, 2.5));
        assert_relative_eq!(scale.position(2.0), 0.5);

        let empty = SlopeColorScale::new(None);
        assert_eq!(empty.axis_bounds(), (-1.0, 1.0));
    }

    #[test]
    fn render_draws_regular_singular_and_constant_fields() {
        for (expression, samples) in [("x*y", 20), ("1/x", 21), ("2", 20), ("1e16", 20)] {
            let buffer = render_to_buffer(expression, &default_grid(samples))
                .unwrap_or_else(|err| panic!("rendering {expression} failed: {err}"));
            assert!(
                buffer.iter().any(|&b| b != 255),
                "expected something drawn for {expression}"
            );
        }
    }

    #[test]
    fn render_handles_extreme_and_undefined_slopes() {
        let grid = default_grid(20);
        render_to_buffer("1e308 * x / 5", &grid).expect("huge slopes should render");
        render_to_buffer("sqrt(-1 - abs(x))", &grid).expect("all-gap field should render");
    }

    #[test]
    fn render_draws_placeholder_for_invalid_function() {
        let x_range = AxisRange::new(0.0, 3.0).expect("range");
        let y_range = AxisRange::new(-10.0, -2.0).expect("range");
        let grid = Grid::square(x_range, y_range, 20).expect("grid should build");
        assert!(evaluate("os.system('x')", &grid).is_err());
        let buffer = render_to_buffer("os.system('x')", &grid)
            .expect("an invalid function still produces a plot");
        assert!(buffer.iter().any(|&b| b != 255));
    }
}
