use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use slopefield_core::{evaluate, FieldConfig, Grid};

mod prompt;
mod render;

use render::{PlotRequest, RenderConfig};

/// Plots the direction field of dy/dx = f(x, y)
///
/// The equation and axis ranges are asked for interactively.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Name of a `.png` file to write
    #[clap(short, long, default_value = "direction_field.png")]
    output: PathBuf,

    /// Arrows per axis
    #[clap(short = 'n', long, default_value_t = FieldConfig::default().samples)]
    samples: usize,

    /// Normalized arrow length
    #[clap(long, default_value_t = FieldConfig::default().arrow_length)]
    arrow_length: f64,

    /// Image width in pixels
    #[clap(long, default_value_t = RenderConfig::default().width)]
    width: u32,

    /// Image height in pixels
    #[clap(long, default_value_t = RenderConfig::default().height)]
    height: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if !args.arrow_length.is_finite() || args.arrow_length <= 0.0 {
        bail!("--arrow-length must be a positive number");
    }
    if args.width == 0 || args.height == 0 {
        bail!("Image dimensions must be positive");
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout().lock();

    prompt::print_banner(&mut output)?;
    let expression = prompt::read_expression(&mut input, &mut output)?;
    let x_range = prompt::prompt_range("x", &mut input, &mut output)?;
    let y_range = prompt::prompt_range("y", &mut input, &mut output)?;

    let grid = Grid::square(x_range, y_range, args.samples)?;

    let start = Instant::now();
    let outcome = evaluate(&expression, &grid);
    match &outcome {
        Ok(slopes) => info!(
            "Evaluated {} slopes in {:?}",
            slopes.values().len(),
            start.elapsed()
        ),
        Err(err) => {
            writeln!(output, "Error evaluating function: {err}")?;
            output.flush()?;
        }
    }

    let config = RenderConfig {
        width: args.width,
        height: args.height,
        ..RenderConfig::default()
    };
    let request = PlotRequest {
        expression: &expression,
        grid: &grid,
        arrow_length: args.arrow_length,
    };
    info!("Writing image to {:?}", args.output);
    render::render_png(&args.output, &request, outcome.as_ref(), &config)?;
    Ok(())
}
