//! Interactive input: the equation text and the two axis ranges.

use anyhow::{bail, Context, Result};
use slopefield_core::{AxisRange, Function};
use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeInputError {
    #[error("min must be less than max (got {min}, {max})")]
    Order { min: f64, max: f64 },
    #[error("expected two finite numbers separated by a comma")]
    Format,
}

pub fn print_banner<W: Write>(output: &mut W) -> Result<()> {
    let rule = "=".repeat(60);
    let functions = Function::ALL
        .iter()
        .map(|func| func.name())
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(output, "Direction Field Generator")?;
    writeln!(output, "{rule}")?;
    writeln!(output, "Enter a differential equation in terms of x and y")?;
    writeln!(output, "\nExamples:")?;
    writeln!(output, "  - Linear: x - y")?;
    writeln!(output, "  - Nonlinear: x**2 + y**2")?;
    writeln!(output, "  - Trigonometric: sin(x) * cos(y)")?;
    writeln!(output, "  - Exponential: exp(-x) * y")?;
    writeln!(output, "  - Product: x*y")?;
    writeln!(output, "\nAvailable functions:")?;
    writeln!(output, "  {functions}")?;
    writeln!(output, "  Constants: pi, e")?;
    writeln!(output, "  Mathematical operators: +, -, *, /, **")?;
    writeln!(output, "{rule}")?;
    Ok(())
}

/// Reads one line, or `None` once the input is closed.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("Failed to read from standard input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

pub fn read_expression<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<String> {
    write!(output, "\nEnter your differential equation dy/dx = ")?;
    output.flush()?;
    match read_line(input)? {
        Some(line) => Ok(line.trim().to_string()),
        None => bail!("Input closed before an equation was entered"),
    }
}

/// Parses `min, max`. Blank input means "use the default" and yields `None`.
pub fn parse_range(text: &str) -> Result<Option<AxisRange>, RangeInputError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let parts: Vec<&str> = text.split(',').collect();
    let [min, max] = parts.as_slice() else {
        return Err(RangeInputError::Format);
    };
    let min: f64 = min.trim().parse().map_err(|_| RangeInputError::Format)?;
    let max: f64 = max.trim().parse().map_err(|_| RangeInputError::Format)?;
    if !min.is_finite() || !max.is_finite() {
        return Err(RangeInputError::Format);
    }
    if min >= max {
        return Err(RangeInputError::Order { min, max });
    }
    AxisRange::new(min, max)
        .map(Some)
        .map_err(|_| RangeInputError::Format)
}

/// Asks for the range of `axis` until the answer is valid or blank.
pub fn prompt_range<R: BufRead, W: Write>(
    axis: &str,
    input: &mut R,
    output: &mut W,
) -> Result<AxisRange> {
    let default = AxisRange::default();
    loop {
        write!(
            output,
            "Enter {axis} range (format: min, max) or press Enter for default {}, {}: ",
            default.min, default.max
        )?;
        output.flush()?;
        let Some(line) = read_line(input)? else {
            bail!("Input closed before a valid {axis} range was entered");
        };
        match parse_range(&line) {
            Ok(Some(range)) => return Ok(range),
            Ok(None) => return Ok(default),
            Err(RangeInputError::Order { .. }) => {
                writeln!(output, "Error: min must be less than max")?;
                writeln!(output, "Example: -10, 10")?;
            }
            Err(RangeInputError::Format) => {
                writeln!(output, "Invalid range format!")?;
                writeln!(output, "Example: -10, 10  or  0, 5")?;
            }
        }
        log::debug!("Rejected {axis} range input {line:?}");
    }
}
