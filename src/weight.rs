// src/weight.rs

use crate::error::{Error, Result};

/// Maps `x` from `[min_input, max_input]` onto `[min_output, max_output]`.
///
/// Values outside the input range are rejected rather than clamped. The
/// bounds are matched exactly (min first) so a degenerate range where
/// `min_input == max_input` resolves to `min_output` without dividing by zero.
pub fn transform(x: f64, min_input: f64, max_input: f64, min_output: f64, max_output: f64) -> Result<f64> {
    if x < min_input || x > max_input {
        return Err(Error::Range { value: x, min: min_input, max: max_input });
    }
    if x == min_input {
        Ok(min_output)
    } else if x == max_input {
        Ok(max_output)
    } else {
        Ok((x - min_input) * (max_output - min_output) / (max_input - min_input) + min_output)
    }
}
