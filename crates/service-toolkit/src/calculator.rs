//! Floating point arithmetic with an explicit division error.

use thiserror::Error;

#[cfg(test)]
#[path = "calculator_tests.rs"]
mod tests;

/// Errors from arithmetic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CalculatorError {
    #[error("Cannot divide by zero")]
    DivideByZero,
}

pub fn add(a: f64, b: f64) -> f64 {
    a + b
}

pub fn subtract(a: f64, b: f64) -> f64 {
    a - b
}

pub fn multiply(a: f64, b: f64) -> f64 {
    a * b
}

/// Divide `a` by `b`.
///
/// Fails with [`CalculatorError::DivideByZero`] when `b` is zero (either
/// sign) rather than returning an infinity or NaN.
pub fn divide(a: f64, b: f64) -> Result<f64, CalculatorError> {
    if b == 0.0 {
        return Err(CalculatorError::DivideByZero);
    }

    Ok(a / b)
}
