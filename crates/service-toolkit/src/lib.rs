//! # Service Toolkit
//!
//! Helpers used alongside the queue client:
//!
//! - [`calculator`]: checked floating point arithmetic
//! - [`json_list`]: loading a JSON array file into a typed `Vec`

pub mod calculator;
pub mod json_list;

pub use calculator::{add, divide, multiply, subtract, CalculatorError};
pub use json_list::{deserialize_list, JsonListError, JsonListReader};
