use std::collections::HashMap;

use quant_core::CoreError;
use serde::{Deserialize, Serialize};

/// A single strategy parameter value. Untagged so config files can write
/// plain JSON numbers/strings/booleans without a wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Integer(i64),
    Text(String),
    Boolean(bool),
}

pub type ParamMap = HashMap<String, ParamValue>;

fn missing(name: &str) -> CoreError {
    CoreError::ConfigError(format!("missing parameter '{name}'"))
}

fn wrong_type(name: &str, expected: &str) -> CoreError {
    CoreError::ConfigError(format!("parameter '{name}' is not a {expected}"))
}

pub fn get_f64(params: &ParamMap, name: &str) -> Result<f64, CoreError> {
    match params.get(name) {
        Some(ParamValue::Number(n)) => Ok(*n),
        Some(ParamValue::Integer(n)) => Ok(*n as f64),
        Some(_) => Err(wrong_type(name, "number")),
        None => Err(missing(name)),
    }
}

pub fn get_usize(params: &ParamMap, name: &str) -> Result<usize, CoreError> {
    match params.get(name) {
        Some(ParamValue::Integer(n)) if *n >= 0 => Ok(*n as usize),
        Some(ParamValue::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
        Some(_) => Err(wrong_type(name, "non-negative integer")),
        None => Err(missing(name)),
    }
}

pub fn get_string(params: &ParamMap, name: &str) -> Result<String, CoreError> {
    match params.get(name) {
        Some(ParamValue::Text(s)) => Ok(s.clone()),
        Some(_) => Err(wrong_type(name, "string")),
        None => Err(missing(name)),
    }
}

pub fn get_f64_or(params: &ParamMap, name: &str, default: f64) -> Result<f64, CoreError> {
    if params.contains_key(name) {
        get_f64(params, name)
    } else {
        Ok(default)
    }
}

pub fn get_usize_or(params: &ParamMap, name: &str, default: usize) -> Result<usize, CoreError> {
    if params.contains_key(name) {
        get_usize(params, name)
    } else {
        Ok(default)
    }
}
