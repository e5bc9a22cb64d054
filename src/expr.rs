//! Restricted transform expressions for `eval(...)` mapping rules.
//!
//! Expressions run in an `evalexpr` context with the raw cell text bound as
//! `value` and a curated set of string helpers registered. That is the whole
//! scope: no record store access, no I/O, no user-defined code. The original
//! design evaluated arbitrary code here; this mini-language is the sanctioned
//! replacement.

use anyhow::{Context, Result};
use evalexpr::{
    ContextWithMutableFunctions, ContextWithMutableVariables, Function, HashMapContext,
    Value as EvalValue, eval_with_context,
};
use regex::Regex;

use crate::transform::string_ops;

fn register_string_functions(context: &mut HashMapContext) -> Result<()> {
    context
        .set_function(
            "lowercase".into(),
            Function::new(|arguments| {
                let args = expect_args(arguments, 1, "lowercase")?;
                let value = expect_string(&args[0], "value")?;
                Ok(EvalValue::String(string_ops::lowercase(value).into_owned()))
            }),
        )
        .map_err(anyhow::Error::from)?;

    context
        .set_function(
            "uppercase".into(),
            Function::new(|arguments| {
                let args = expect_args(arguments, 1, "uppercase")?;
                let value = expect_string(&args[0], "value")?;
                Ok(EvalValue::String(string_ops::uppercase(value).into_owned()))
            }),
        )
        .map_err(anyhow::Error::from)?;

    context
        .set_function(
            "trim".into(),
            Function::new(|arguments| {
                let args = expect_args(arguments, 1, "trim")?;
                let value = expect_string(&args[0], "value")?;
                Ok(EvalValue::String(string_ops::trim(value).into_owned()))
            }),
        )
        .map_err(anyhow::Error::from)?;

    context
        .set_function(
            "snake_case".into(),
            Function::new(|arguments| {
                let args = expect_args(arguments, 1, "snake_case")?;
                let value = expect_string(&args[0], "value")?;
                Ok(EvalValue::String(
                    string_ops::snake_case(value).into_owned(),
                ))
            }),
        )
        .map_err(anyhow::Error::from)?;

    context
        .set_function(
            "substring".into(),
            Function::new(|arguments| {
                let args = expect_args(arguments, 3, "substring")?;
                let value = expect_string(&args[0], "value")?;
                let start = parse_i64_arg(&args[1], "start")?.max(0) as usize;
                let length = parse_i64_arg(&args[2], "length")?;
                if length <= 0 {
                    return Ok(EvalValue::String(String::new()));
                }
                let result = string_ops::substring(value, start, length as usize);
                Ok(EvalValue::String(result.into_owned()))
            }),
        )
        .map_err(anyhow::Error::from)?;

    context
        .set_function(
            "replace".into(),
            Function::new(|arguments| {
                let args = expect_args(arguments, 3, "replace")?;
                let value = expect_string(&args[0], "value")?;
                let needle = expect_string(&args[1], "needle")?;
                let replacement = expect_string(&args[2], "replacement")?;
                Ok(EvalValue::String(
                    string_ops::replace(value, needle, replacement).into_owned(),
                ))
            }),
        )
        .map_err(anyhow::Error::from)?;

    context
        .set_function(
            "regex_replace".into(),
            Function::new(|arguments| {
                let args = expect_args(arguments, 3, "regex_replace")?;
                let value = expect_string(&args[0], "value")?;
                let pattern = expect_string(&args[1], "pattern")?;
                let replacement = expect_string(&args[2], "replacement")?;
                let regex = Regex::new(pattern)
                    .map_err(|err| eval_error(&format!("Invalid regex: {err}")))?;
                let replaced = string_ops::regex_replace(value, &regex, replacement);
                Ok(EvalValue::String(replaced.into_owned()))
            }),
        )
        .map_err(anyhow::Error::from)?;

    Ok(())
}

fn expect_args(
    arguments: &EvalValue,
    expected: usize,
    name: &str,
) -> Result<Vec<EvalValue>, evalexpr::EvalexprError> {
    match arguments {
        EvalValue::Empty if expected == 0 => Ok(Vec::new()),
        value if expected == 1 && !matches!(value, EvalValue::Tuple(_)) => Ok(vec![value.clone()]),
        EvalValue::Tuple(values) => {
            if values.len() != expected {
                return Err(evalexpr::EvalexprError::wrong_function_argument_amount(
                    values.len(),
                    expected,
                ));
            }
            Ok(values.clone())
        }
        _ => Err(eval_error(&format!(
            "{name} expects {expected} arguments provided as a tuple"
        ))),
    }
}

fn eval_error(message: &str) -> evalexpr::EvalexprError {
    evalexpr::EvalexprError::CustomMessage(message.to_string())
}

fn parse_i64_arg(value: &EvalValue, name: &str) -> Result<i64, evalexpr::EvalexprError> {
    match value {
        EvalValue::Int(i) => Ok(*i),
        EvalValue::Float(f) => Ok(*f as i64),
        other => Err(eval_error(&format!(
            "Expected integer for {name}, got {other:?}",
        ))),
    }
}

fn expect_string<'a>(value: &'a EvalValue, name: &str) -> Result<&'a str, evalexpr::EvalexprError> {
    if let EvalValue::String(s) = value {
        Ok(s)
    } else {
        Err(eval_error(&format!("Expected string for {name}")))
    }
}

/// Evaluates a transform expression against one raw cell and stringifies the
/// result; downstream the text goes through the same typed parse as a
/// pass-through column.
pub fn evaluate_transform(expression: &str, raw: &str) -> Result<String> {
    let mut context = HashMapContext::new();
    register_string_functions(&mut context)?;
    context
        .set_value("value".into(), EvalValue::String(raw.to_string()))
        .context("Binding cell value")?;

    let result = eval_with_context(expression, &context)
        .with_context(|| format!("Evaluating expression '{expression}'"))?;
    Ok(match result {
        EvalValue::String(s) => s,
        EvalValue::Int(i) => i.to_string(),
        EvalValue::Float(f) => f.to_string(),
        EvalValue::Boolean(b) => b.to_string(),
        EvalValue::Tuple(values) => values
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("|"),
        EvalValue::Empty => String::new(),
    })
}
