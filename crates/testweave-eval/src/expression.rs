//! Deterministic evaluator for business-rule expressions.
//!
//! Grammar:
//! - condition: `f IS [NOT] NULL`, `f [NOT] IN (a, b)`, `f BETWEEN a AND b`
//!   or `operand op operand` with op in `= != <> > >= < <=`;
//! - conditions combine with `AND`/`OR` (AND binds tighter) and parentheses;
//! - operands are field names (dotted paths reach nested objects), numbers,
//!   single-quoted strings, `true`, `false`, `null`, or arithmetic over them
//!   with `*`/`/` binding tighter than `+`/`-`.
//!
//! `CONDITIONAL` rules take `IF <condition> THEN <condition>`, `CALCULATION`
//! rules a comparison such as `total = price * quantity`, `RELATIONSHIP` rules
//! `a REQUIRES b`, `a EXCLUDES b` or a condition.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use testweave_core::DataRecord;
use testweave_rules::RuleType;

/// Numbers closer than this compare equal.
pub const NUMERIC_TOLERANCE: f64 = 1e-6;

/// Result of evaluating a rule against a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    Failed,
    /// The expression is outside the supported grammar.
    Unsupported,
}

impl CheckOutcome {
    pub(crate) fn from_bool(pass: bool) -> Self {
        if pass {
            CheckOutcome::Passed
        } else {
            CheckOutcome::Failed
        }
    }
}

static IF_THEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^IF\s+(.+?)\s+THEN\s+(.+)$").ok());
static LINKED_FIELDS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^([A-Za-z_][\w.]*)\s+(REQUIRES|EXCLUDES)\s+([A-Za-z_][\w.]*)$").ok()
});
static NULL_CHECK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^([A-Za-z_][\w.]*)\s+IS\s+(NOT\s+)?NULL$").ok());
static IN_LIST: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^([A-Za-z_][\w.]*)\s+(NOT\s+)?IN\s*\((.*)\)$").ok());
static BETWEEN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^([A-Za-z_][\w.]*)\s+BETWEEN\s+(\S+)\s+AND\s+(\S+)$").ok()
});
static OPEN_BETWEEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\bBETWEEN\s+\S+$").ok());
static COMPARISON: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*(>=|<=|!=|<>|=|>|<)\s*(.+)$").ok());
static IDENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][\w.]*$").ok());

/// Evaluate an expression rule. Non-expression rule types pass.
pub fn evaluate_rule(rule_type: RuleType, expression: &str, record: &DataRecord) -> CheckOutcome {
    let expr = normalize_whitespace(expression);
    if !rule_type.is_expression() {
        return CheckOutcome::Passed;
    }
    if expr.is_empty() {
        return CheckOutcome::Unsupported;
    }
    match rule_type {
        RuleType::Conditional => evaluate_conditional(&expr, record),
        RuleType::Relationship => evaluate_relationship(&expr, record),
        _ => evaluate_condition(&expr, record),
    }
}

fn evaluate_conditional(expr: &str, record: &DataRecord) -> CheckOutcome {
    if let Some(caps) = captures(&IF_THEN, expr) {
        return match evaluate_condition(&caps[1], record) {
            CheckOutcome::Passed => evaluate_condition(&caps[2], record),
            CheckOutcome::Failed => CheckOutcome::Passed,
            CheckOutcome::Unsupported => CheckOutcome::Unsupported,
        };
    }
    evaluate_condition(expr, record)
}

fn evaluate_relationship(expr: &str, record: &DataRecord) -> CheckOutcome {
    if let Some(caps) = captures(&LINKED_FIELDS, expr) {
        let left = is_present(record, &caps[1]);
        let right = is_present(record, &caps[3]);
        let pass = if caps[2].eq_ignore_ascii_case("REQUIRES") {
            !left || right
        } else {
            !(left && right)
        };
        return CheckOutcome::from_bool(pass);
    }
    evaluate_condition(expr, record)
}

/// Evaluate a boolean condition against a record.
pub fn evaluate_condition(expression: &str, record: &DataRecord) -> CheckOutcome {
    let expr = strip_outer_parens(expression.trim());

    let alternatives = split_keyword(expr, "OR");
    if alternatives.len() > 1 {
        let mut outcome = CheckOutcome::Failed;
        for part in &alternatives {
            match evaluate_condition(part, record) {
                CheckOutcome::Passed => return CheckOutcome::Passed,
                CheckOutcome::Unsupported => outcome = CheckOutcome::Unsupported,
                CheckOutcome::Failed => {}
            }
        }
        return outcome;
    }

    let terms = split_and(expr);
    if terms.len() > 1 {
        let mut outcome = CheckOutcome::Passed;
        for part in &terms {
            match evaluate_condition(part, record) {
                CheckOutcome::Failed => return CheckOutcome::Failed,
                CheckOutcome::Unsupported => outcome = CheckOutcome::Unsupported,
                CheckOutcome::Passed => {}
            }
        }
        return outcome;
    }

    evaluate_atom(expr, record)
}

fn evaluate_atom(expr: &str, record: &DataRecord) -> CheckOutcome {
    if let Some(caps) = captures(&NULL_CHECK, expr) {
        let negated = caps.get(2).is_some();
        return CheckOutcome::from_bool(is_present(record, &caps[1]) == negated);
    }

    if let Some(caps) = captures(&IN_LIST, expr) {
        let negated = caps.get(2).is_some();
        let Some(value) = field_value(record, &caps[1]).filter(|value| !value.is_null()) else {
            return CheckOutcome::Failed;
        };
        let text = value_text(value);
        let found = caps[3].split(',').map(normalize_literal).any(|item| item == text);
        return CheckOutcome::from_bool(found != negated);
    }

    if let Some(caps) = captures(&BETWEEN, expr) {
        let Some(value) = field_value(record, &caps[1]).filter(|value| !value.is_null()) else {
            return CheckOutcome::Failed;
        };
        let bounds = (
            as_number(value),
            normalize_literal(&caps[2]).parse::<f64>().ok(),
            normalize_literal(&caps[3]).parse::<f64>().ok(),
        );
        return match bounds {
            (Some(num), Some(min), Some(max)) => CheckOutcome::from_bool(num >= min && num <= max),
            _ => CheckOutcome::Unsupported,
        };
    }

    if let Some(caps) = captures(&COMPARISON, expr) {
        let left = evaluate_operand(&caps[1], record);
        let right = evaluate_operand(&caps[3], record);
        return match (left, right) {
            (Some(left), Some(right)) => compare_values(&left, &caps[2], &right),
            _ => CheckOutcome::Unsupported,
        };
    }

    CheckOutcome::Unsupported
}

/// Split on a keyword outside quotes and parentheses.
fn split_keyword(expr: &str, keyword: &str) -> Vec<String> {
    let bytes = expr.as_bytes();
    let upper = expr.to_ascii_uppercase();
    let needle = format!(" {keyword} ");
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut start = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth -= 1,
            _ => {}
        }
        if !in_quote && depth == 0 && upper.as_bytes()[idx..].starts_with(needle.as_bytes()) {
            parts.push(expr[start..idx].trim().to_string());
            idx += needle.len();
            start = idx;
            continue;
        }
        idx += 1;
    }
    parts.push(expr[start..].trim().to_string());
    parts
}

// The AND inside `BETWEEN a AND b` is not a conjunction.
fn split_and(expr: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for part in split_keyword(expr, "AND") {
        match terms.last_mut() {
            Some(last) if is_match(&OPEN_BETWEEN, last) => {
                last.push_str(" AND ");
                last.push_str(&part);
            }
            _ => terms.push(part),
        }
    }
    terms
}

fn strip_outer_parens(mut expr: &str) -> &str {
    while expr.starts_with('(') && expr.ends_with(')') && parens_wrap_whole(expr) {
        expr = expr[1..expr.len() - 1].trim();
    }
    expr
}

fn parens_wrap_whole(expr: &str) -> bool {
    let mut depth = 0i32;
    let mut in_quote = false;
    for (idx, ch) in expr.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth -= 1;
                if depth == 0 && idx != expr.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Resolve an operand or arithmetic expression. `None` when outside the grammar;
/// `Some(Null)` when a referenced field is missing or a division is by zero.
fn evaluate_operand(text: &str, record: &DataRecord) -> Option<Value> {
    let (operands, operators) = split_arithmetic(text.trim())?;
    let values = operands
        .iter()
        .map(|operand| resolve_operand(operand, record))
        .collect::<Option<Vec<Value>>>()?;
    if operators.is_empty() {
        return values.into_iter().next();
    }

    let mut numbers = Vec::with_capacity(values.len());
    for value in &values {
        if value.is_null() {
            return Some(Value::Null);
        }
        numbers.push(as_number(value)?);
    }
    Some(compute(&numbers, &operators).map_or(Value::Null, Value::from))
}

fn split_arithmetic(text: &str) -> Option<(Vec<String>, Vec<char>)> {
    let mut operands = Vec::new();
    let mut operators = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    for ch in text.chars() {
        if in_quote {
            current.push(ch);
            in_quote = ch != '\'';
            continue;
        }
        match ch {
            '\'' => {
                in_quote = true;
                current.push(ch);
            }
            // A sign with no operand before it belongs to a number.
            '+' | '-' | '*' | '/' if !current.trim().is_empty() => {
                operands.push(current.trim().to_string());
                current.clear();
                operators.push(ch);
            }
            _ => current.push(ch),
        }
    }
    if in_quote || current.trim().is_empty() {
        return None;
    }
    operands.push(current.trim().to_string());
    Some((operands, operators))
}

fn compute(numbers: &[f64], operators: &[char]) -> Option<f64> {
    let (first, rest) = numbers.split_first()?;
    let mut terms = vec![*first];
    let mut additive = Vec::new();
    for (op, value) in operators.iter().zip(rest) {
        match op {
            '*' => *terms.last_mut()? *= value,
            '/' => {
                if *value == 0.0 {
                    return None;
                }
                *terms.last_mut()? /= value;
            }
            _ => {
                additive.push(*op);
                terms.push(*value);
            }
        }
    }
    let (first, rest) = terms.split_first()?;
    Some(
        additive
            .iter()
            .zip(rest)
            .fold(*first, |acc, (op, value)| if *op == '+' { acc + value } else { acc - value }),
    )
}

fn resolve_operand(token: &str, record: &DataRecord) -> Option<Value> {
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        return Some(Value::String(token[1..token.len() - 1].to_string()));
    }
    match token.to_ascii_lowercase().as_str() {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" => return Some(Value::Null),
        _ => {}
    }
    if let Ok(number) = token.parse::<f64>() {
        return Some(Value::from(number));
    }
    if is_match(&IDENT, token) {
        return Some(field_value(record, token).cloned().unwrap_or(Value::Null));
    }
    None
}

fn compare_values(left: &Value, op: &str, right: &Value) -> CheckOutcome {
    if left.is_null() || right.is_null() {
        return match op {
            "=" => CheckOutcome::from_bool(left.is_null() && right.is_null()),
            "!=" | "<>" => CheckOutcome::from_bool(left.is_null() != right.is_null()),
            _ => CheckOutcome::Failed,
        };
    }

    if let (Some(left), Some(right)) = (as_number(left), as_number(right)) {
        return compare_f64(left, right, op);
    }

    match (left, right) {
        (Value::String(left), Value::String(right)) => compare_ordering(left.cmp(right), op),
        _ => {
            let equal = value_text(left) == value_text(right);
            match op {
                "=" => CheckOutcome::from_bool(equal),
                "!=" | "<>" => CheckOutcome::from_bool(!equal),
                _ => CheckOutcome::Unsupported,
            }
        }
    }
}

fn compare_f64(left: f64, right: f64, op: &str) -> CheckOutcome {
    let equal = (left - right).abs() <= NUMERIC_TOLERANCE;
    let pass = match op {
        "=" => equal,
        "!=" | "<>" => !equal,
        ">" => left > right && !equal,
        ">=" => left > right || equal,
        "<" => left < right && !equal,
        "<=" => left < right || equal,
        _ => false,
    };
    CheckOutcome::from_bool(pass)
}

fn compare_ordering(ordering: Ordering, op: &str) -> CheckOutcome {
    let pass = match op {
        "=" => ordering == Ordering::Equal,
        "!=" | "<>" => ordering != Ordering::Equal,
        ">" => ordering == Ordering::Greater,
        ">=" => ordering != Ordering::Less,
        "<" => ordering == Ordering::Less,
        "<=" => ordering != Ordering::Greater,
        _ => false,
    };
    CheckOutcome::from_bool(pass)
}

/// Field lookup; a dotted path descends into nested objects.
pub(crate) fn field_value<'a>(record: &'a DataRecord, path: &str) -> Option<&'a Value> {
    if let Some(value) = record.get(path) {
        return Some(value);
    }
    let mut parts = path.split('.');
    let mut current = record.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

pub(crate) fn is_present(record: &DataRecord, path: &str) -> bool {
    field_value(record, path).is_some_and(|value| !value.is_null())
}

/// Numeric view of a value; numeric strings count.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn normalize_literal(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('\'') && trimmed.ends_with('\''))
            || (trimmed.starts_with('"') && trimmed.ends_with('"')))
    {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

fn normalize_whitespace(expr: &str) -> String {
    expr.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn captures<'t>(pattern: &LazyLock<Option<Regex>>, text: &'t str) -> Option<Captures<'t>> {
    let pattern: &Option<Regex> = pattern;
    pattern.as_ref()?.captures(text)
}

pub(crate) fn is_match(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
    let pattern: &Option<Regex> = pattern;
    pattern.as_ref().is_some_and(|regex| regex.is_match(text))
}
