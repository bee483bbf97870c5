// crates/scoring-core/src/interpreter.rs
// ============================================================================
// Module: Rule Interpreter
// Description: Evaluates a rule document's named rules against a context.
// Purpose: Dispatch on the six closed rule-body shapes, apply declared edge
//          cases in order, and produce a fully explained evaluation outcome.
// Dependencies: bigdecimal, rule-logic, serde_json
// ============================================================================

//! ## Overview
//! The interpreter has two entry points. [`evaluate_named_rule`] resolves one
//! named rule within a document, recursing into dependencies through
//! [`crate::context::EvaluationContext::resolve`] and memoizing results.
//! [`evaluate_primary`] is the tool-facing call: it resolves one designated
//! "primary" rule, applies the document's edge cases to the result in
//! declaration order, and returns the complete [`EvaluationOutcome`] the
//! external tool contract requires (result, breakdown, variables, rule
//! version). Arithmetic runs over [`bigdecimal::BigDecimal`] rather than
//! `f64` so that chained formula and edge-case math never drifts from what
//! the rule author wrote.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Number;
use serde_json::Value;

use crate::breakdown::BreakdownStep;
use crate::comparator::evaluate_comparator;
use crate::context::EvaluationContext;
use crate::error::EvaluationError;
use crate::identifiers::RuleVersion;
use crate::rule::Condition;
use crate::rule::ConditionTree;
use crate::rule::EdgeCaseAction;
use crate::rule::FormulaExpr;
use crate::rule::FormulaFn;
use crate::rule::FormulaOp;
use crate::rule::Rule;
use crate::rule::RuleBody;
use crate::rule::RuleDocument;

// ============================================================================
// SECTION: Evaluation Outcome
// ============================================================================

/// Complete result of evaluating one document's primary rule, including its
/// explanation trail.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EvaluationOutcome {
    /// Final value, after edge cases have been applied.
    pub result: Value,
    /// Ordered explanation of every variable resolved and edge case applied.
    pub breakdown: Vec<BreakdownStep>,
    /// Every intermediate rule value computed while producing `result`.
    pub variables: std::collections::BTreeMap<String, Value>,
    /// Name of the rule that produced the (pre-edge-case) base value.
    pub formula_used: String,
    /// Version of the document this outcome was evaluated against.
    pub rule_version: RuleVersion,
    /// Names of edge cases whose condition held and were applied.
    pub edge_cases_applied: Vec<String>,
    /// Names of declared inputs that fell back to their default.
    pub defaults_applied: Vec<String>,
    /// Confidence for this outcome, clamped to `[doc.metadata.confidence_floor, 1.0]`.
    pub confidence: f64,
    /// The most influential breakdown steps, ranked by magnitude.
    pub key_factors: Vec<BreakdownStep>,
}

/// Sentinel in [`RuleDocument::output_fields`] meaning "the primary rule's
/// own post-edge-case value".
const PRIMARY_SENTINEL: &str = "$primary";

/// Sentinel in [`RuleDocument::output_fields`] meaning "this outcome's
/// clamped confidence".
const CONFIDENCE_SENTINEL: &str = "$confidence";

/// Name of the named rule, when declared, whose value becomes this
/// outcome's confidence before floor/ceiling clamping.
const CONFIDENCE_RULE_NAME: &str = "confidence";

/// Number of breakdown steps surfaced as `key_factors`.
const KEY_FACTOR_COUNT: usize = 5;

// ============================================================================
// SECTION: Primary Entry Point
// ============================================================================

/// Evaluates `primary_rule`, applies `doc`'s edge cases in declaration order
/// to its base value, and returns the complete outcome.
///
/// Before evaluation, any input named in `doc.input_defaults` that is
/// absent from `ctx` is filled in from its declared default (see
/// [`RuleDocument::input_defaults`]).
///
/// # Errors
///
/// Propagates any [`EvaluationError`] raised while resolving `primary_rule`
/// or applying an edge case.
pub fn evaluate_primary(
    doc: &RuleDocument,
    primary_rule: &str,
    mut ctx: EvaluationContext,
) -> Result<EvaluationOutcome, EvaluationError> {
    for (name, value) in &doc.input_defaults {
        if ctx.input(name).is_none() {
            ctx.apply_default(name, value.clone());
        }
    }

    let base = evaluate_named_rule(doc, primary_rule, &mut ctx)?;
    let mut current = base;
    let mut applied = Vec::new();

    for edge_case in &doc.edge_cases {
        let holds = eval_condition_tree(&edge_case.condition, primary_rule, doc, &mut ctx)?;
        if !holds {
            continue;
        }
        current = apply_edge_case_action(&edge_case.action, primary_rule, &edge_case.name, &current)?;
        applied.push(edge_case.name.clone());
        ctx.push_breakdown(BreakdownStep::new(
            edge_case.name.clone(),
            current.clone(),
            format!("edge case '{}' applied", edge_case.name),
        ));
    }

    if !applied.is_empty() {
        ctx.record_intermediate(primary_rule, current.clone(), "post edge-case value");
    }

    let confidence = resolve_confidence(doc, primary_rule, &mut ctx)?;
    let result = assemble_result(doc, primary_rule, &current, confidence, &mut ctx)?;

    let defaults_applied = ctx.defaults_applied();
    let variables = ctx.intermediates().clone();
    let breakdown = ctx.into_breakdown();
    let key_factors = breakdown.top_factors(KEY_FACTOR_COUNT).into_iter().cloned().collect();

    Ok(EvaluationOutcome {
        result,
        breakdown: breakdown.steps().to_vec(),
        variables,
        formula_used: primary_rule.to_owned(),
        rule_version: doc.metadata.version.clone(),
        edge_cases_applied: applied,
        defaults_applied,
        confidence,
        key_factors,
    })
}

/// Resolves this document's confidence, clamped to `[confidence_floor, 1.0]`.
///
/// When the document declares a named rule called `"confidence"`, its
/// resolved value becomes the raw confidence; otherwise the raw confidence
/// defaults to `1.0`. Either way, a breakdown step records the clamp.
///
/// # Errors
///
/// Propagates any [`EvaluationError`] raised while resolving the declared
/// confidence rule, and returns [`EvaluationError::Comparator`] if that
/// rule's value is not numeric.
fn resolve_confidence(
    doc: &RuleDocument,
    primary_rule: &str,
    ctx: &mut EvaluationContext,
) -> Result<f64, EvaluationError> {
    let raw = if doc.rules.contains_key(CONFIDENCE_RULE_NAME) {
        let value = ctx.resolve(doc, primary_rule, CONFIDENCE_RULE_NAME)?;
        value.as_f64().ok_or_else(|| EvaluationError::Comparator {
            detail: format!("rule '{CONFIDENCE_RULE_NAME}' must resolve to a number, got {value}"),
        })?
    } else {
        1.0
    };
    let floor = doc.metadata.confidence_floor;
    let clamped = raw.clamp(floor, 1.0);
    ctx.push_breakdown(BreakdownStep::new(
        CONFIDENCE_RULE_NAME.to_owned(),
        Value::from(clamped),
        format!("confidence clamped to floor {floor}"),
    ));
    Ok(clamped)
}

/// Assembles the outcome's `result` value from `doc.output_fields`.
///
/// An empty `output_fields` map means the tool's result is the primary
/// rule's own post-edge-case scalar, returned as-is. A non-empty map builds
/// a JSON object keyed by each declared output field, resolving
/// [`PRIMARY_SENTINEL`] to `primary_value`, [`CONFIDENCE_SENTINEL`] to
/// `confidence`, and any other source name as a named rule (or input/
/// intermediate) via [`EvaluationContext::resolve`] — including the
/// primary rule's own name, which by this point has been re-recorded as
/// its post-edge-case value (see [`evaluate_primary`]).
///
/// # Errors
///
/// Propagates any [`EvaluationError`] raised while resolving a declared
/// output field's source.
fn assemble_result(
    doc: &RuleDocument,
    primary_rule: &str,
    primary_value: &Value,
    confidence: f64,
    ctx: &mut EvaluationContext,
) -> Result<Value, EvaluationError> {
    if doc.output_fields.is_empty() {
        return Ok(primary_value.clone());
    }
    let mut object = serde_json::Map::new();
    for (field, source) in &doc.output_fields {
        let value = if source == PRIMARY_SENTINEL {
            primary_value.clone()
        } else if source == CONFIDENCE_SENTINEL {
            Value::from(confidence)
        } else {
            ctx.resolve(doc, primary_rule, source)?
        };
        object.insert(field.clone(), value);
    }
    Ok(Value::Object(object))
}

// ============================================================================
// SECTION: Named Rule Resolution
// ============================================================================

/// Evaluates a single named rule's body and memoizes the result in `ctx`.
///
/// Called both directly (by [`evaluate_primary`]) and indirectly (by
/// [`EvaluationContext::resolve`]) when a formula or condition references
/// another rule by name.
///
/// # Errors
///
/// Returns [`EvaluationError::UndefinedVariable`] if `name` is not a rule in
/// `doc`, or whatever error the rule's body produces during evaluation.
pub fn evaluate_named_rule(
    doc: &RuleDocument,
    name: &str,
    ctx: &mut EvaluationContext,
) -> Result<Value, EvaluationError> {
    let Rule { body } = doc.rules.get(name).ok_or_else(|| EvaluationError::UndefinedVariable {
        rule: name.to_owned(),
        name: name.to_owned(),
    })?;
    let value = eval_rule_body(body, name, doc, ctx)?;
    ctx.record_intermediate(name, value.clone(), format!("resolved rule '{name}'"));
    Ok(value)
}

/// Dispatches on a rule body's tag and produces its base value.
fn eval_rule_body(
    body: &RuleBody,
    rule_name: &str,
    doc: &RuleDocument,
    ctx: &mut EvaluationContext,
) -> Result<Value, EvaluationError> {
    match body {
        RuleBody::Formula { expression } => {
            let result = eval_formula_expr(expression, rule_name, doc, ctx)?;
            decimal_to_number(&result, rule_name).map(Value::Number)
        }
        RuleBody::DecisionTree { branches, fallback } => {
            for branch in branches {
                if eval_condition_tree(&branch.condition, rule_name, doc, ctx)? {
                    return Ok(branch.output.clone());
                }
            }
            if fallback.is_null() {
                return Err(EvaluationError::NoMatchingBranch {
                    rule: rule_name.to_owned(),
                });
            }
            Ok(fallback.clone())
        }
        RuleBody::LookupTable { input, entries } => {
            let actual = ctx.resolve(doc, rule_name, input)?;
            entries
                .iter()
                .find(|entry| entry.key == actual)
                .map(|entry| entry.value.clone())
                .ok_or_else(|| EvaluationError::LookupGap {
                    rule: rule_name.to_owned(),
                    step: "lookup_table".to_owned(),
                    input: actual.to_string(),
                })
        }
        RuleBody::Mapping { input, entries, default } => {
            let actual = ctx.resolve(doc, rule_name, input)?;
            let key = match &actual {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Ok(entries.get(&key).cloned().unwrap_or_else(|| default.clone()))
        }
        RuleBody::RangeLookup { input, intervals } => {
            let actual = ctx.resolve(doc, rule_name, input)?;
            let actual_num = actual.as_number().ok_or_else(|| EvaluationError::Comparator {
                detail: format!("range_lookup input '{input}' did not resolve to a number"),
            })?;
            let actual_dec = number_to_decimal(actual_num, rule_name)?;
            for interval in intervals {
                let low = number_to_decimal(&interval.low, rule_name)?;
                let high = number_to_decimal(&interval.high, rule_name)?;
                if actual_dec >= low && actual_dec < high {
                    return Ok(interval.value.clone());
                }
            }
            Err(EvaluationError::LookupGap {
                rule: rule_name.to_owned(),
                step: "range_lookup".to_owned(),
                input: actual.to_string(),
            })
        }
        RuleBody::Threshold { input, cutoffs, below_all } => {
            let actual = ctx.resolve(doc, rule_name, input)?;
            let actual_num = actual.as_number().ok_or_else(|| EvaluationError::Comparator {
                detail: format!("threshold input '{input}' did not resolve to a number"),
            })?;
            let actual_dec = number_to_decimal(actual_num, rule_name)?;
            let mut selected = below_all.clone();
            for cutoff in cutoffs {
                let at = number_to_decimal(&cutoff.at, rule_name)?;
                if actual_dec >= at {
                    selected = cutoff.value.clone();
                } else {
                    break;
                }
            }
            Ok(selected)
        }
    }
}

// ============================================================================
// SECTION: Condition Tree Evaluation
// ============================================================================

/// Recursively evaluates a [`ConditionTree`] against the current context.
///
/// This is a plain, non-batched evaluator over the requirement algebra's
/// public variants: one decision evaluates one context at a time, so the
/// columnar batch-evaluation traits the same tree type supports elsewhere
/// do not apply here.
///
/// # Errors
///
/// Propagates [`EvaluationError`] from resolving a leaf condition's variable
/// or from comparator evaluation.
fn eval_condition_tree(
    tree: &ConditionTree,
    rule_name: &str,
    doc: &RuleDocument,
    ctx: &mut EvaluationContext,
) -> Result<bool, EvaluationError> {
    match tree {
        ConditionTree::Predicate(condition) => eval_condition(condition, rule_name, doc, ctx),
        ConditionTree::Not(inner) => Ok(!eval_condition_tree(inner, rule_name, doc, ctx)?),
        ConditionTree::And(parts) => {
            for part in parts {
                if !eval_condition_tree(part, rule_name, doc, ctx)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        ConditionTree::Or(parts) => {
            for part in parts {
                if eval_condition_tree(part, rule_name, doc, ctx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        ConditionTree::RequireGroup { min, reqs } => {
            let mut satisfied = 0usize;
            for part in reqs {
                if eval_condition_tree(part, rule_name, doc, ctx)? {
                    satisfied += 1;
                }
            }
            Ok(satisfied >= usize::from(*min))
        }
    }
}

/// Evaluates a single leaf [`Condition`].
fn eval_condition(
    condition: &Condition,
    rule_name: &str,
    doc: &RuleDocument,
    ctx: &mut EvaluationContext,
) -> Result<bool, EvaluationError> {
    let actual = ctx.resolve(doc, rule_name, &condition.variable)?;
    evaluate_comparator(condition.comparator, &actual, &condition.operand)
}

// ============================================================================
// SECTION: Formula Evaluation
// ============================================================================

/// Recursively evaluates a [`FormulaExpr`] over decimal arithmetic.
fn eval_formula_expr(
    expr: &FormulaExpr,
    rule_name: &str,
    doc: &RuleDocument,
    ctx: &mut EvaluationContext,
) -> Result<BigDecimal, EvaluationError> {
    match expr {
        FormulaExpr::Var { name } => {
            let value = ctx.resolve(doc, rule_name, name)?;
            let number = value.as_number().ok_or_else(|| EvaluationError::Formula {
                rule: rule_name.to_owned(),
                detail: format!("variable '{name}' did not resolve to a number"),
            })?;
            number_to_decimal(number, rule_name)
        }
        FormulaExpr::Const { value } => number_to_decimal(value, rule_name),
        FormulaExpr::BinOp { op, left, right } => {
            let left = eval_formula_expr(left, rule_name, doc, ctx)?;
            let right = eval_formula_expr(right, rule_name, doc, ctx)?;
            match op {
                FormulaOp::Add => Ok(left + right),
                FormulaOp::Sub => Ok(left - right),
                FormulaOp::Mul => Ok(left * right),
                FormulaOp::Div => {
                    if right == BigDecimal::from(0) {
                        return Err(EvaluationError::DivisionByZero {
                            rule: rule_name.to_owned(),
                            step: "formula".to_owned(),
                        });
                    }
                    Ok(left / right)
                }
            }
        }
        FormulaExpr::Call { func, args } => {
            let values = args
                .iter()
                .map(|arg| eval_formula_expr(arg, rule_name, doc, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            eval_formula_call(*func, &values, rule_name)
        }
    }
}

/// Evaluates a declared arithmetic function call against its evaluated args.
fn eval_formula_call(
    func: FormulaFn,
    args: &[BigDecimal],
    rule_name: &str,
) -> Result<BigDecimal, EvaluationError> {
    match func {
        FormulaFn::Min => args
            .iter()
            .min()
            .cloned()
            .ok_or_else(|| formula_arity_error(rule_name, "min", "at least one argument")),
        FormulaFn::Max => args
            .iter()
            .max()
            .cloned()
            .ok_or_else(|| formula_arity_error(rule_name, "max", "at least one argument")),
        FormulaFn::Round => match args {
            [value] => Ok(value.round(0)),
            _ => Err(formula_arity_error(rule_name, "round", "exactly one argument")),
        },
        FormulaFn::Clamp => match args {
            [value, low, high] => Ok(value.clamp(low.clone(), high.clone())),
            _ => Err(formula_arity_error(rule_name, "clamp", "exactly three arguments")),
        },
    }
}

/// Builds a formula arity error with a consistent message shape.
fn formula_arity_error(rule_name: &str, func: &str, expected: &str) -> EvaluationError {
    EvaluationError::Formula {
        rule: rule_name.to_owned(),
        detail: format!("'{func}' expects {expected}"),
    }
}

// ============================================================================
// SECTION: Edge Case Application
// ============================================================================

/// Applies a single edge-case action to a rule's current value.
fn apply_edge_case_action(
    action: &EdgeCaseAction,
    rule_name: &str,
    edge_case_name: &str,
    current: &Value,
) -> Result<Value, EvaluationError> {
    let fail = |detail: String| EvaluationError::EdgeCaseFailed {
        rule: rule_name.to_owned(),
        edge_case: edge_case_name.to_owned(),
        detail,
    };

    match action {
        EdgeCaseAction::Set { value } => Ok(value.clone()),
        EdgeCaseAction::Multiply { factor } => {
            let base = current
                .as_number()
                .ok_or_else(|| fail("base value is not numeric".to_owned()))?;
            let base = number_to_decimal(base, rule_name)?;
            let factor = number_to_decimal(factor, rule_name)?;
            decimal_to_number(&(base * factor), rule_name).map(Value::Number)
        }
        EdgeCaseAction::Add { delta } => {
            let base = current
                .as_number()
                .ok_or_else(|| fail("base value is not numeric".to_owned()))?;
            let base = number_to_decimal(base, rule_name)?;
            let delta = number_to_decimal(delta, rule_name)?;
            decimal_to_number(&(base + delta), rule_name).map(Value::Number)
        }
        EdgeCaseAction::Cap { upper } => {
            let base = current
                .as_number()
                .ok_or_else(|| fail("base value is not numeric".to_owned()))?;
            let base = number_to_decimal(base, rule_name)?;
            let upper = number_to_decimal(upper, rule_name)?;
            let capped = if base > upper { upper } else { base };
            decimal_to_number(&capped, rule_name).map(Value::Number)
        }
        EdgeCaseAction::Floor { lower } => {
            let base = current
                .as_number()
                .ok_or_else(|| fail("base value is not numeric".to_owned()))?;
            let base = number_to_decimal(base, rule_name)?;
            let lower = number_to_decimal(lower, rule_name)?;
            let floored = if base < lower { lower } else { base };
            decimal_to_number(&floored, rule_name).map(Value::Number)
        }
    }
}

// ============================================================================
// SECTION: Decimal Conversion Helpers
// ============================================================================

/// Parses a JSON number into `BigDecimal` via its stable string rendering.
fn number_to_decimal(number: &Number, rule_name: &str) -> Result<BigDecimal, EvaluationError> {
    BigDecimal::from_str(&number.to_string()).map_err(|err| EvaluationError::Formula {
        rule: rule_name.to_owned(),
        detail: format!("could not parse '{number}' as a decimal: {err}"),
    })
}

/// Converts a `BigDecimal` result back into a JSON number.
fn decimal_to_number(value: &BigDecimal, rule_name: &str) -> Result<Number, EvaluationError> {
    let rendered = value.to_string();
    if let Ok(as_i64) = rendered.parse::<i64>() {
        return Ok(Number::from(as_i64));
    }
    let as_f64: f64 = rendered.parse().map_err(|_| EvaluationError::Formula {
        rule: rule_name.to_owned(),
        detail: format!("decimal result '{rendered}' could not be rendered as a number"),
    })?;
    Number::from_f64(as_f64).ok_or_else(|| EvaluationError::Formula {
        rule: rule_name.to_owned(),
        detail: format!("decimal result '{rendered}' is not representable as a JSON number"),
    })
}
