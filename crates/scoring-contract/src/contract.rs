// crates/scoring-contract/src/contract.rs
// ============================================================================
// Module: Contract Builder
// Description: The fixed five-tool catalog and its hash-addressed packaging.
// Purpose: Give every other crate one authoritative source for what each
//          tool accepts, returns, and demonstrates via worked examples.
// Dependencies: jsonschema, scoring-core, serde_json
// ============================================================================

//! ## Overview
//! [`tool_catalog`] returns the fixed five [`ToolContract`]s in catalog
//! order: `company_quality`, `contact_tier`, `timing_score`,
//! `banking_product_match`, `composite_score`. [`build_bundle`] packages a
//! catalog into a [`ContractBundle`] with a canonical content hash per
//! contract plus a manifest hash over the whole set.
//! [`validate_contract_examples`] compiles each contract's input and output
//! schemas and checks every worked example against them, catching a drifted
//! example at contract-authoring time rather than at a caller's doorstep.

// ============================================================================
// SECTION: Imports
// ============================================================================

use jsonschema::Draft;
use scoring_core::HashAlgorithm;
use scoring_core::ToolName;
use scoring_core::hashing::HashError;
use scoring_core::hashing::hash_canonical_json;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::types::ContractArtifact;
use crate::types::ContractBundle;
use crate::types::ContractManifest;
use crate::types::DeterminismClass;
use crate::types::ManifestArtifact;
use crate::types::ToolContract;
use crate::types::ToolExample;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while packaging or validating the tool catalog.
#[derive(Debug, Error)]
pub enum ContractError {
    /// A contract's JSON could not be canonicalized for hashing.
    #[error("failed to hash contract '{tool}': {source}")]
    Hashing {
        /// Tool the failing contract belongs to.
        tool: ToolName,
        /// Underlying canonicalization failure.
        #[source]
        source: HashError,
    },
    /// A contract's input or output schema failed to compile.
    #[error("contract '{tool}' has an invalid {which} schema: {detail}")]
    InvalidSchema {
        /// Tool the failing contract belongs to.
        tool: ToolName,
        /// Which schema failed (`input` or `output`).
        which: &'static str,
        /// Underlying compiler error detail.
        detail: String,
    },
    /// A worked example failed to satisfy its own contract's schema.
    #[error("contract '{tool}' example {index} fails {which} schema: {detail}")]
    ExampleMismatch {
        /// Tool the failing contract belongs to.
        tool: ToolName,
        /// Zero-based index of the offending example.
        index: usize,
        /// Which schema the example failed (`input` or `output`).
        which: &'static str,
        /// Joined validation error messages.
        detail: String,
    },
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Builds the fixed five-tool catalog, in stable catalog order.
///
/// # Panics
///
/// Panics if a tool name literal fails to construct, which would only
/// happen if one of the hard-coded names above exceeds the identifier length
/// limit — an invariant violation in this module, not a caller error.
#[must_use]
pub fn tool_catalog() -> Vec<ToolContract> {
    vec![
        company_quality_contract(),
        contact_tier_contract(),
        timing_score_contract(),
        banking_product_match_contract(),
        composite_score_contract(),
    ]
}

fn tool_name(name: &str) -> ToolName {
    ToolName::new(name).unwrap_or_else(|_| unreachable!("fixed tool name literal '{name}' is always valid"))
}

fn company_quality_contract() -> ToolContract {
    ToolContract {
        name: tool_name("company_quality"),
        description: "Scores a prospective company's size, sector, and licensing profile into a lead quality tier."
            .to_owned(),
        input_schema: json!({
            "type": "object",
            "required": ["name", "industry", "size", "license_type", "sector"],
            "properties": {
                "name": {"type": "string"},
                "industry": {"type": "string"},
                "size": {"type": "integer", "minimum": 0},
                "license_type": {"type": "string"},
                "sector": {"type": "string"},
                "locale_signals": {"type": "object"},
                "salary_indicators": {"type": "object"}
            }
        }),
        output_schema: json!({
            "type": "object",
            "required": ["quality_tier", "score", "confidence"],
            "properties": {
                "quality_tier": {"type": "string", "enum": ["TIER_1", "TIER_2", "TIER_3"]},
                "score": {"type": "number", "minimum": 0, "maximum": 100},
                "confidence": {"type": "number", "minimum": 0, "maximum": 1}
            }
        }),
        determinism: DeterminismClass::Deterministic,
        examples: vec![
            ToolExample {
                description: "Midsize technology company on a Free Zone license in the private sector.".to_owned(),
                input: json!({
                    "name": "TechCorp UAE",
                    "industry": "Technology",
                    "size": 150,
                    "license_type": "Free Zone",
                    "sector": "Private"
                }),
                output: json!({"quality_tier": "TIER_1", "score": 90, "confidence": 0.95}),
            },
            ToolExample {
                description: "Government entity, heavily discounted by the government-entity edge case.".to_owned(),
                input: json!({
                    "name": "Dubai Municipality",
                    "industry": "government",
                    "size": 10_000,
                    "license_type": "Mainland",
                    "sector": "government"
                }),
                output: json!({"quality_tier": "TIER_3", "score": 4.25, "confidence": 0.95}),
            },
        ],
        notes: "Industries and license types outside the declared table fall back to their rule-document default boost."
            .to_owned(),
    }
}

fn contact_tier_contract() -> ToolContract {
    ToolContract {
        name: tool_name("contact_tier"),
        description: "Classifies a contact's seniority and buying authority into an outreach tier and priority."
            .to_owned(),
        input_schema: json!({
            "type": "object",
            "required": ["title", "company_size"],
            "properties": {
                "title": {"type": "string"},
                "seniority": {"type": "string", "enum": ["C-Level", "VP", "Director", "Manager", "Individual"]},
                "department": {"type": "string"},
                "company_size": {"type": "integer", "minimum": 0},
                "velocity": {"type": "string"},
                "maturity": {"type": "string"}
            }
        }),
        output_schema: json!({
            "type": "object",
            "required": ["tier", "priority", "target_titles", "fallback_titles", "confidence"],
            "properties": {
                "tier": {"type": "string", "enum": ["STRATEGIC", "PRIMARY", "SECONDARY", "BACKUP"]},
                "priority": {"type": "integer", "minimum": 1, "maximum": 4},
                "target_titles": {"type": "array", "items": {"type": "string"}},
                "fallback_titles": {"type": "array", "items": {"type": "string"}},
                "confidence": {"type": "number", "minimum": 0, "maximum": 1}
            }
        }),
        determinism: DeterminismClass::Deterministic,
        examples: vec![ToolExample {
            description: "HR Director at a midsize company, seniority and department both inferred from title."
                .to_owned(),
            input: json!({"title": "HR Director", "company_size": 250}),
            output: json!({
                "tier": "STRATEGIC",
                "priority": 1,
                "target_titles": ["HR Director", "Finance Director", "CHRO"],
                "fallback_titles": ["VP of Finance", "Finance Manager"],
                "confidence": 0.9
            }),
        }],
        notes: "Seniority and department are inferred from `title` by keyword match when omitted; each inference \
                carries its own declared confidence penalty."
            .to_owned(),
    }
}

fn timing_score_contract() -> ToolContract {
    ToolContract {
        name: tool_name("timing_score"),
        description: "Scores outreach timing against how stale the triggering signal is and the fiscal calendar."
            .to_owned(),
        input_schema: json!({
            "type": "object",
            "required": ["signal_age_days", "fiscal_context"],
            "properties": {
                "signal_age_days": {"type": "integer", "minimum": 0},
                "signals": {"type": "array", "items": {"type": "string"}},
                "fiscal_context": {"type": "string", "enum": ["mid_year", "year_end"]}
            }
        }),
        output_schema: json!({
            "type": "object",
            "required": ["priority", "timing_score", "urgency", "confidence"],
            "properties": {
                "priority": {"type": "string", "enum": ["HOT", "WARM", "COOL", "COLD"]},
                "timing_score": {"type": "number", "minimum": 0, "maximum": 100},
                "urgency": {"type": "string", "enum": ["immediate", "soon", "monitor", "low"]},
                "confidence": {"type": "number", "minimum": 0, "maximum": 1}
            }
        }),
        determinism: DeterminismClass::Deterministic,
        examples: vec![
            ToolExample {
                description: "Fresh hiring signal, mid-year, no fiscal boost.".to_owned(),
                input: json!({
                    "signal_age_days": 5,
                    "signals": ["new_hire", "job_posting"],
                    "fiscal_context": "mid_year"
                }),
                output: json!({"priority": "HOT", "timing_score": 90, "urgency": "immediate", "confidence": 1.0}),
            },
            ToolExample {
                description: "Stale signal at fiscal year end, boosted by the year-end edge case.".to_owned(),
                input: json!({
                    "signal_age_days": 95,
                    "signals": ["new_hire"],
                    "fiscal_context": "year_end"
                }),
                output: json!({"priority": "COLD", "timing_score": 20, "urgency": "low", "confidence": 1.0}),
            },
        ],
        notes: "`signals` is accepted but not evaluated; only `signal_age_days` and `fiscal_context` drive the \
                declared ranges and edge case."
            .to_owned(),
    }
}

fn banking_product_match_contract() -> ToolContract {
    ToolContract {
        name: tool_name("banking_product_match"),
        description: "Matches a company's size, industry, and growth profile against the bank's product catalog."
            .to_owned(),
        input_schema: json!({
            "type": "object",
            "required": ["company_size", "industry"],
            "properties": {
                "company_size": {"type": "integer", "minimum": 0},
                "industry": {"type": "string"},
                "maturity": {"type": "string"},
                "hiring_velocity": {"type": "string"}
            }
        }),
        output_schema: json!({
            "type": "object",
            "required": ["recommended_products", "product_fit_scores", "confidence"],
            "properties": {
                "recommended_products": {"type": "array", "items": {"type": "string"}},
                "product_fit_scores": {"type": "object"},
                "confidence": {"type": "number", "minimum": 0, "maximum": 1}
            }
        }),
        determinism: DeterminismClass::Deterministic,
        examples: vec![ToolExample {
            description: "Enterprise technology company.".to_owned(),
            input: json!({"company_size": 6_000, "industry": "Technology", "maturity": "growth", "hiring_velocity": "high"}),
            output: json!({
                "recommended_products": ["Treasury Management", "Venture Debt", "Trade Finance", "Custody Services"],
                "product_fit_scores": {
                    "Treasury Management": 90,
                    "Commercial Lending": 88,
                    "Trade Finance": 85,
                    "Custody Services": 82
                },
                "confidence": 0.9
            }),
        }],
        notes: "`maturity` and `hiring_velocity` are optional; an omitted value is recorded as inferred and \
                discounts confidence."
            .to_owned(),
    }
}

fn composite_score_contract() -> ToolContract {
    ToolContract {
        name: tool_name("composite_score"),
        description: "Combines the other four tools' outputs and exogenous confidences into one outreach priority."
            .to_owned(),
        input_schema: json!({
            "type": "object",
            "required": ["company_quality_score", "contact_priority", "timing_score", "banking_match_confidence"],
            "properties": {
                "company_quality_score": {"type": "number", "minimum": 0, "maximum": 100},
                "contact_priority": {"type": "integer", "minimum": 1, "maximum": 4},
                "timing_score": {"type": "number", "minimum": 0, "maximum": 100},
                "banking_match_confidence": {"type": "number", "minimum": 0, "maximum": 1},
                "channel_confidence": {"type": "number", "minimum": 0, "maximum": 1},
                "context_confidence": {"type": "number", "minimum": 0, "maximum": 1}
            }
        }),
        output_schema: json!({
            "type": "object",
            "required": ["q_score", "lead_score_tier", "confidence", "reasoning"],
            "properties": {
                "q_score": {"type": "number", "minimum": 0, "maximum": 100},
                "lead_score_tier": {"type": "string", "enum": ["HOT", "WARM", "COLD", "DISQUALIFIED"]},
                "confidence": {"type": "number", "minimum": 0, "maximum": 1},
                "reasoning": {"type": "string"}
            }
        }),
        determinism: DeterminismClass::Deterministic,
        examples: vec![ToolExample {
            description: "Strong company quality, strategic contact, hot timing.".to_owned(),
            input: json!({
                "company_quality_score": 90,
                "contact_priority": 1,
                "timing_score": 90,
                "banking_match_confidence": 0.9,
                "channel_confidence": 0.9,
                "context_confidence": 0.85
            }),
            output: json!({"q_score": 92.5, "lead_score_tier": "HOT", "confidence": 0.765, "reasoning": "Strong fit across company quality, contact seniority, and timing signals."}),
        }],
        notes: "Takes no raw company or contact fields; every input is another tool's output or an exogenous confidence."
            .to_owned(),
    }
}

// ============================================================================
// SECTION: Packaging
// ============================================================================

/// Packages a tool catalog into a hash-addressed bundle.
///
/// # Errors
///
/// Returns [`ContractError::Hashing`] if any contract fails to canonicalize.
pub fn build_bundle(catalog: &[ToolContract]) -> Result<ContractBundle, ContractError> {
    let mut artifacts = Vec::with_capacity(catalog.len());
    let mut manifest_artifacts = Vec::with_capacity(catalog.len());

    for contract in catalog {
        let content_hash = hash_canonical_json(HashAlgorithm::Sha256, contract)
            .map_err(|source| ContractError::Hashing { tool: contract.name.clone(), source })?;
        manifest_artifacts
            .push(ManifestArtifact { name: contract.name.clone(), content_hash: content_hash.clone() });
        artifacts.push(ContractArtifact { contract: contract.clone(), content_hash });
    }

    let manifest_hash = hash_canonical_json(HashAlgorithm::Sha256, &manifest_artifacts)
        .map_err(|source| ContractError::Hashing { tool: tool_name("manifest"), source })?;

    Ok(ContractBundle {
        artifacts,
        manifest: ContractManifest { artifacts: manifest_artifacts, manifest_hash },
    })
}

// ============================================================================
// SECTION: Example Validation
// ============================================================================

/// Compiles a contract's schemas and checks every worked example against
/// them.
///
/// # Errors
///
/// Returns [`ContractError::InvalidSchema`] if either schema fails to
/// compile, or [`ContractError::ExampleMismatch`] if any example's input or
/// output fails its schema.
pub fn validate_contract_examples(contract: &ToolContract) -> Result<(), ContractError> {
    let input_schema = compile_schema(&contract.name, "input", &contract.input_schema)?;
    let output_schema = compile_schema(&contract.name, "output", &contract.output_schema)?;

    for (index, example) in contract.examples.iter().enumerate() {
        check_example(&contract.name, index, "input", &input_schema, &example.input)?;
        check_example(&contract.name, index, "output", &output_schema, &example.output)?;
    }

    Ok(())
}

fn compile_schema(tool: &ToolName, which: &'static str, schema: &Value) -> Result<jsonschema::Validator, ContractError> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| ContractError::InvalidSchema { tool: tool.clone(), which, detail: err.to_string() })
}

fn check_example(
    tool: &ToolName,
    index: usize,
    which: &'static str,
    schema: &jsonschema::Validator,
    value: &Value,
) -> Result<(), ContractError> {
    let messages: Vec<String> = schema.iter_errors(value).map(|err| err.to_string()).collect();
    if messages.is_empty() {
        Ok(())
    } else {
        Err(ContractError::ExampleMismatch { tool: tool.clone(), index, which, detail: messages.join("; ") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_five_fixed_tools() {
        assert_eq!(tool_catalog().len(), 5);
    }

    #[test]
    fn every_catalog_example_matches_its_own_schema() {
        for contract in tool_catalog() {
            validate_contract_examples(&contract).expect("example should satisfy its own schema");
        }
    }

    #[test]
    fn bundle_hash_is_stable_across_rebuilds() {
        let first = build_bundle(&tool_catalog()).expect("bundle");
        let second = build_bundle(&tool_catalog()).expect("bundle");
        assert_eq!(first.manifest.manifest_hash, second.manifest.manifest_hash);
    }
}
