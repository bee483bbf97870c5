// crates/scoring-tools/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Closed registry of the fixed tool catalog with access policy.
// Purpose: Route a tool name to its contract and enforce which tools a
//          caller (tenant, API key) may invoke.
// Dependencies: scoring-contract, scoring-core
// ============================================================================

//! ## Overview
//! [`ToolRegistry`] indexes the fixed five-tool catalog by [`ToolName`] and
//! enforces a [`ToolAccessPolicy`] on every lookup, mirroring the shape of an
//! evidence-provider registry: an allowlist/denylist pair where denylist
//! always wins, and `allowlist: None` means every registered tool is
//! reachable unless explicitly denied.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use scoring_contract::ToolContract;
use scoring_contract::tool_catalog;
use scoring_core::ToolName;

// ============================================================================
// SECTION: Access Policy
// ============================================================================

/// Access policy controlling which tools may be invoked.
///
/// # Invariants
/// - `denylist` overrides `allowlist` when both name the same tool.
/// - If `allowlist` is `None`, every registered tool is permitted unless
///   denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolAccessPolicy {
    /// Optional allowlist of tool names; `None` permits all.
    pub allowlist: Option<BTreeSet<ToolName>>,
    /// Explicit denylist of tool names.
    pub denylist: BTreeSet<ToolName>,
}

impl ToolAccessPolicy {
    /// Returns a policy that permits every registered tool.
    #[must_use]
    pub fn allow_all() -> Self {
        Self { allowlist: None, denylist: BTreeSet::new() }
    }

    /// Returns whether `tool` is permitted by this policy.
    #[must_use]
    pub fn is_allowed(&self, tool: &ToolName) -> bool {
        if self.denylist.contains(tool) {
            return false;
        }
        self.allowlist.as_ref().is_none_or(|allowlist| allowlist.contains(tool))
    }
}

impl Default for ToolAccessPolicy {
    fn default() -> Self {
        Self::allow_all()
    }
}

// ============================================================================
// SECTION: Tool Registry
// ============================================================================

/// Errors raised while registering or resolving a tool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The tool name is not present in the catalog at all.
    #[error("tool '{0}' is not part of the fixed tool catalog")]
    UnknownTool(ToolName),
    /// The tool exists but is blocked by the configured access policy.
    #[error("tool '{0}' is blocked by access policy")]
    BlockedByPolicy(ToolName),
}

/// Closed registry of the fixed tool catalog with access policy enforcement.
pub struct ToolRegistry {
    contracts: BTreeMap<ToolName, ToolContract>,
    policy: ToolAccessPolicy,
}

impl ToolRegistry {
    /// Builds a registry over the fixed catalog with the given policy.
    #[must_use]
    pub fn new(policy: ToolAccessPolicy) -> Self {
        let contracts = tool_catalog().into_iter().map(|contract| (contract.name.clone(), contract)).collect();
        Self { contracts, policy }
    }

    /// Returns the configured access policy.
    #[must_use]
    pub const fn policy(&self) -> &ToolAccessPolicy {
        &self.policy
    }

    /// Returns every tool name in the catalog, regardless of policy.
    #[must_use]
    pub fn catalog_names(&self) -> Vec<ToolName> {
        self.contracts.keys().cloned().collect()
    }

    /// Resolves a tool's contract, enforcing the access policy.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownTool`] when `tool` is not part of the
    /// catalog, or [`RegistryError::BlockedByPolicy`] when it is denied.
    pub fn resolve(&self, tool: &ToolName) -> Result<&ToolContract, RegistryError> {
        let contract = self.contracts.get(tool).ok_or_else(|| RegistryError::UnknownTool(tool.clone()))?;
        if !self.policy.is_allowed(tool) {
            return Err(RegistryError::BlockedByPolicy(tool.clone()));
        }
        Ok(contract)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(ToolAccessPolicy::default())
    }
}
