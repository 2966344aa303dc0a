//! Turning reported schema relationships into SQL join predicates.

use super::options::DatasetTarget;
use crate::error::{Result, ScanError};
use crate::policy::{PolicyFilter, short_name};
use crate::scan::SchemaRelationship;
use crate::view::ResolvedRelationship;

/// Resolve every relationship whose two tables pass `policy`.
///
/// Tables are named `project.dataset.table` from the target, keyed on the
/// last path segment of each side's `tableFqn`. Each positional pair of
/// column paths becomes `left.col = right.col`, and the pairs are joined
/// with ` AND ` in their original order.
///
/// The live inventory is deliberately not consulted here: a relationship to
/// a table that no longer exists is still reported unless the policy blocks it.
///
/// # Errors
///
/// Returns [`ScanError::Validation`] when the two sides of a surfaced
/// relationship list a different number of column paths, or none at all.
pub fn resolve_relationships(
    relationships: &[SchemaRelationship],
    target: &DatasetTarget,
    policy: &PolicyFilter,
) -> Result<Vec<ResolvedRelationship>> {
    let mut resolved = Vec::with_capacity(relationships.len());

    for rel in relationships {
        let left_short = short_name(&rel.left.table_fqn);
        let right_short = short_name(&rel.right.table_fqn);
        if !policy.is_allowed(left_short) || !policy.is_allowed(right_short) {
            tracing::debug!(
                left = %left_short,
                right = %right_short,
                "relationship excluded by policy"
            );
            continue;
        }

        let left_table = target.sql_table_name(left_short);
        let right_table = target.sql_table_name(right_short);

        if rel.left.paths.len() != rel.right.paths.len() {
            return Err(ScanError::Validation(format!(
                "relationship {left_table} -> {right_table} pairs {} column paths with {}",
                rel.left.paths.len(),
                rel.right.paths.len()
            )));
        }
        if rel.left.paths.is_empty() {
            return Err(ScanError::Validation(format!(
                "relationship {left_table} -> {right_table} has no column paths"
            )));
        }

        let predicates: Vec<String> = rel
            .left
            .paths
            .iter()
            .zip(&rel.right.paths)
            .map(|(l, r)| format!("{left_table}.{l} = {right_table}.{r}"))
            .collect();

        resolved.push(ResolvedRelationship {
            table1: left_table,
            table2: right_table,
            relationship: predicates.join(" AND "),
            sources: rel.sources.clone(),
            confidence_score: rel.confidence_score,
            kind: rel.kind.clone(),
        });
    }

    Ok(resolved)
}
