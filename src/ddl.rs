//! Partition and cluster column extraction from BigQuery DDL text.
//!
//! This is a textual best-effort match on `PARTITION BY <cols>` and
//! `CLUSTER BY <cols>`, not a SQL parser. Column expressions are returned
//! verbatim (e.g. `DATE(ts)`), split on top-level commas and trimmed.

use crate::error::{Result, ScanError};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static PARTITION_RE: LazyLock<Option<Regex>> = LazyLock::new(|| clause_regex("PARTITION"));
static CLUSTER_RE: LazyLock<Option<Regex>> = LazyLock::new(|| clause_regex("CLUSTER"));

// The clause runs until the next clause keyword, an OPTIONS block, a
// statement terminator or the end of the line.
fn clause_regex(keyword: &str) -> Option<Regex> {
    Regex::new(&format!(
        r"(?i)\b{keyword}\s+BY\s+(.+?)\s*(?:\bPARTITION\s+BY\b|\bCLUSTER\s+BY\b|\bOPTIONS\s*\(|\bAS\s+SELECT\b|;|\n|$)"
    ))
    .ok()
}

/// Table storage optimization named in a DDL clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optimization {
    Partition,
    Cluster,
}

impl Optimization {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Partition => "PARTITION",
            Self::Cluster => "CLUSTER",
        }
    }

    fn regex(self) -> Option<&'static Regex> {
        match self {
            Self::Partition => PARTITION_RE.as_ref(),
            Self::Cluster => CLUSTER_RE.as_ref(),
        }
    }
}

impl fmt::Display for Optimization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Optimization {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PARTITION" => Ok(Self::Partition),
            "CLUSTER" => Ok(Self::Cluster),
            other => Err(ScanError::PolicyConfig(format!(
                "invalid optimization type '{other}', expected PARTITION or CLUSTER"
            ))),
        }
    }
}

/// Extract the column list of the `kind` clause; empty when the clause is absent.
pub fn extract_optimization_columns(ddl: &str, kind: Optimization) -> Vec<String> {
    kind.regex()
        .and_then(|re| re.captures(ddl))
        .and_then(|caps| caps.get(1))
        .map(|m| split_top_level(m.as_str()))
        .unwrap_or_default()
}

/// Same as [`extract_optimization_columns`] with the kind given by name.
///
/// # Errors
///
/// Returns [`ScanError::PolicyConfig`] when `kind` is not `PARTITION` or `CLUSTER`.
pub fn extract_optimization_columns_by_name(ddl: &str, kind: &str) -> Result<Vec<String>> {
    Ok(extract_optimization_columns(ddl, kind.parse()?))
}

fn split_top_level(list: &str) -> Vec<String> {
    let mut columns = Vec::new();
    let mut depth = 0_usize;
    let mut current = String::new();

    for ch in list.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                push_trimmed(&mut columns, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    push_trimmed(&mut columns, &current);

    columns
}

fn push_trimmed(columns: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        columns.push(trimmed.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_and_cluster_on_one_line() {
        let ddl = "CREATE TABLE t (...) PARTITION BY DATE(ts), region CLUSTER BY user_id";
        assert_eq!(
            extract_optimization_columns(ddl, Optimization::Partition),
            vec!["DATE(ts)", "region"]
        );
        assert_eq!(
            extract_optimization_columns(ddl, Optimization::Cluster),
            vec!["user_id"]
        );
    }

    #[test]
    fn test_bigquery_multiline_ddl() {
        let ddl = "CREATE TABLE `p.shop.orders`\n(\n  order_id INT64,\n  created_at TIMESTAMP\n)\n\
                   PARTITION BY DATE_TRUNC(created_at, MONTH)\n\
                   CLUSTER BY user_id, status\n\
                   OPTIONS(description=\"orders\");";
        assert_eq!(
            extract_optimization_columns(ddl, Optimization::Partition),
            vec!["DATE_TRUNC(created_at, MONTH)"]
        );
        assert_eq!(
            extract_optimization_columns(ddl, Optimization::Cluster),
            vec!["user_id", "status"]
        );
    }

    #[test]
    fn test_clause_patterns_compile() {
        assert!(Optimization::Partition.regex().is_some());
        assert!(Optimization::Cluster.regex().is_some());
    }

    #[test]
    fn test_case_insensitive_and_trimmed() {
        let ddl = "create table t (a int64) cluster by   a ,  b  ;";
        assert_eq!(extract_optimization_columns(ddl, Optimization::Cluster), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_clause_is_empty() {
        let ddl = "CREATE TABLE t (a INT64);";
        assert!(extract_optimization_columns(ddl, Optimization::Partition).is_empty());
        assert!(extract_optimization_columns(ddl, Optimization::Cluster).is_empty());
    }

    #[test]
    fn test_invalid_kind_is_config_error() {
        let err = extract_optimization_columns_by_name("CREATE TABLE t", "SHARD").unwrap_err();
        assert!(matches!(err, ScanError::PolicyConfig(_)));
        assert_eq!(
            extract_optimization_columns_by_name("x CLUSTER BY a", "CLUSTER").unwrap(),
            vec!["a"]
        );
    }
}
