//! Immutable run configuration.

use crate::error::{Result, ScanError};
use crate::policy::PolicyFilter;

/// Default number of full-view requests in flight at once.
pub const DEFAULT_HYDRATION_CONCURRENCY: usize = 8;

/// The dataset a run resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetTarget {
    pub project_id: String,
    pub dataset: String,
}

impl DatasetTarget {
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] if either part is empty or contains a
    /// path separator.
    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Result<Self> {
        let target = Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
        };
        for (label, value) in [("project", &target.project_id), ("dataset", &target.dataset)] {
            if value.trim().is_empty() || value.contains('/') {
                return Err(ScanError::Config(format!("invalid {label} name '{value}'")));
            }
        }
        Ok(target)
    }

    /// Resource path suffix of the dataset itself.
    pub fn dataset_suffix(&self) -> String {
        format!("/projects/{}/datasets/{}", self.project_id, self.dataset)
    }

    /// Resource path marker every table of the dataset contains.
    pub fn table_marker(&self) -> String {
        format!("{}/tables/", self.dataset_suffix())
    }

    /// `project.dataset.table` for a short table name.
    pub fn sql_table_name(&self, short_name: &str) -> String {
        format!("{}.{}.{short_name}", self.project_id, self.dataset)
    }
}

/// Settings for one pipeline run. Build a new value to change anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub policy: PolicyFilter,
    pub include_ddls: bool,
    pub include_table_counts: bool,
    pub hydration_concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            policy: PolicyFilter::allow_all(),
            include_ddls: false,
            include_table_counts: false,
            hydration_concurrency: DEFAULT_HYDRATION_CONCURRENCY,
        }
    }
}

impl PipelineOptions {
    pub fn builder() -> PipelineOptionsBuilder {
        PipelineOptionsBuilder::default()
    }
}

/// Builder for [`PipelineOptions`]; validation happens in [`PipelineOptionsBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct PipelineOptionsBuilder {
    allow_list: Vec<String>,
    block_list: Vec<String>,
    include_ddls: bool,
    include_table_counts: bool,
    hydration_concurrency: Option<usize>,
}

impl PipelineOptionsBuilder {
    #[must_use]
    pub fn allow_list<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_list = tables.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn block_list<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.block_list = tables.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn include_ddls(mut self, include: bool) -> Self {
        self.include_ddls = include;
        self
    }

    #[must_use]
    pub fn include_table_counts(mut self, include: bool) -> Self {
        self.include_table_counts = include;
        self
    }

    #[must_use]
    pub fn hydration_concurrency(mut self, limit: usize) -> Self {
        self.hydration_concurrency = Some(limit);
        self
    }

    /// # Errors
    ///
    /// Returns [`ScanError::PolicyConfig`] when the allow and block lists
    /// overlap, and [`ScanError::Config`] for a zero concurrency limit.
    pub fn build(self) -> Result<PipelineOptions> {
        let policy = PolicyFilter::new(self.allow_list, self.block_list)?;
        let hydration_concurrency = self
            .hydration_concurrency
            .unwrap_or(DEFAULT_HYDRATION_CONCURRENCY);
        if hydration_concurrency == 0 {
            return Err(ScanError::Config(
                "hydration concurrency must be at least 1".to_owned(),
            ));
        }

        Ok(PipelineOptions {
            policy,
            include_ddls: self.include_ddls,
            include_table_counts: self.include_table_counts,
            hydration_concurrency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let options = PipelineOptions::builder().build().unwrap();
        assert_eq!(options, PipelineOptions::default());
        assert!(options.policy.is_allowed("anything"));
    }

    #[test]
    fn test_builder_rejects_overlap() {
        let err = PipelineOptions::builder()
            .allow_list(["users", "orders"])
            .block_list(["orders"])
            .build()
            .unwrap_err();
        assert!(matches!(err, ScanError::PolicyConfig(_)));
    }

    #[test]
    fn test_builder_rejects_zero_concurrency() {
        assert!(PipelineOptions::builder().hydration_concurrency(0).build().is_err());
    }

    #[test]
    fn test_target_paths() {
        let target = DatasetTarget::new("p", "shop").unwrap();
        assert_eq!(target.dataset_suffix(), "/projects/p/datasets/shop");
        assert_eq!(target.table_marker(), "/projects/p/datasets/shop/tables/");
        assert_eq!(target.sql_table_name("orders"), "p.shop.orders");
        assert!(DatasetTarget::new("p", "").is_err());
        assert!(DatasetTarget::new("p", "a/b").is_err());
    }
}
