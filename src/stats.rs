//! Timestamped run statistics and chart-series export.

use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::{Map, Value, json};

use crate::report::DataSummary;
use crate::store::DataStore;

/// Hook for counting emitted metadata. Real accounting is not wired up yet;
/// the default reports the historical placeholder value.
pub trait MetadataCounter: Sync {
    fn count(&self, summary: &DataSummary) -> i64;
}

pub struct PlaceholderMetadataCounter;

impl MetadataCounter for PlaceholderMetadataCounter {
    fn count(&self, _summary: &DataSummary) -> i64 {
        42
    }
}

/// Statistics facade over the persistent store.
pub struct StatsStore<'a> {
    db: &'a dyn DataStore,
}

impl<'a> StatsStore<'a> {
    pub fn new(db: &'a dyn DataStore) -> Self {
        Self { db }
    }

    /// Append one aggregate sample under the current time.
    pub fn add_statistics(
        &self,
        summary: &DataSummary,
        counter: &dyn MetadataCounter,
    ) -> Result<()> {
        self.db.add_statistics(json!({
            "suite": summary.suite,
            "section": summary.section,
            "totalInfos": summary.total_infos,
            "totalWarnings": summary.total_warnings,
            "totalErrors": summary.total_errors,
            "totalMetadata": counter.count(summary),
        }))
    }

    pub fn statistics(&self) -> Result<BTreeMap<i64, Value>> {
        self.db.get_statistics()
    }

    /// Export all samples as chart series, grouped by suite and section:
    /// `{suite: {section: {metric: [{x, y}, ...]}}}` with each series sorted
    /// ascending by `x`.
    pub fn export_series(&self) -> Result<Value> {
        const METRICS: &[(&str, &str)] = &[
            ("infos", "totalInfos"),
            ("warnings", "totalWarnings"),
            ("errors", "totalErrors"),
            ("metadata", "totalMetadata"),
        ];

        let mut grouped: BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<(i64, i64)>>>> =
            BTreeMap::new();
        for (ts, blob) in self.db.get_statistics()? {
            let (Some(suite), Some(section)) = (
                blob.get("suite").and_then(Value::as_str),
                blob.get("section").and_then(Value::as_str),
            ) else {
                continue;
            };
            for (metric, field) in METRICS {
                if let Some(y) = blob.get(*field).and_then(Value::as_i64) {
                    grouped
                        .entry(suite.to_string())
                        .or_default()
                        .entry(section.to_string())
                        .or_default()
                        .entry(metric.to_string())
                        .or_default()
                        .push((ts, y));
                }
            }
        }

        let mut out = Map::new();
        for (suite, sections) in grouped {
            let mut suite_map = Map::new();
            for (section, metrics) in sections {
                let mut section_map = Map::new();
                for (metric, mut points) in metrics {
                    points.sort_by_key(|&(x, _)| x);
                    let series: Vec<Value> =
                        points.iter().map(|&(x, y)| json!({"x": x, "y": y})).collect();
                    section_map.insert(metric, Value::Array(series));
                }
                suite_map.insert(section, Value::Object(section_map));
            }
            out.insert(suite, Value::Object(suite_map));
        }
        Ok(Value::Object(out))
    }
}
