//! Feature dispatch
//!
//! This module provides the public API for screen feature extraction. It runs
//! a selection of features over the raw tables and column-concatenates their
//! results into one table indexed by (user, window start).

use crate::config::ScreenConfig;
use crate::encoder::ReportEncoder;
use crate::error::ScreenError;
use crate::features::{PreparedTimeline, ScreenFeature};
use crate::schema::{RawRecord, TableAdapter};
use crate::table::FeatureTable;
use serde_json::Value;
use std::collections::HashMap;

/// One feature to compute and its configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRequest {
    pub feature: ScreenFeature,
    pub config: ScreenConfig,
}

impl FeatureRequest {
    /// Request a feature with the default configuration
    pub fn new(feature: ScreenFeature) -> Self {
        Self {
            feature,
            config: ScreenConfig::default(),
        }
    }

    pub fn with_config(feature: ScreenFeature, config: ScreenConfig) -> Self {
        Self { feature, config }
    }
}

/// Every registered feature with the default configuration
pub fn default_requests() -> Vec<FeatureRequest> {
    ScreenFeature::ALL
        .into_iter()
        .map(FeatureRequest::new)
        .collect()
}

/// Parse a JSON mapping of feature name → configuration mapping.
///
/// Order of the mapping is preserved. All names and configurations are
/// checked before anything is computed.
pub fn parse_feature_selection(selection: &Value) -> Result<Vec<FeatureRequest>, ScreenError> {
    let map = selection.as_object().ok_or_else(|| {
        ScreenError::InputType("feature selection is not a mapping".to_string())
    })?;

    let features = map
        .keys()
        .map(|name| ScreenFeature::from_name(name))
        .collect::<Result<Vec<_>, _>>()?;

    features
        .into_iter()
        .zip(map.values())
        .map(|(feature, config)| {
            Ok(FeatureRequest::with_config(
                feature,
                ScreenConfig::from_value(config)?,
            ))
        })
        .collect()
}

/// Compute the selected features (all of them when `requests` is `None`).
///
/// Each feature recomputes the merge/classify/duration chain from the raw
/// tables. An empty selection computes nothing.
pub fn extract_features_screen(
    screen: &[RawRecord],
    battery: &[RawRecord],
    requests: Option<&[FeatureRequest]>,
) -> Result<FeatureTable, ScreenError> {
    ScreenProcessor::new().extract(screen, battery, requests)
}

/// Compute features from JSON tables and return a JSON report (stateless, one-shot).
///
/// # Arguments
/// * `screen_json` - Screen table as a JSON array of rows
/// * `battery_json` - Battery table as a JSON array of rows (may be `[]`)
/// * `features_json` - Optional feature selection mapping; all features when `None`
///
/// # Example
/// ```ignore
/// let report = screen_features_to_json(screen_json, "[]", None)?;
/// ```
pub fn screen_features_to_json(
    screen_json: &str,
    battery_json: &str,
    features_json: Option<&str>,
) -> Result<String, ScreenError> {
    ScreenProcessor::new().extract_json(screen_json, battery_json, features_json)
}

/// Cache key for prepared timelines: only the column names affect preparation
type PreparedKey = (String, String);

/// Feature processor with optional memoization of the prepared timeline.
///
/// Memoized and non-memoized runs produce identical tables; the cache only
/// lives for one `extract` call.
#[derive(Debug, Clone, Default)]
pub struct ScreenProcessor {
    memoize: bool,
}

impl ScreenProcessor {
    /// Processor that recomputes the chain for every feature
    pub fn new() -> Self {
        Self { memoize: false }
    }

    /// Processor that prepares the timeline once per distinct column configuration
    pub fn with_memoization() -> Self {
        Self { memoize: true }
    }

    pub fn extract(
        &self,
        screen: &[RawRecord],
        battery: &[RawRecord],
        requests: Option<&[FeatureRequest]>,
    ) -> Result<FeatureTable, ScreenError> {
        let defaults;
        let requests = match requests {
            Some(requests) => requests,
            None => {
                defaults = default_requests();
                &defaults
            }
        };

        let mut cache: HashMap<PreparedKey, PreparedTimeline> = HashMap::new();
        let mut result = FeatureTable::new();

        for request in requests {
            log::info!("computing {}...", request.feature.name());

            let table = if self.memoize {
                let key = (
                    request.config.screen_column_name.clone(),
                    request.config.battery_column_name.clone(),
                );
                let prepared = match cache.entry(key) {
                    std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
                    std::collections::hash_map::Entry::Vacant(entry) => {
                        entry.insert(PreparedTimeline::build(screen, battery, &request.config)?)
                    }
                };
                request.feature.compute_prepared(prepared, &request.config)?
            } else {
                request.feature.compute(screen, battery, &request.config)?
            };

            result = result.concat(table);
        }

        Ok(result)
    }

    /// Compute features from JSON tables and encode the result as a JSON report
    pub fn extract_json(
        &self,
        screen_json: &str,
        battery_json: &str,
        features_json: Option<&str>,
    ) -> Result<String, ScreenError> {
        let screen = TableAdapter::parse_array(screen_json)?;
        let battery = TableAdapter::parse_array(battery_json)?;

        let requests = match features_json {
            Some(json) => parse_feature_selection(&serde_json::from_str(json)?)?,
            None => default_requests(),
        };

        let table = self.extract(&screen, &battery, Some(&requests))?;
        let features: Vec<ScreenFeature> = requests.iter().map(|r| r.feature).collect();
        ReportEncoder::new().encode_to_json(&table, &features)
    }
}
