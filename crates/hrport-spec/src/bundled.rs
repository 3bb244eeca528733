//! Report variants shipped with the crate.

use crate::manifest::Manifest;

const EXECUTIVE_SUMMARY: &str = include_str!("../manifests/executive-summary.yaml");
const HR_METRICS: &str = include_str!("../manifests/hr-metrics.yaml");
const BIWEEKLY_TRACKER: &str = include_str!("../manifests/biweekly-tracker.yaml");

/// Ids of the bundled report variants, in display order.
pub const BUNDLED_REPORTS: &[&str] = &["executive-summary", "hr-metrics", "biweekly-tracker"];

/// Raw YAML of a bundled report.
pub fn bundled_yaml(id: &str) -> Option<&'static str> {
    match id {
        "executive-summary" => Some(EXECUTIVE_SUMMARY),
        "hr-metrics" => Some(HR_METRICS),
        "biweekly-tracker" => Some(BIWEEKLY_TRACKER),
        _ => None,
    }
}

/// Parse a bundled report; `None` for unknown ids.
pub fn bundled(id: &str) -> Option<Result<Manifest, serde_yaml::Error>> {
    bundled_yaml(id).map(Manifest::from_yaml_str)
}
