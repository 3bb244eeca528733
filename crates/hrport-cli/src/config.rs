use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Defaults read from `--config`; command line flags win over every value here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    pub template: Option<PathBuf>,
    /// Bundled report id or path to a manifest YAML file.
    pub manifest: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub persist_log: Option<bool>,
    pub cache_templates: Option<bool>,
}

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: ReportConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        // relative paths are taken relative to the config file
        let base = path.parent().unwrap_or(Path::new("."));
        let manifest = config.manifest.map(|report| {
            if hrport_spec::bundled_yaml(&report).is_some() {
                report
            } else {
                base.join(report).to_string_lossy().into_owned()
            }
        });
        Ok(ReportConfig {
            template: config.template.map(|p| base.join(p)),
            output_dir: config.output_dir.map(|p| base.join(p)),
            manifest,
            ..config
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_against_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hrport.yaml");
        std::fs::write(
            &path,
            "template: templates/tracker.xlsx\nmanifest: biweekly-tracker\npersist_log: true\n",
        )
        .unwrap();

        let config = ReportConfig::load(&path).unwrap();
        assert_eq!(
            config.template,
            Some(dir.path().join("templates/tracker.xlsx"))
        );
        assert_eq!(config.manifest.as_deref(), Some("biweekly-tracker"));
        assert_eq!(config.persist_log, Some(true));
        assert!(config.output_dir.is_none());

        std::fs::write(
            &path,
            "manifest: reports/custom.yaml\noutput_dir: out\n",
        )
        .unwrap();
        let config = ReportConfig::load(&path).unwrap();
        let expected = dir.path().join("reports/custom.yaml");
        assert_eq!(config.manifest.as_deref(), expected.to_str());
        assert_eq!(config.output_dir, Some(dir.path().join("out")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hrport.yaml");
        std::fs::write(&path, "templat: x.xlsx\n").unwrap();
        assert!(ReportConfig::load(&path).is_err());
    }
}
