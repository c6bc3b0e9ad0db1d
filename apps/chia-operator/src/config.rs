use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context as _, Result};
use chia_api::consts;
use jsonschema::{validator_for, Validator};
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "CHIA_OPERATOR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "configs/operator.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OperatorConfig {
    /// Restrict every controller to one namespace; all namespaces when unset.
    pub watch_namespace: Option<String>,
    pub http: HttpConfig,
    pub reconcile: ReconcileConfig,
    pub images: ImageDefaults,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Address serving `/metrics`, `/healthz` and `/readyz`.
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Resources reconciled in parallel per kind; 0 means unbounded.
    pub concurrency: u16,
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
    /// Delay before retrying a status write rejected for a stale resourceVersion.
    pub status_conflict_requeue_secs: u64,
    /// Poll interval while a resource converged but is not ready yet.
    pub not_ready_requeue_secs: u64,
    /// Periodic re-reconcile of ready resources.
    pub resync_secs: u64,
    /// Write Kubernetes Events for failures and readiness; off drops them.
    pub publish_events: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            backoff_base_secs: 5,
            backoff_max_secs: 300,
            status_conflict_requeue_secs: 5,
            not_ready_requeue_secs: 10,
            resync_secs: 600,
            publish_events: true,
        }
    }
}

impl ReconcileConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }
}

/// Images used when a resource does not name one.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ImageDefaults {
    pub chia: String,
    pub chia_exporter: String,
    pub chia_healthcheck: String,
    pub ca_gen: String,
}

impl Default for ImageDefaults {
    fn default() -> Self {
        Self {
            chia: consts::DEFAULT_CHIA_IMAGE.into(),
            chia_exporter: consts::DEFAULT_CHIA_EXPORTER_IMAGE.into(),
            chia_healthcheck: consts::DEFAULT_CHIA_HEALTHCHECK_IMAGE.into(),
            ca_gen: consts::DEFAULT_CA_GEN_IMAGE.into(),
        }
    }
}

static CONFIG_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema = schemars::schema_for!(OperatorConfig);
    let schema_value = serde_json::to_value(&schema).expect("schema value");
    validator_for(&schema_value).expect("valid schema")
});

pub fn load_config(path: &Path) -> Result<OperatorConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let raw: toml::Value = toml::from_str(&content)?;
    let json_value = serde_json::to_value(&raw)?;
    let validation_errors: Vec<_> = CONFIG_SCHEMA
        .iter_errors(&json_value)
        .map(|e| e.to_string())
        .collect();
    if !validation_errors.is_empty() {
        return Err(anyhow::anyhow!(
            "{}: {}",
            path.display(),
            validation_errors.join(", ")
        ));
    }
    let cfg: OperatorConfig = toml::from_str(&content)?;
    Ok(cfg)
}

/// Resolve the config file (explicit path, `CHIA_OPERATOR_CONFIG`, then the
/// default path if it exists), then apply environment overrides.
pub fn load(explicit: Option<&Path>) -> Result<OperatorConfig> {
    let from_env = std::env::var(CONFIG_ENV).ok().filter(|v| !v.is_empty());
    let mut cfg = match (explicit, from_env) {
        (Some(path), _) => load_config(path)?,
        (None, Some(path)) => load_config(Path::new(&path))?,
        (None, None) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_config(Path::new(DEFAULT_CONFIG_PATH))?
        }
        (None, None) => OperatorConfig::default(),
    };
    apply_env_overrides(&mut cfg)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut OperatorConfig) -> Result<()> {
    if let Ok(ns) = std::env::var("CHIA_OPERATOR_WATCH_NAMESPACE") {
        cfg.watch_namespace = Some(ns).filter(|v| !v.trim().is_empty());
    }
    if let Ok(bind) = std::env::var("CHIA_OPERATOR_HTTP_BIND") {
        cfg.http.bind = bind;
    }
    if let Ok(raw) = std::env::var("CHIA_OPERATOR_CONCURRENCY") {
        cfg.reconcile.concurrency = raw
            .trim()
            .parse()
            .with_context(|| format!("invalid CHIA_OPERATOR_CONCURRENCY: {raw}"))?;
    }
    Ok(())
}

fn validate(cfg: &OperatorConfig) -> Result<()> {
    cfg.http
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid http.bind: {}", cfg.http.bind))?;
    if cfg.reconcile.backoff_base_secs == 0 {
        anyhow::bail!("reconcile.backoff_base_secs must be greater than zero");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env;
    use serial_test::serial;
    use std::io::Write as _;

    const ENV_KEYS: &[&str] = &[
        CONFIG_ENV,
        "CHIA_OPERATOR_WATCH_NAMESPACE",
        "CHIA_OPERATOR_HTTP_BIND",
        "CHIA_OPERATOR_CONCURRENCY",
    ];

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(body.as_bytes()).expect("write config");
        file
    }

    #[test]
    #[serial]
    fn defaults_without_file() {
        let mut guard = env::guard();
        guard.clear_keys(ENV_KEYS);
        let cfg = load(None).expect("defaults");
        assert_eq!(cfg, OperatorConfig::default());
        assert_eq!(cfg.reconcile.backoff_base(), Duration::from_secs(5));
        assert_eq!(cfg.reconcile.backoff_max(), Duration::from_secs(300));
    }

    #[test]
    #[serial]
    fn file_values_are_read() {
        let mut guard = env::guard();
        guard.clear_keys(ENV_KEYS);
        let file = write_config(
            r#"
watch_namespace = "chia"

[reconcile]
concurrency = 8
backoff_max_secs = 60

[images]
chia = "ghcr.io/chia-network/chia:2.5.0"
"#,
        );
        let cfg = load(Some(file.path())).expect("config");
        assert_eq!(cfg.watch_namespace.as_deref(), Some("chia"));
        assert_eq!(cfg.reconcile.concurrency, 8);
        assert_eq!(cfg.reconcile.backoff_max_secs, 60);
        assert_eq!(cfg.reconcile.backoff_base_secs, 5);
        assert_eq!(cfg.images.chia, "ghcr.io/chia-network/chia:2.5.0");
        assert_eq!(cfg.images.ca_gen, consts::DEFAULT_CA_GEN_IMAGE);
    }

    #[test]
    #[serial]
    fn schema_rejects_unknown_and_mistyped_keys() {
        let mut guard = env::guard();
        guard.clear_keys(ENV_KEYS);
        let file = write_config("[reconcile]\nconcurency = 2\n");
        assert!(load(Some(file.path())).is_err());
        let file = write_config("[reconcile]\nconcurrency = \"many\"\n");
        assert!(load(Some(file.path())).is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_file() {
        let mut guard = env::guard();
        guard.clear_keys(ENV_KEYS);
        let file = write_config("watch_namespace = \"chia\"\n");
        guard.set(CONFIG_ENV, file.path().to_str().expect("utf8 path"));
        guard.set("CHIA_OPERATOR_WATCH_NAMESPACE", "mainnet");
        guard.set("CHIA_OPERATOR_HTTP_BIND", "127.0.0.1:9000");
        guard.set("CHIA_OPERATOR_CONCURRENCY", "2");
        let cfg = load(None).expect("config");
        assert_eq!(cfg.watch_namespace.as_deref(), Some("mainnet"));
        assert_eq!(cfg.http.bind, "127.0.0.1:9000");
        assert_eq!(cfg.reconcile.concurrency, 2);
    }

    #[test]
    #[serial]
    fn invalid_overrides_fail() {
        let mut guard = env::guard();
        guard.clear_keys(ENV_KEYS);
        guard.set("CHIA_OPERATOR_CONCURRENCY", "lots");
        assert!(load(None).is_err());
        guard.set("CHIA_OPERATOR_CONCURRENCY", "1");
        guard.set("CHIA_OPERATOR_HTTP_BIND", "not an address");
        assert!(load(None).is_err());
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs/operator.toml");
        let cfg = load_config(&path).expect("shipped config");
        assert_eq!(cfg, OperatorConfig::default());
    }
}
