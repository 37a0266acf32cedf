//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in each binary (or rely on lazy Once).
use std::str::FromStr;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
/// Falls back to the crate root when the working directory has no .env.
pub fn init_env() {
    INIT.call_once(|| {
        if dotenv::dotenv().is_err() {
            let candidate = format!("{}/.env", env!("CARGO_MANIFEST_DIR"));
            let _ = dotenv::from_filename(candidate);
        }
    });
}

/// Common bootstrap for binaries: load env once and report whether the
/// storefront endpoint is configured.
pub fn bootstrap_cli(bin_name: &str) {
    init_env();

    match env_opt("CATALOG_API_URL") {
        Some(url) => info!(
            target = "bootstrap",
            bin = bin_name,
            endpoint = %redact_value("CATALOG_API_URL", &url),
            "storefront endpoint configured"
        ),
        None => warn!(
            target = "bootstrap",
            bin = bin_name,
            "CATALOG_API_URL not set; storefront requests will fail"
        ),
    }
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Get parsed value with default fallback.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Clone,
{
    init_env();
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

const SECRET_MARKERS: [&str; 4] = ["PASSWORD", "SECRET", "TOKEN", "KEY"];

/// Printable form of a config value: secrets vanish entirely; endpoint URLs
/// have their credentials and query string masked.
fn redact_value(key: &str, val: &str) -> String {
    let upper = key.to_ascii_uppercase();
    if SECRET_MARKERS.iter().any(|m| upper.contains(m)) {
        return "***".to_string();
    }
    let val = val.trim();
    match url::Url::parse(val) {
        Ok(mut endpoint) if matches!(endpoint.scheme(), "http" | "https") => {
            if !endpoint.username().is_empty() {
                let _ = endpoint.set_username("***");
            }
            if endpoint.password().is_some() {
                let _ = endpoint.set_password(Some("***"));
            }
            if endpoint.query().is_some() {
                endpoint.set_query(Some("***"));
            }
            endpoint.to_string()
        }
        _ => val.to_string(),
    }
}

/// Log a redacted snapshot of `also_log` under `title`, then fail if any key
/// in `required` is unset or blank.
pub fn preflight_check(title: &str, required: &[&str], also_log: &[&str]) -> anyhow::Result<()> {
    init_env();
    let snapshot: Vec<(&str, String)> = also_log
        .iter()
        .map(|&key| {
            let shown = env_opt(key)
                .map(|v| redact_value(key, &v))
                .unwrap_or_else(|| "<unset>".to_string());
            (key, shown)
        })
        .collect();
    info!(target = "preflight", title, snapshot = ?snapshot, "configuration snapshot");

    let missing: Vec<&str> = required.iter().copied().filter(|k| env_opt(k).is_none()).collect();
    anyhow::ensure!(missing.is_empty(), "{title}: missing required env {}", missing.join(", "));
    Ok(())
}
