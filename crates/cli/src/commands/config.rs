use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use memoreg_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let mut push = |key: &str, value: &str, env_key: &str| {
        lines.push(render_line(
            key,
            value,
            field_source(key, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    };

    push("database.url", &config.database.url, "MEMOREG_DATABASE_URL");
    push(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        "MEMOREG_DATABASE_MAX_CONNECTIONS",
    );
    push(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        "MEMOREG_DATABASE_TIMEOUT_SECS",
    );

    push("server.bind_address", &config.server.bind_address, "MEMOREG_SERVER_BIND_ADDRESS");
    push("server.port", &config.server.port.to_string(), "MEMOREG_SERVER_PORT");
    push(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        "MEMOREG_SERVER_HEALTH_CHECK_PORT",
    );

    push(
        "rendering.organization_name",
        &config.rendering.organization_name,
        "MEMOREG_RENDERING_ORGANIZATION_NAME",
    );
    push(
        "rendering.organization_abbr",
        &config.rendering.organization_abbr,
        "MEMOREG_RENDERING_ORGANIZATION_ABBR",
    );
    push(
        "rendering.signature_dir",
        &config.rendering.signature_dir.display().to_string(),
        "MEMOREG_RENDERING_SIGNATURE_DIR",
    );
    push(
        "rendering.fetch_timeout_secs",
        &config.rendering.fetch_timeout_secs.to_string(),
        "MEMOREG_RENDERING_FETCH_TIMEOUT_SECS",
    );

    push("logging.level", &config.logging.level, "MEMOREG_LOGGING_LEVEL");
    push("logging.format", &format!("{:?}", config.logging.format), "MEMOREG_LOGGING_FORMAT");

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("memoreg.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/memoreg.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
