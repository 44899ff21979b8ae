//! Runtime settings.
//!
//! Resolved in three layers: built-in defaults, an optional TOML file, then
//! `ORDERDESK_*` environment variables.

use crate::lookup::LookupColumns;
use crate::order::OrderDefaults;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Config file read when no path is given explicitly.
pub const DEFAULT_CONFIG_FILE: &str = "orderdesk.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_addr: String,
    pub lookup_path: PathBuf,
    pub lookup_columns: LookupColumns,
    /// Where exported CSV files are written before they are emailed.
    pub output_dir: PathBuf,
    pub upload_dir: PathBuf,
    /// Suffix export file names with `_YYYYMMDD_HHMMSS`.
    pub timestamp_exports: bool,
    pub order_defaults: OrderDefaults,
    pub mail: Option<MailSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            lookup_path: PathBuf::from("data/lookup.csv"),
            lookup_columns: LookupColumns::default(),
            output_dir: PathBuf::from("order_exports"),
            upload_dir: PathBuf::from("uploaded_files"),
            timestamp_exports: true,
            order_defaults: OrderDefaults::default(),
            mail: None,
        }
    }
}

/// SMTP relay and message settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    /// Used when the user does not type a recipient.
    pub default_recipient: Option<String>,
    pub subject: String,
    pub body: String,
    pub timeout_secs: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 465,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            default_recipient: None,
            subject: "Order Data".into(),
            body: "Please find the attached order data CSV file.".into(),
            timeout_secs: 30,
        }
    }
}

impl MailSettings {
    fn is_complete(&self) -> bool {
        !self.host.is_empty()
            && !self.username.is_empty()
            && !self.password.is_empty()
            && !self.from.is_empty()
    }
}

/// Load settings from `path` (or `orderdesk.toml` if present) and the
/// process environment.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, Box<dyn std::error::Error>> {
    let settings = match path {
        Some(path) => parse_settings(&fs::read_to_string(path)?)?,
        None => match read_optional(Path::new(DEFAULT_CONFIG_FILE))? {
            Some(raw) => parse_settings(&raw)?,
            None => Settings::default(),
        },
    };

    Ok(apply_env(settings, |key| std::env::var(key).ok()))
}

/// Read `path`, treating only a missing file as absent.
fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn parse_settings(raw: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(raw)
}

/// Apply `ORDERDESK_*` overrides read through `var`.
pub fn apply_env(mut settings: Settings, var: impl Fn(&str) -> Option<String>) -> Settings {
    if let Some(v) = var("ORDERDESK_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = var("ORDERDESK_LOOKUP_PATH") {
        settings.lookup_path = PathBuf::from(v);
    }
    if let Some(v) = var("ORDERDESK_OUTPUT_DIR") {
        settings.output_dir = PathBuf::from(v);
    }
    if let Some(v) = var("ORDERDESK_UPLOAD_DIR") {
        settings.upload_dir = PathBuf::from(v);
    }
    if let Some(v) = var("ORDERDESK_TIMESTAMP_EXPORTS") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.timestamp_exports = parsed;
        }
    }
    if let Some(v) = var("ORDERDESK_DOCUMENT_TYPE") {
        settings.order_defaults.document_type = v;
    }
    if let Some(v) = var("ORDERDESK_WAREHOUSE") {
        settings.order_defaults.warehouse = v;
    }

    let mut mail = settings.mail.take().unwrap_or_default();
    if let Some(v) = var("ORDERDESK_SMTP_HOST") {
        mail.host = v;
    }
    if let Some(v) = var("ORDERDESK_SMTP_PORT") {
        if let Ok(parsed) = v.parse::<u16>() {
            mail.port = parsed;
        }
    }
    if let Some(v) = var("ORDERDESK_SMTP_USERNAME") {
        mail.username = v;
    }
    if let Some(v) = var("ORDERDESK_SMTP_PASSWORD") {
        mail.password = v;
    }
    if let Some(v) = var("ORDERDESK_SMTP_FROM") {
        mail.from = v;
    }
    if let Some(v) = var("ORDERDESK_MAIL_RECIPIENT") {
        mail.default_recipient = Some(v);
    }
    settings.mail = mail.is_complete().then_some(mail);

    settings
}
