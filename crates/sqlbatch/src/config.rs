//! Connection configuration and the connection factory.
//!
//! A [`ConnectionConfig`] can be deserialized from JSON, parsed from a URL
//! such as `mysql://root:secret@db:3306/app` or `sqlite:data.db`, or built
//! field by field. Unset fields fall back to a local MySQL server.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use sqlbatch_core::Dialect;
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use tracing::info;
use url::Url;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::mysql::MySqlConnection;
use crate::session::{Session, SessionOptions};
use crate::sqlite::SqliteConnection;

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Driver name: `mysql` or `sqlite`.
    pub driver: String,
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name, or the file path for SQLite (`:memory:` for a
    /// private in-memory database).
    pub database: String,
    /// User name.
    #[serde(alias = "username")]
    pub user: String,
    /// Password.
    pub password: String,
    /// Connection character set.
    pub charset: String,
    /// Extra driver options.
    pub options: BTreeMap<String, String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            driver: String::from("mysql"),
            host: String::from("127.0.0.1"),
            port: 3306,
            database: String::from("defaultdb"),
            user: String::from("root"),
            password: String::new(),
            charset: String::from("utf8"),
            options: BTreeMap::new(),
        }
    }
}

impl ConnectionConfig {
    /// Configuration for a SQLite database at `path`.
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            driver: String::from("sqlite"),
            database: path.into(),
            ..Self::default()
        }
    }

    /// Parses a `mysql://` or `sqlite:` URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = url.trim();
        if let Some(rest) = url.strip_prefix("sqlite:") {
            let path = rest.strip_prefix("//").unwrap_or(rest);
            let path = match path {
                "" | ":memory:" | "memory:" => ":memory:",
                other => other.split('?').next().unwrap_or(other),
            };
            return Ok(Self::sqlite(path));
        }

        let parsed = Url::parse(url)
            .map_err(|e| Error::Configuration(format!("invalid connection url '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "mysql" | "mariadb") {
            return Err(Error::Configuration(format!(
                "unsupported connection url '{url}'"
            )));
        }

        let mut config = Self::default();
        if !parsed.username().is_empty() {
            config.user = decode_component(parsed.username())?;
        }
        if let Some(password) = parsed.password() {
            config.password = decode_component(password)?;
        }
        if let Some(host) = parsed.host_str().filter(|h| !h.is_empty()) {
            config.host = host.to_string();
        }
        if let Some(port) = parsed.port() {
            config.port = port;
        }
        let database = parsed.path().trim_start_matches('/');
        if !database.is_empty() {
            config.database = decode_component(database)?;
        }
        for (key, value) in parsed.query_pairs() {
            if key == "charset" {
                config.charset = value.into_owned();
            } else {
                config.options.insert(key.into_owned(), value.into_owned());
            }
        }
        Ok(config)
    }

    /// Parses a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Reads a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Configuration(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// The dialect this configuration connects to.
    pub fn dialect(&self) -> Result<Dialect> {
        Ok(Dialect::from_driver_name(&self.driver)?)
    }

    /// Driver options for a MySQL connection.
    ///
    /// Every entry of [`options`](Self::options) must be one the driver
    /// understands; anything else is a configuration error.
    pub fn mysql_options(&self) -> Result<MySqlConnectOptions> {
        let mut options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database)
            .charset(&self.charset);
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        for (key, value) in &self.options {
            options = match key.as_str() {
                "ssl-mode" | "sslmode" => {
                    let mode = MySqlSslMode::from_str(value).map_err(|e| {
                        Error::Configuration(format!("invalid {key} '{value}': {e}"))
                    })?;
                    options.ssl_mode(mode)
                }
                "ssl-ca" | "sslca" => options.ssl_ca(value),
                "ssl-cert" => options.ssl_client_cert(value),
                "ssl-key" => options.ssl_client_key(value),
                "collation" => options.collation(value),
                "socket" => options.socket(value),
                "timezone" | "time_zone" => options.timezone(Some(value.clone())),
                "statement-cache-capacity" => {
                    let capacity = value.parse().map_err(|_| {
                        Error::Configuration(format!("invalid {key} '{value}'"))
                    })?;
                    options.statement_cache_capacity(capacity)
                }
                _ => {
                    return Err(Error::Configuration(format!(
                        "unsupported mysql option '{key}'"
                    )))
                }
            };
        }
        Ok(options)
    }
}

fn decode_component(raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| Error::Configuration(format!("invalid url component '{raw}': {e}")))
}

/// Opens a connection and wraps it in a [`Session`] with default options.
pub fn connect(config: &ConnectionConfig) -> Result<Session> {
    connect_with(config, SessionOptions::default())
}

/// Opens a connection and wraps it in a [`Session`].
pub fn connect_with(config: &ConnectionConfig, options: SessionOptions) -> Result<Session> {
    let connection: Box<dyn Connection> = match config.dialect()? {
        Dialect::Sqlite => {
            Box::new(SqliteConnection::open(&config.database).map_err(Error::Connect)?)
        }
        Dialect::MySql => Box::new(
            MySqlConnection::connect_with(&config.mysql_options()?).map_err(Error::Connect)?,
        ),
    };
    info!(
        driver = %config.driver,
        host = %config.host,
        database = %config.database,
        "Connected"
    );
    Session::from_boxed(connection, options)
}
