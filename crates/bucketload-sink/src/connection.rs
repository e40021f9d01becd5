//! Database connection settings.
//!
//! [`ConnectionConfig`] is an explicit value handed to
//! [`PostgresSink::connect`](crate::PostgresSink::connect). Reading it from
//! the environment is a convenience for the CLI, not something the sink does.

use std::fmt;

use crate::error::{self, SinkError};

pub const SERVER_VAR: &str = "BUCKETLOAD_DB_SERVER";
pub const DATABASE_VAR: &str = "BUCKETLOAD_DB_NAME";
pub const USER_VAR: &str = "BUCKETLOAD_DB_USER";
pub const PASSWORD_VAR: &str = "BUCKETLOAD_DB_PASSWORD";

const DEFAULT_PORT: u16 = 5432;

/// Server address, database and optional credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// `host` or `host:port` (`[v6addr]:port` for IPv6).
    pub server: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ConnectionConfig {
    /// Read `BUCKETLOAD_DB_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::MissingEnv`] if the server or database is unset.
    pub fn from_env() -> error::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::MissingEnv`] if the server or database is unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> error::Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Ok(Self {
            server: get(SERVER_VAR).ok_or(SinkError::MissingEnv(SERVER_VAR))?,
            database: get(DATABASE_VAR).ok_or(SinkError::MissingEnv(DATABASE_VAR))?,
            user: get(USER_VAR),
            password: get(PASSWORD_VAR),
        })
    }

    /// Split `server` into host and port.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Config`] for an unparsable port.
    pub fn host_port(&self) -> error::Result<(String, u16)> {
        let server = self.server.trim();
        let parse_port = |p: &str| {
            p.parse::<u16>()
                .map_err(|_| SinkError::Config(format!("invalid port '{p}' in server '{server}'")))
        };

        if let Some(rest) = server.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| SinkError::Config(format!("unterminated '[' in server '{server}'")))?;
            let port = match tail.strip_prefix(':') {
                Some(p) => parse_port(p)?,
                None => DEFAULT_PORT,
            };
            return Ok((host.to_string(), port));
        }

        match server.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => Ok((host.to_string(), parse_port(port)?)),
            _ => Ok((server.to_string(), DEFAULT_PORT)),
        }
    }

    /// Login name to present: the configured user, else the OS login name
    /// (trusted/peer authentication).
    fn effective_user(&self) -> Option<String> {
        self.user
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
    }

    /// Translate into a `postgres` client configuration.
    ///
    /// The password is only sent when both user and password are configured.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Config`] for a bad server address or when no login
    /// name can be determined.
    pub fn pg_config(&self) -> error::Result<postgres::Config> {
        let (host, port) = self.host_port()?;
        let user = self
            .effective_user()
            .ok_or_else(|| SinkError::Config("no database user configured".into()))?;

        let mut pg = postgres::Config::new();
        pg.host(&host);
        pg.port(port);
        pg.dbname(&self.database);
        pg.user(&user);
        if let (Some(_), Some(password)) = (&self.user, &self.password) {
            pg.password(password);
        }
        Ok(pg)
    }
}
