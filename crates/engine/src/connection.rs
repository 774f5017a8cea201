//! SQL connection seam
//!
//! The recovery core never links a database driver. Components receive a
//! [`Connector`] at construction and open one short-lived [`Connection`] per
//! attempt; connections are never pooled or shared between units of work.

use std::fmt;

use segrecover_core::Result;

/// Database the source-side checkpoint connects to.
pub const BOOTSTRAP_DATABASE: &str = "template1";

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbEndpoint {
    /// Host name or address
    pub host: String,
    /// Port
    pub port: u16,
    /// Database name
    pub database: String,
}

impl DbEndpoint {
    /// Build an endpoint.
    pub fn new(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        DbEndpoint {
            host: host.into(),
            port,
            database: database.into(),
        }
    }
}

impl fmt::Display for DbEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Session flavour requested from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionMode {
    /// Administrative session that talks to a single instance only
    Utility,
    /// Ordinary client session
    Default,
}

/// An open session.
pub trait Connection: Send {
    /// Execute one statement, discarding any rows.
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Release the session. Must be safe to call more than once.
    fn close(&mut self);
}

/// Factory for sessions.
///
/// Driver and transport failures are reported as
/// [`segrecover_core::Error::Connection`].
pub trait Connector: Send + Sync {
    /// Open a session to `endpoint`.
    fn connect(&self, endpoint: &DbEndpoint, mode: ConnectionMode) -> Result<Box<dyn Connection>>;
}

/// RAII guard that closes the wrapped connection on drop.
///
/// Early returns via `?` between open and close still release the session.
pub struct ConnectionGuard {
    conn: Box<dyn Connection>,
}

impl ConnectionGuard {
    /// Take ownership of an open connection.
    pub fn new(conn: Box<dyn Connection>) -> Self {
        ConnectionGuard { conn }
    }

    /// Execute one statement on the guarded connection.
    pub fn execute(&mut self, sql: &str) -> Result<()> {
        self.conn.execute(sql)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.conn.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use segrecover_core::Error;
    use std::sync::Arc;

    struct Recording {
        log: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
    }

    impl Connection for Recording {
        fn execute(&mut self, sql: &str) -> Result<()> {
            self.log.lock().push(sql.to_string());
            if self.fail_on == Some(sql) {
                return Err(Error::connection("server closed the connection"));
            }
            Ok(())
        }

        fn close(&mut self) {
            self.log.lock().push("close".to_string());
        }
    }

    #[test]
    fn test_guard_closes_on_drop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let mut guard = ConnectionGuard::new(Box::new(Recording {
                log: Arc::clone(&log),
                fail_on: None,
            }));
            guard.execute("CHECKPOINT").unwrap();
        }
        assert_eq!(*log.lock(), vec!["CHECKPOINT", "close"]);
    }

    #[test]
    fn test_guard_closes_after_failed_statement() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let run = || -> Result<()> {
            let mut guard = ConnectionGuard::new(Box::new(Recording {
                log: Arc::clone(&log),
                fail_on: Some("BEGIN"),
            }));
            guard.execute("BEGIN")?;
            guard.execute("COMMIT")
        };
        assert!(run().is_err());
        assert_eq!(*log.lock(), vec!["BEGIN", "close"]);
    }

    #[test]
    fn test_endpoint_display() {
        let endpoint = DbEndpoint::new("sdw1", 40000, BOOTSTRAP_DATABASE);
        assert_eq!(endpoint.to_string(), "sdw1:40000/template1");
    }
}
