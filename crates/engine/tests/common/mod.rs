//! Fakes shared by the engine integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use segrecover_core::{CommandResult, Error, RecoveryDescriptor, Result};
use segrecover_engine::{Clock, Connection, ConnectionMode, Connector, DbEndpoint, HostCommandRunner};

/// Everything the fake connector observed.
#[derive(Debug, Default)]
pub struct ConnLog {
    pub connects: Vec<(DbEndpoint, ConnectionMode)>,
    pub statements: Vec<String>,
    pub closes: usize,
}

/// Decides the outcome of each `connect` call (0-based attempt number).
pub type ConnectPlan = Box<dyn Fn(usize) -> Result<()> + Send + Sync>;

/// Decides the outcome of each executed statement.
pub type ExecutePlan = Box<dyn Fn(&str) -> Result<()> + Send + Sync>;

pub struct FakeConnector {
    pub log: Arc<Mutex<ConnLog>>,
    attempts: AtomicUsize,
    on_connect: ConnectPlan,
    on_execute: Arc<ExecutePlan>,
    clock: Option<Arc<ManualClock>>,
    advance_per_connect: Duration,
}

impl FakeConnector {
    pub fn ok() -> Self {
        Self::with_plan(Box::new(|_| Ok(())))
    }

    pub fn failing(msg: &'static str) -> Self {
        Self::with_plan(Box::new(move |_| Err(Error::connection(msg))))
    }

    pub fn with_plan(on_connect: ConnectPlan) -> Self {
        FakeConnector {
            log: Arc::new(Mutex::new(ConnLog::default())),
            attempts: AtomicUsize::new(0),
            on_connect,
            on_execute: Arc::new(Box::new(|_| Ok(()))),
            clock: None,
            advance_per_connect: Duration::ZERO,
        }
    }

    pub fn on_execute(mut self, plan: ExecutePlan) -> Self {
        self.on_execute = Arc::new(plan);
        self
    }

    /// Advance `clock` by `step` on every connect attempt.
    pub fn advancing(mut self, clock: Arc<ManualClock>, step: Duration) -> Self {
        self.clock = Some(clock);
        self.advance_per_connect = step;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    fn connect(&self, endpoint: &DbEndpoint, mode: ConnectionMode) -> Result<Box<dyn Connection>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(clock) = &self.clock {
            clock.advance(self.advance_per_connect);
        }
        self.log.lock().connects.push((endpoint.clone(), mode));
        (self.on_connect)(attempt)?;
        Ok(Box::new(FakeConnection {
            log: Arc::clone(&self.log),
            on_execute: Arc::clone(&self.on_execute),
        }))
    }
}

struct FakeConnection {
    log: Arc<Mutex<ConnLog>>,
    on_execute: Arc<ExecutePlan>,
}

impl Connection for FakeConnection {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.log.lock().statements.push(sql.to_string());
        (self.on_execute)(sql)
    }

    fn close(&mut self) {
        self.log.lock().closes += 1;
    }
}

/// Runner recording every command line; fails when `rc` is non-zero.
#[derive(Default)]
pub struct RecordingRunner {
    pub commands: Mutex<Vec<String>>,
    pub rc: i32,
}

impl RecordingRunner {
    pub fn failing() -> Self {
        RecordingRunner {
            commands: Mutex::new(Vec::new()),
            rc: 1,
        }
    }
}

impl HostCommandRunner for RecordingRunner {
    fn run(&self, _name: &str, cmd_str: &str) -> CommandResult {
        self.commands.lock().push(cmd_str.to_string());
        CommandResult::new(self.rc, "", if self.rc == 0 { "" } else { "rm: permission denied" })
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(ManualClock {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

pub fn descriptor(dbid: u32, datadir: impl Into<PathBuf>, full: bool, differential: bool) -> RecoveryDescriptor {
    RecoveryDescriptor {
        target_datadir: datadir.into(),
        target_port: 50000 + dbid as u16,
        target_dbid: dbid,
        source_hostname: "sdw1".to_string(),
        source_port: 40000,
        source_datadir: PathBuf::from("/data/primary0"),
        is_full_recovery: full,
        is_differential_recovery: differential,
        progress_file: PathBuf::from(format!("/tmp/progress_file{}", dbid)),
    }
}
