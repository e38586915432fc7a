//! Pool configuration (spec §3 "Pool configuration"), assembled the way
//! `graph-builder::config` assembles `AppSettings`: CLI overrides
//! (`structopt`) merged over defaults (`smart-default`) through
//! `commons::MergeOptions`.

use commons::{assign_if_some, Fallible, MergeOptions};
use smart_default::SmartDefault;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;

/// Immutable pool configuration (spec §3).
#[derive(Debug, Clone, SmartDefault)]
pub struct PoolConfig {
    /// Target child count.
    #[default(4)]
    pub workers: usize,

    /// Capacity of the task queue beyond what workers can immediately
    /// service. `0` means strictly rendezvous hand-off.
    #[default(0)]
    pub max_overflow: usize,

    /// Duration between child-exit polls.
    #[default(Duration::from_millis(100))]
    pub poll_interval: Duration,
}

impl PoolConfig {
    /// Assemble configuration from defaults overlaid with CLI options.
    ///
    /// Mirrors `AppSettings::assemble`: parse CLI options, merge over
    /// defaults, then validate.
    pub fn assemble() -> Fallible<Self> {
        let cli_opts = PoolConfigOptions::from_args();
        let mut cfg = Self::default();
        cfg.try_merge(cli_opts)?;
        cfg.try_validate()
    }

    fn try_validate(self) -> Fallible<Self> {
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        Ok(self)
    }
}

impl MergeOptions<PoolConfigOptions> for PoolConfig {
    fn try_merge(&mut self, options: PoolConfigOptions) -> Fallible<()> {
        assign_if_some!(self.workers, options.workers);
        assign_if_some!(self.max_overflow, options.max_overflow);
        if let Some(millis) = options.poll_interval_ms {
            self.poll_interval = Duration::from_millis(millis);
        }
        Ok(())
    }
}

/// CLI-shaped configuration fragment, optional and stringly-typed like the
/// teacher's `CliOptions`.
#[derive(Debug, StructOpt)]
#[structopt(name = "worker-pool", about = "process-based worker pool supervisor")]
pub struct PoolConfigOptions {
    /// Target number of worker processes.
    #[structopt(long = "workers")]
    pub workers: Option<usize>,

    /// Task queue capacity beyond what workers can immediately service.
    #[structopt(long = "max-overflow")]
    pub max_overflow: Option<usize>,

    /// Milliseconds between child-exit polls.
    #[structopt(long = "poll-interval-ms")]
    pub poll_interval_ms: Option<u64>,
}

/// How to invoke the child worker program (spec §6 "Child invocation").
///
/// Exact invocation is an external contract; this just wraps the
/// `std::process::Command`-shaped pieces the supervisor needs.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl WorkerCommand {
    /// Invoke a program with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument to the invocation.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}
