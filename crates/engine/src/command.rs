//! Unit-of-work wrapper around a setup strategy
//!
//! [`SetupCommand::run`] is the single boundary where strategy failures,
//! including panics, become a [`CommandResult`]. Nothing escapes it, so one
//! segment's failure cannot disturb batch bookkeeping.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use segrecover_core::{
    CommandResult, ErrorRecord, RecoveryDescriptor, RecoveryErrorType,
};
use tracing::{error, info};

use crate::pool::UnitOfWork;
use crate::setup::{classify, SetupContext, SetupStrategy};

/// Setup work for one failed segment.
#[derive(Debug, Clone)]
pub struct SetupCommand {
    descriptor: RecoveryDescriptor,
    strategy: SetupStrategy,
    ctx: Arc<SetupContext>,
}

impl SetupCommand {
    /// Classify `descriptor` and bind it to its strategy.
    pub fn new(descriptor: RecoveryDescriptor, force_overwrite: bool, ctx: Arc<SetupContext>) -> Self {
        let strategy = classify(&descriptor, force_overwrite);
        SetupCommand {
            descriptor,
            strategy,
            ctx,
        }
    }

    /// Descriptor this command prepares.
    pub fn descriptor(&self) -> &RecoveryDescriptor {
        &self.descriptor
    }

    /// Strategy selected for the descriptor.
    pub fn strategy(&self) -> SetupStrategy {
        self.strategy
    }

    /// Run the strategy and capture its outcome.
    ///
    /// Success yields `rc = 0` with empty output. Any failure yields `rc = 1`
    /// with a validation [`ErrorRecord`] in stderr.
    pub fn run(&self) -> CommandResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.strategy.prepare(&self.descriptor, &self.ctx)
        }));

        let message = match outcome {
            Ok(Ok(())) => return CommandResult::success(),
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        error!(
            target: "segrecover::setup",
            dbid = self.descriptor.target_dbid,
            port = self.descriptor.target_port,
            "{} failed: {}",
            self.strategy.command_name(),
            message
        );
        let record = ErrorRecord::new(RecoveryErrorType::Validation, message, &self.descriptor);
        CommandResult::from_error_record(&record)
    }
}

impl UnitOfWork for SetupCommand {
    fn name(&self) -> &str {
        self.strategy.command_name()
    }

    fn execute(&self) -> CommandResult {
        self.run()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "(non-string panic)".to_string()
    }
}

/// Build one setup command per descriptor, in input order.
pub fn build_setup_commands(
    descriptors: Vec<RecoveryDescriptor>,
    force_overwrite: bool,
    ctx: Arc<SetupContext>,
) -> Vec<SetupCommand> {
    descriptors
        .into_iter()
        .map(|descriptor| {
            let cmd = SetupCommand::new(descriptor, force_overwrite, Arc::clone(&ctx));
            info!(
                target: "segrecover::setup",
                dbid = cmd.descriptor.target_dbid,
                kind = %cmd.strategy.kind(),
                "{}",
                cmd.strategy.command_name()
            );
            cmd
        })
        .collect()
}
