//! Wait command

use std::time::Duration;

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use indicatif::ProgressBar;
use keel_core::retry::{
    Interruption, OperationContext, PollEngineBuilder, RetryObserver, RetrySession,
    TracingObserver,
};
use keel_platform::polling::RegistrationStatus;
use keel_platform::{Diagnostics, PlatformClient, PollError, Poller};

use crate::cli::{WaitArgs, WaitCommands};
use crate::output;

/// Shows the latest progress annotation on the spinner and logs as usual
struct SpinnerObserver {
    bar: ProgressBar,
    tracing: TracingObserver,
}

impl RetryObserver for SpinnerObserver {
    fn on_attempt_start(&self, session: &RetrySession) {
        self.tracing.on_attempt_start(session);
    }

    fn on_retry(&self, session: &RetrySession, reason: &str, delay: Duration) {
        self.bar.set_message(format!(
            "{} (attempt {}) {}",
            session.name(),
            session.attempt(),
            session.progress().unwrap_or(reason)
        ));
        self.tracing.on_retry(session, reason, delay);
    }

    fn on_success(&self, session: &RetrySession) {
        self.tracing.on_success(session);
    }

    fn on_failure(&self, session: &RetrySession, error: &dyn std::fmt::Display) {
        self.tracing.on_failure(session, error);
    }

    fn on_gave_up(&self, session: &RetrySession, reason: &str) {
        self.tracing.on_gave_up(session, reason);
    }

    fn on_cancelled(&self, session: &RetrySession, cause: Interruption) {
        self.tracing.on_cancelled(session, cause);
    }
}

pub async fn run(cmd: WaitCommands, config: Option<&Utf8Path>, quiet: bool) -> Result<()> {
    let mut config = super::load_config(config)?;

    let (protocol, args) = match cmd {
        WaitCommands::Ready(args) => (Protocol::Ready, args),
        WaitCommands::Removed(args) => (Protocol::Removed, args),
        WaitCommands::Build(args) => (Protocol::Build, args),
        WaitCommands::Action(args) => (Protocol::Action, args),
        WaitCommands::Registration(args) => (Protocol::Registration, args),
    };
    if let Some(secs) = args.timeout {
        config.polling.max_elapsed_secs = Some(secs);
    }

    let client = PlatformClient::new(&config)?;
    let bar = output::spinner(&format!("Waiting for {}", args.path), quiet);
    let engine = PollEngineBuilder::new()
        .with_policy(config.polling.clone())
        .with_observer(SpinnerObserver {
            bar: bar.clone(),
            tracing: TracingObserver,
        })
        .build();
    let poller = Poller::new(&client, engine);

    let ctx = super::operation_context(None);
    let mut diags = Diagnostics::new();
    let result = protocol.run(&poller, &ctx, &args.path, &mut diags).await;
    bar.finish_and_clear();
    output::diagnostics(&diags);

    match result {
        Ok(settled) => {
            report(protocol, &args, settled)?;
            Ok(())
        }
        Err(err) if err.gave_up() => Err(anyhow!("Gave up waiting for {}: {}", args.path, err)),
        Err(err) => Err(anyhow!("Waiting for {} failed: {}", args.path, err)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    Ready,
    Removed,
    Build,
    Action,
    Registration,
}

/// What a protocol settled on
enum Settled {
    Done,
    Resource(serde_json::Value),
    Registered(RegistrationStatus),
}

impl Protocol {
    async fn run<O: RetryObserver>(
        self,
        poller: &Poller<'_, O>,
        ctx: &OperationContext,
        path: &str,
        diags: &mut Diagnostics,
    ) -> Result<Settled, PollError> {
        Ok(match self {
            Protocol::Ready => {
                poller.wait_for_ready(ctx, path, diags).await?;
                Settled::Done
            }
            Protocol::Removed => {
                poller.wait_for_removal(ctx, path, diags).await?;
                Settled::Done
            }
            Protocol::Build => {
                let build = poller.wait_for_build(ctx, path, diags).await?;
                Settled::Resource(serde_json::to_value(build).unwrap_or_default())
            }
            Protocol::Action => {
                let action = poller.wait_for_action(ctx, path, diags).await?;
                Settled::Resource(serde_json::to_value(action).unwrap_or_default())
            }
            Protocol::Registration => {
                Settled::Registered(poller.ensure_registered(ctx, path, diags).await?)
            }
        })
    }

    fn done_message(self, path: &str) -> String {
        match self {
            Protocol::Ready => format!("{} is ready", path),
            Protocol::Removed => format!("{} has been removed", path),
            Protocol::Build => format!("Build {} succeeded", path),
            Protocol::Action => format!("Action {} succeeded", path),
            Protocol::Registration => format!("Organization and node registered under {}", path),
        }
    }
}

fn report(protocol: Protocol, args: &WaitArgs, settled: Settled) -> Result<()> {
    if args.json {
        let value = match settled {
            Settled::Done => serde_json::json!({ "path": args.path, "settled": true }),
            Settled::Resource(value) => value,
            Settled::Registered(status) => serde_json::to_value(status)?,
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    output::success(&protocol.done_message(&args.path));
    if let Settled::Registered(status) = settled {
        output::kv("org did", &status.org.did);
        output::kv("org id", &status.org.id);
        output::kv("org verifiers", &status.org_verifiers().join(", "));
        output::kv("node id", &status.node.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_messages() {
        assert_eq!(Protocol::Ready.done_message("/r1"), "/r1 is ready");
        assert_eq!(Protocol::Build.done_message("/b1"), "Build /b1 succeeded");
    }

    #[test]
    fn test_spinner_observer_shows_progress() {
        let bar = ProgressBar::hidden();
        let observer = SpinnerObserver {
            bar: bar.clone(),
            tracing: TracingObserver,
        };
        let mut session = RetrySession::new("build-check /b1");
        session.set_progress("(waiting for completion - status: pending)");

        observer.on_retry(&session, "not ready yet", Duration::from_millis(500));

        assert_eq!(
            bar.message(),
            "build-check /b1 (attempt 0) (waiting for completion - status: pending)"
        );
    }
}
