use std::process::{Command as ProcessCommand, Stdio};

use anyhow::{Context, Result, bail};

use crate::config::OpenerCommand;

use super::{FailureOutcome, WatchSession};

/// Hands an embed URL to something that can show it.
pub(crate) trait Opener {
    fn open(&self, url: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub(crate) struct CommandOpener {
    command: OpenerCommand,
}

impl CommandOpener {
    pub(crate) fn new(command: OpenerCommand) -> Self {
        Self { command }
    }
}

impl Opener for CommandOpener {
    fn open(&self, url: &str) -> Result<()> {
        let program = &self.command.program;
        let status = ProcessCommand::new(program)
            .args(&self.command.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("failed to launch {program}"))?;
        if !status.success() {
            bail!("{program} exited with status: {status}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LaunchReport {
    Launched {
        index: usize,
        name: &'static str,
        url: String,
        failed_attempts: usize,
    },
    /// Launch failed and fallback was disabled.
    Failed { index: usize, error: String },
    /// Every provider from the starting one to the last failed.
    Exhausted { failed_attempts: usize },
}

/// Opens the selected provider; on failure walks forward through the list
/// until one launches or the last one fails.
pub(crate) fn play_with_fallback(
    session: &mut WatchSession,
    opener: &dyn Opener,
    fallback: bool,
) -> LaunchReport {
    let mut failed_attempts = 0;
    loop {
        let index = session.selection().selected();
        let provider = session.current_provider();
        match opener.open(&provider.url) {
            Ok(()) => {
                tracing::info!(
                    title = %session.target().label(),
                    provider = provider.name,
                    "launched embed provider"
                );
                return LaunchReport::Launched {
                    index,
                    name: provider.name,
                    url: provider.url.clone(),
                    failed_attempts,
                };
            }
            Err(err) => {
                tracing::warn!(provider = provider.name, error = %err, "embed provider failed to launch");
                failed_attempts += 1;
                if !fallback {
                    return LaunchReport::Failed {
                        index,
                        error: format!("{err:#}"),
                    };
                }
            }
        }

        if session.report_failure() == FailureOutcome::Exhausted {
            return LaunchReport::Exhausted { failed_attempts };
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedOpener;
    use super::*;
    use crate::app::playback::WatchTarget;

    #[test]
    fn first_provider_launches_without_fallback() {
        let mut session = WatchSession::open(WatchTarget::movie("550"));
        let opener = ScriptedOpener::failing(0);
        let report = play_with_fallback(&mut session, &opener, true);
        assert!(matches!(
            report,
            LaunchReport::Launched {
                index: 0,
                failed_attempts: 0,
                ..
            }
        ));
        assert_eq!(opener.opened.borrow().len(), 1);
    }

    #[test]
    fn failed_launches_walk_the_list() {
        let mut session = WatchSession::open(WatchTarget::tv("1399", 1, 1));
        let opener = ScriptedOpener::failing(2);
        let report = play_with_fallback(&mut session, &opener, true);
        match report {
            LaunchReport::Launched {
                index,
                url,
                failed_attempts,
                ..
            } => {
                assert_eq!(index, 2);
                assert_eq!(failed_attempts, 2);
                assert_eq!(url, session.current_url());
            }
            other => panic!("unexpected report: {other:?}"),
        }
    }

    #[test]
    fn fallback_stops_at_last_provider() {
        let mut session = WatchSession::open(WatchTarget::anime("37854", 1));
        let opener = ScriptedOpener::failing(usize::MAX);
        let report = play_with_fallback(&mut session, &opener, true);
        assert_eq!(report, LaunchReport::Exhausted { failed_attempts: 3 });
        assert_eq!(session.selection().selected(), 2);
    }

    #[test]
    fn disabled_fallback_keeps_selection() {
        let mut session = WatchSession::open(WatchTarget::movie("550"));
        session.select_provider(4).expect("select");
        let opener = ScriptedOpener::failing(1);
        let report = play_with_fallback(&mut session, &opener, false);
        assert!(matches!(report, LaunchReport::Failed { index: 4, .. }));
        assert_eq!(session.selection().selected(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn command_opener_reports_non_zero_exit() {
        let failing = CommandOpener::new(OpenerCommand {
            program: "false".to_string(),
            args: Vec::new(),
        });
        assert!(failing.open("https://example.test").is_err());

        let working = CommandOpener::new(OpenerCommand {
            program: "true".to_string(),
            args: Vec::new(),
        });
        assert!(working.open("https://example.test").is_ok());
    }

    #[test]
    fn command_opener_reports_missing_program() {
        let opener = CommandOpener::new(OpenerCommand {
            program: "netprime-definitely-missing-opener".to_string(),
            args: Vec::new(),
        });
        let err = opener.open("https://example.test").expect_err("spawn fails");
        assert!(err.to_string().contains("failed to launch"));
    }
}
