// dbsync/src/tasks/confirm.rs
use anyhow::Result;
use dialoguer::Confirm;
use is_terminal::IsTerminal;
use tracing::debug;

use crate::config::Settings;
use crate::errors::SyncError;

/// Asks the operator a yes/no question.
pub trait Confirmer {
    fn confirm(&self, message: &str) -> Result<bool>;
}

/// Prompts on the terminal, defaulting to "no".
pub struct TerminalConfirmer {
    interactive: bool,
}

impl TerminalConfirmer {
    /// Prompts only when stdin is attached to a terminal.
    pub fn for_stdin() -> Self {
        TerminalConfirmer {
            interactive: std::io::stdin().is_terminal(),
        }
    }
}

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, message: &str) -> Result<bool> {
        if !self.interactive {
            return Err(SyncError::NotATerminal.into());
        }
        let confirmed = Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}

/// Returns true straight away when `skip_data_sync_confirm` is set,
/// otherwise whatever the operator answers.
pub fn gate<C: Confirmer + ?Sized>(settings: &Settings, confirmer: &C, message: &str) -> Result<bool> {
    if settings.skip_data_sync_confirm {
        debug!(%message, "confirmation skipped");
        return Ok(true);
    }
    confirmer.confirm(message)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::tests::sample_raw_config;
    use crate::config::EnvOverrides;
    use std::cell::RefCell;

    /// Answers every prompt with `answer` and remembers the questions.
    pub(crate) struct StubConfirmer {
        pub answer: bool,
        pub asked: RefCell<Vec<String>>,
    }

    impl StubConfirmer {
        pub(crate) fn answering(answer: bool) -> Self {
            StubConfirmer {
                answer,
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl Confirmer for StubConfirmer {
        fn confirm(&self, message: &str) -> Result<bool> {
            self.asked.borrow_mut().push(message.to_string());
            Ok(self.answer)
        }
    }

    #[test]
    fn test_gate_skips_prompt_when_flag_set() -> anyhow::Result<()> {
        let overrides = EnvOverrides {
            skip_data_sync_confirm: true,
            ..Default::default()
        };
        let settings = Settings::from_raw(sample_raw_config(), &overrides)?;
        let confirmer = StubConfirmer::answering(false);

        assert!(gate(&settings, &confirmer, "Really?")?);
        assert!(confirmer.asked.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn test_gate_returns_operator_answer() -> anyhow::Result<()> {
        let settings = Settings::from_raw(sample_raw_config(), &EnvOverrides::default())?;

        let yes = StubConfirmer::answering(true);
        assert!(gate(&settings, &yes, "Really?")?);
        assert_eq!(*yes.asked.borrow(), vec!["Really?".to_string()]);

        let no = StubConfirmer::answering(false);
        assert!(!gate(&settings, &no, "Really?")?);
        Ok(())
    }

    #[test]
    fn test_prompt_without_terminal_is_an_error() -> anyhow::Result<()> {
        let settings = Settings::from_raw(sample_raw_config(), &EnvOverrides::default())?;
        let confirmer = TerminalConfirmer { interactive: false };

        let err = gate(&settings, &confirmer, "Really?").unwrap_err();

        assert!(matches!(err.downcast_ref::<SyncError>(), Some(SyncError::NotATerminal)));
        Ok(())
    }

    #[test]
    fn test_skip_flag_never_needs_a_terminal() -> anyhow::Result<()> {
        let overrides = EnvOverrides {
            skip_data_sync_confirm: true,
            ..Default::default()
        };
        let settings = Settings::from_raw(sample_raw_config(), &overrides)?;

        assert!(gate(&settings, &TerminalConfirmer { interactive: false }, "Really?")?);
        Ok(())
    }
}
