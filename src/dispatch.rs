//! Operator triggers for bulk backend operations.
//!
//! Each bulk operation is started by opening its log stream: the backend
//! begins work when the stream endpoint is hit and reports progress as
//! freeform lines, so "trigger" and "observe" are one step. Triggers are
//! guarded by preconditions over the mail counts -- a disabled action must
//! not fire -- and a refused or failed trigger is surfaced to the caller,
//! never retried automatically.

use uuid::Uuid;

use crate::client::ApiClient;
use crate::console::LogConsole;
use crate::error::DispatchError;
use crate::roster::MailCounts;

/// The bulk operations an operator can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    /// Generate QR codes for every team.
    GenerateQrs,
    /// Send the QR mail to every team lead with an undelivered mail.
    SendAllMail,
    /// Re-attempt only the mails that previously failed.
    RetryFailedMail,
}

impl BulkAction {
    /// Backend path of this operation's log stream.
    pub fn stream_path(self) -> &'static str {
        match self {
            Self::GenerateQrs => "/api/admin/generate-all-qrs/stream",
            Self::SendAllMail => "/api/admin/send-all-leader-mails/stream",
            Self::RetryFailedMail => "/api/admin/retry-failed-mails/stream",
        }
    }

    /// Stable machine-readable name, used in errors and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::GenerateQrs => "generate-all-qrs",
            Self::SendAllMail => "send-all-leader-mails",
            Self::RetryFailedMail => "retry-failed-mails",
        }
    }

    /// Title for the console surface observing this operation.
    pub fn title(self) -> &'static str {
        match self {
            Self::GenerateQrs => "QR DISPATCH TERMINAL",
            Self::SendAllMail => "MAIL DISPATCH TERMINAL",
            Self::RetryFailedMail => "RETRY FAILED MAILS TERMINAL",
        }
    }

    /// Whether this action may fire given the current mail counts.
    pub fn is_enabled(self, counts: &MailCounts) -> bool {
        match self {
            Self::GenerateQrs => true,
            Self::SendAllMail => counts.pending > 0,
            Self::RetryFailedMail => counts.failed > 0,
        }
    }

    fn disabled_reason(self) -> &'static str {
        match self {
            Self::GenerateQrs => "always enabled",
            Self::SendAllMail => "no pending mails",
            Self::RetryFailedMail => "no failed mails",
        }
    }
}

/// Owns the one log console the host application shows and routes bulk
/// triggers into it.
pub struct Dispatcher {
    client: ApiClient,
    console: LogConsole,
}

impl Dispatcher {
    pub fn new(client: ApiClient) -> Self {
        let console = LogConsole::new(client.clone());
        Self { client, console }
    }

    /// Trigger a bulk operation and open its log console.
    ///
    /// # Arguments
    ///
    /// * `action` - The operation to start.
    /// * `counts` - Current mail counts, used to evaluate the precondition.
    ///
    /// # Returns
    ///
    /// The id of the log session observing the operation.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Disabled`] if the precondition does not hold; the
    /// console is left untouched in that case.
    pub fn trigger(
        &mut self,
        action: BulkAction,
        counts: &MailCounts,
    ) -> Result<Uuid, DispatchError> {
        if !action.is_enabled(counts) {
            return Err(DispatchError::Disabled {
                action: action.name(),
                reason: action.disabled_reason(),
            });
        }
        tracing::info!(action = action.name(), "triggering bulk operation");
        let url = self.client.url(action.stream_path());
        Ok(self.console.open(&url))
    }

    /// The console observing the most recently triggered operation.
    pub fn console(&self) -> &LogConsole {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut LogConsole {
        &mut self.console
    }

    /// Close the console's transport, keeping its lines for display.
    pub fn close_console(&mut self) {
        self.console.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;

    fn dispatcher() -> Dispatcher {
        let config = ConsoleConfig::new("http://127.0.0.1:1", "console-test");
        Dispatcher::new(ApiClient::new(&config).expect("client"))
    }

    fn counts(sent: usize, failed: usize, pending: usize) -> MailCounts {
        MailCounts {
            total: sent + pending,
            sent,
            failed,
            pending,
        }
    }

    #[test]
    fn preconditions_follow_the_counts() {
        let nothing_to_do = counts(5, 0, 0);
        assert!(BulkAction::GenerateQrs.is_enabled(&nothing_to_do));
        assert!(!BulkAction::SendAllMail.is_enabled(&nothing_to_do));
        assert!(!BulkAction::RetryFailedMail.is_enabled(&nothing_to_do));

        let failures = counts(3, 2, 2);
        assert!(BulkAction::SendAllMail.is_enabled(&failures));
        assert!(BulkAction::RetryFailedMail.is_enabled(&failures));
    }

    #[tokio::test]
    async fn disabled_trigger_refuses_and_leaves_console_untouched() {
        let mut dispatcher = dispatcher();
        let err = dispatcher
            .trigger(BulkAction::RetryFailedMail, &counts(5, 0, 0))
            .expect_err("must refuse");
        assert!(matches!(err, DispatchError::Disabled { .. }));
        assert!(dispatcher.console().session().is_none());
    }

    #[tokio::test]
    async fn enabled_trigger_opens_the_action_stream() {
        let mut dispatcher = dispatcher();
        let id = dispatcher
            .trigger(BulkAction::SendAllMail, &counts(0, 0, 4))
            .expect("enabled action");
        let session = dispatcher.console().session().expect("session");
        assert_eq!(session.id, id);
        assert!(session.url.ends_with("/api/admin/send-all-leader-mails/stream"));
    }

    #[test]
    fn stream_paths_and_titles_are_distinct() {
        let actions = [
            BulkAction::GenerateQrs,
            BulkAction::SendAllMail,
            BulkAction::RetryFailedMail,
        ];
        for a in actions {
            for b in actions {
                if a != b {
                    assert_ne!(a.stream_path(), b.stream_path());
                    assert_ne!(a.title(), b.title());
                }
            }
        }
    }
}
