//! Operator-console core for a hackathon registration backend.
//!
//! The backend owns the data and the heavy lifting (QR generation, mail
//! delivery, CSV import); this crate is the client-side machinery that makes
//! an admin console trustworthy: a lock gate that tracks an external
//! revocation signal over poll + push with last-update-wins reconciliation,
//! a live log console streaming one operation's output over SSE, pure
//! derived views over the team roster, and precondition-guarded triggers
//! for bulk operations.

mod client;
pub use client::{ApiClient, StatusReport};
mod config;
pub use config::ConsoleConfig;
mod console;
pub use console::{FAILURE_MARKER, LineKind, LogConsole, LogLine, StreamSession, SUCCESS_MARKER};
mod dispatch;
pub use dispatch::{BulkAction, Dispatcher};
mod error;
pub use error::{ApiError, DispatchError};
mod gate;
pub use gate::{GateHandle, LockGate, LockState, supervise};
mod push;
mod retry;
pub use retry::RetryPolicy;
mod roster;
pub use roster::{
    Lead, MailCounts, MailStatus, Member, PAGE_SIZE, Participant, Role, Team, filter_teams,
    mail_counts, page_count, paginate, participants,
};
mod sse;
