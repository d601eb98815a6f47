//! Team roster model and derived views.
//!
//! The backend owns the roster; this module is read-only. Deserialization is
//! deliberately tolerant (missing fields default, Mongo-style `$oid`/`$date`
//! wrappers are unwrapped) because the server is the source of truth and a
//! half-filled record must still render. Everything derived -- counts,
//! filtering, participant flattening, pagination -- is pure and synchronous,
//! recomputed from the source list on demand.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Teams shown per page when paginating locally.
pub const PAGE_SIZE: usize = 12;

/// Mail delivery status of a team's QR mail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MailStatus {
    /// The QR mail was delivered.
    Sent,
    /// Delivery was attempted and failed.
    Failed,
    /// Anything else, including an absent field: not yet delivered.
    #[default]
    #[serde(other)]
    Pending,
}

/// Team lead contact details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Lead {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
}

/// A non-lead team member.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Member {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    /// Attendance flag, recorded by the backend at check-in.
    pub present: bool,
}

/// A registered team as reported by the roster endpoint.
///
/// No invariant enforcement happens client-side; fields exist for filtering
/// and display only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Team {
    /// Opaque backend identifier. Accepts both a bare string and the
    /// Mongo-export `{"$oid": "..."}` wrapper.
    #[serde(rename = "_id", deserialize_with = "de_object_id")]
    pub id: String,
    pub team_name: String,
    pub team_code: String,
    pub lead: Lead,
    pub members: Vec<Member>,
    pub mail_status: MailStatus,
    /// Team-level attendance, verified for the lead at the venue.
    pub attendance: bool,
    /// Meal name (e.g. `"BREAKFAST"`) to the member emails served.
    pub food_status: HashMap<String, Vec<String>>,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "de_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Accept both `"abc123"` and `{"$oid": "abc123"}`.
fn de_object_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Plain(String),
        Extended {
            #[serde(rename = "$oid")]
            oid: String,
        },
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Plain(id) => id,
        Repr::Extended { oid } => oid,
    })
}

/// Accept an RFC 3339 string, epoch milliseconds, or either wrapped in the
/// Mongo-export `{"$date": ...}` form. Unparseable values become `None`
/// rather than failing the whole record.
fn de_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Inner {
        Iso(String),
        Millis(i64),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Wrapped {
            #[serde(rename = "$date")]
            date: Inner,
        },
        Bare(Inner),
    }

    let inner = match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::Wrapped { date }) => date,
        Some(Repr::Bare(inner)) => inner,
        None => return Ok(None),
    };
    Ok(match inner {
        Inner::Iso(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Inner::Millis(ms) => Utc.timestamp_millis_opt(ms).single(),
    })
}

/// Mail delivery counts over the whole roster.
///
/// `pending` counts every team whose mail is not `Sent`, so failed teams are
/// both `failed` and `pending` -- a failed mail still needs sending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailCounts {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub pending: usize,
}

/// Compute mail delivery counts by predicate over the status field.
pub fn mail_counts(teams: &[Team]) -> MailCounts {
    MailCounts {
        total: teams.len(),
        sent: teams
            .iter()
            .filter(|t| t.mail_status == MailStatus::Sent)
            .count(),
        failed: teams
            .iter()
            .filter(|t| t.mail_status == MailStatus::Failed)
            .count(),
        pending: teams
            .iter()
            .filter(|t| t.mail_status != MailStatus::Sent)
            .count(),
    }
}

fn has(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn team_matches(team: &Team, query: &str) -> bool {
    let team_match = has(&team.team_name, query) || has(&team.team_code, query);
    let lead_match = has(&team.lead.name, query)
        || has(&team.lead.email, query)
        || team.lead.phone.contains(query);
    let member_match = team
        .members
        .iter()
        .any(|m| has(&m.full_name, query) || has(&m.email, query) || m.phone.contains(query));
    team_match || lead_match || member_match
}

/// Case-insensitive substring filter over team name/code and the
/// name/email/phone of the lead and every member.
///
/// A blank (or all-whitespace) query matches everything.
pub fn filter_teams<'a>(teams: &'a [Team], query: &str) -> Vec<&'a Team> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return teams.iter().collect();
    }
    teams.iter().filter(|t| team_matches(t, &query)).collect()
}

/// Role of a participant within their team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Leader,
    Member,
}

/// One flattened participant row: the lead plus every member of every team.
#[derive(Debug, Clone)]
pub struct Participant {
    pub role: Role,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Leads inherit the team-level attendance flag; members carry their own.
    pub present: bool,
    pub team_name: String,
    pub team_code: String,
}

/// Flatten the roster into one row per person, leads first within each team.
pub fn participants(teams: &[Team]) -> Vec<Participant> {
    let mut rows = Vec::new();
    for team in teams {
        rows.push(Participant {
            role: Role::Leader,
            name: team.lead.name.clone(),
            email: team.lead.email.clone(),
            phone: team.lead.phone.clone(),
            present: team.attendance,
            team_name: team.team_name.clone(),
            team_code: team.team_code.clone(),
        });
        for member in &team.members {
            rows.push(Participant {
                role: Role::Member,
                name: member.full_name.clone(),
                email: member.email.clone(),
                phone: member.phone.clone(),
                present: member.present,
                team_name: team.team_name.clone(),
                team_code: team.team_code.clone(),
            });
        }
    }
    rows
}

/// Number of pages needed for `len` items at [`PAGE_SIZE`]; at least 1.
pub fn page_count(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE).max(1)
}

/// Slice out one page of `items`. `page` is 1-based and clamped into range.
pub fn paginate<T>(items: &[T], page: usize) -> &[T] {
    let page = page.clamp(1, page_count(items.len()));
    let start = (page - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(items.len());
    &items[start..end]
}
