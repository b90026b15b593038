//! Backup blueprints

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How often a blueprint is due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    /// Earliest time the blueprint is due again after a successful run at
    /// `last`
    ///
    /// Monthly advances by one calendar month, clamping the day-of-month
    /// when the target month is shorter.
    #[must_use]
    pub fn next_due(&self, last: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Daily => last + Duration::days(1),
            Self::Weekly => last + Duration::days(7),
            Self::Monthly => add_month(last),
        }
    }
}

/// One calendar month later, clamping the day-of-month when the target
/// month is shorter (Jan 31 advances to Feb 28/29)
fn add_month(last: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if last.month() == 12 {
        (last.year() + 1, 1)
    } else {
        (last.year(), last.month() + 1)
    };
    let day = last.day().min(days_in_month(year, month));

    // Move to day 1 first so every intermediate date stays valid.
    last.with_day(1)
        .and_then(|d| d.with_year(year))
        .and_then(|d| d.with_month(month))
        .and_then(|d| d.with_day(day))
        .unwrap_or(last)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(28, |d| d.day())
}

/// Shell command run on the source host around artifact creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    pub cwd: String,
    pub cmd: String,
}

/// Optional pre/post commands for a blueprint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre: Option<Hook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Hook>,
}

/// What to archive on the source host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    /// Tar up a fixed set of absolute paths
    Files { paths: Vec<String> },
    /// Dump a MongoDB instance, then tar the dump directory
    Mongodb {
        #[serde(rename = "connectionUrl")]
        connection_url: String,
    },
}

/// Where the artifact must end up
///
/// Only host-path destinations exist today; the enum leaves room for more
/// variants without reshaping the planner. `path` is either a directory
/// (trailing separator) or a filename prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Destination {
    Host { host: String, path: String },
}

/// A declarative specification of one recurring backup job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(rename = "_id")]
    pub id: String,
    pub interval: Interval,
    #[serde(flatten)]
    pub kind: BlueprintKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum BlueprintKind {
    /// Drive a backup on a remote host over SSH
    SshAgent {
        host: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hooks: Option<Hooks>,
        strategy: Strategy,
        #[serde(default)]
        destinations: Vec<Destination>,
    },
    /// Never runs; exercises catalog shape in tests
    Dummy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn daily_and_weekly_intervals() {
        let last = Utc.with_ymd_and_hms(2024, 5, 14, 3, 30, 0).unwrap();
        assert_eq!(
            Interval::Daily.next_due(last),
            Utc.with_ymd_and_hms(2024, 5, 15, 3, 30, 0).unwrap()
        );
        assert_eq!(
            Interval::Weekly.next_due(last),
            Utc.with_ymd_and_hms(2024, 5, 21, 3, 30, 0).unwrap()
        );
    }

    #[test]
    fn monthly_interval_preserves_day_of_month() {
        let last = Utc.with_ymd_and_hms(2024, 4, 14, 3, 30, 0).unwrap();
        assert_eq!(
            Interval::Monthly.next_due(last),
            Utc.with_ymd_and_hms(2024, 5, 14, 3, 30, 0).unwrap()
        );
    }

    #[test]
    fn monthly_interval_clamps_short_months() {
        // Jan 31 has no counterpart in February; the due date clamps to the
        // last day instead of skipping the month.
        let last = Utc.with_ymd_and_hms(2024, 1, 31, 3, 30, 0).unwrap();
        assert_eq!(
            Interval::Monthly.next_due(last),
            Utc.with_ymd_and_hms(2024, 2, 29, 3, 30, 0).unwrap()
        );

        let last = Utc.with_ymd_and_hms(2025, 1, 31, 3, 30, 0).unwrap();
        assert_eq!(
            Interval::Monthly.next_due(last),
            Utc.with_ymd_and_hms(2025, 2, 28, 3, 30, 0).unwrap()
        );

        let last = Utc.with_ymd_and_hms(2024, 3, 31, 3, 30, 0).unwrap();
        assert_eq!(
            Interval::Monthly.next_due(last),
            Utc.with_ymd_and_hms(2024, 4, 30, 3, 30, 0).unwrap()
        );
    }

    #[test]
    fn monthly_interval_rolls_over_the_year() {
        let last = Utc.with_ymd_and_hms(2024, 12, 15, 3, 30, 0).unwrap();
        assert_eq!(
            Interval::Monthly.next_due(last),
            Utc.with_ymd_and_hms(2025, 1, 15, 3, 30, 0).unwrap()
        );
    }

    #[test]
    fn blueprint_document_deserializes() {
        let doc = serde_json::json!({
            "_id": "db/users",
            "interval": "weekly",
            "mode": "ssh-agent",
            "host": "bravo",
            "strategy": { "type": "mongodb", "connectionUrl": "mongodb://localhost" },
            "destinations": [
                { "type": "host", "host": "charlie", "path": "/backups/" }
            ]
        });

        let bp: Blueprint = serde_json::from_value(doc).unwrap();
        assert_eq!(bp.id, "db/users");
        assert_eq!(bp.interval, Interval::Weekly);
        match bp.kind {
            BlueprintKind::SshAgent {
                host,
                hooks,
                strategy,
                destinations,
            } => {
                assert_eq!(host, "bravo");
                assert!(hooks.is_none());
                assert_eq!(
                    strategy,
                    Strategy::Mongodb {
                        connection_url: "mongodb://localhost".to_string()
                    }
                );
                assert_eq!(destinations.len(), 1);
            }
            BlueprintKind::Dummy => panic!("expected ssh-agent blueprint"),
        }
    }

    #[test]
    fn dummy_blueprint_deserializes() {
        let doc = serde_json::json!({
            "_id": "noop",
            "interval": "daily",
            "mode": "dummy"
        });

        let bp: Blueprint = serde_json::from_value(doc).unwrap();
        assert_eq!(bp.kind, BlueprintKind::Dummy);
    }
}
