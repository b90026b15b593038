//! Artifact naming

use chrono::{DateTime, Utc};

/// Canonical file name for one run of a plan, as it lands at every
/// destination
///
/// Slashes in the plan id become dashes so the id stays a single path
/// component, and the UTC timestamp substitutes `-` for `:` since some
/// destination filesystems reject colons. Callers concatenate this onto the
/// destination path without inserting a separator.
#[must_use]
pub fn backup_file_name(plan_id: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}.tar.gz",
        plan_id.replace('/', "-"),
        now.format("%Y-%m-%dT%H-%M-%S%.3fZ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn name_is_filesystem_safe() {
        let now = Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 5).unwrap()
            + chrono::Duration::milliseconds(42);

        let name = backup_file_name("db/users", now);
        assert_eq!(name, "db-users_2024-05-14T09-30-05.042Z.tar.gz");
        assert!(!name.contains(':'));
        assert!(!name.contains('/'));
    }

    #[test]
    fn plain_ids_pass_through() {
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(
            backup_file_name("etc-backup", now),
            "etc-backup_2024-12-01T00-00-00.000Z.tar.gz"
        );
    }
}
