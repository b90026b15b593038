//! Archive build commands
//!
//! Command builders for producing the backup artifact on the source host,
//! and the classification rule separating genuine `mongodump` failures from
//! its informational stderr noise.

use chrono::Utc;
use packferry_core::Hook;
use uuid::Uuid;

use crate::result::CommandResult;

/// Unique archive path on the session host
#[must_use]
pub fn archive_path() -> String {
    format!("/tmp/backup{}.tar.gz", Uuid::new_v4().simple())
}

/// Unique dump directory for a mongodb strategy
#[must_use]
pub fn dump_dir_path() -> String {
    format!("/tmp/mongodump_{}", Utc::now().timestamp_millis())
}

/// Hook command, run from its configured working directory
#[must_use]
pub fn hook_cmd(hook: &Hook) -> String {
    format!("cd {} && {}", hook.cwd, hook.cmd)
}

/// Archive a set of absolute paths, gzipped
///
/// `P` keeps the leading `/` so restores land where the originals were.
#[must_use]
pub fn tar_paths_cmd(archive: &str, paths: &[String]) -> String {
    format!("tar czvfP {archive} {}", paths.join(" "))
}

/// Archive a dump directory without gzip
///
/// Dumps are already-compact BSON; gzipping them again buys nothing.
#[must_use]
pub fn tar_dir_cmd(archive: &str, dir: &str) -> String {
    format!("tar cvfP {archive} {dir}")
}

#[must_use]
pub fn mongodump_cmd(dump_dir: &str, connection_url: &str) -> String {
    format!("mongodump -o {dump_dir} {connection_url}")
}

/// Decide whether a `mongodump` invocation genuinely failed
///
/// mongodump reports progress on stderr and may exit non-zero on harmless
/// conditions; only output carrying the literal `Failed` marker counts as a
/// failure. Returns the offending output when it does.
#[must_use]
pub fn mongodump_failure(result: &CommandResult) -> Option<String> {
    let output = result.combined_output();
    output.contains("Failed").then_some(output)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn result(status: i32, stderr: &str) -> CommandResult {
        CommandResult {
            status,
            stdout: String::new(),
            stderr: stderr.to_string(),
            duration: Duration::from_millis(10),
        }
    }

    #[test]
    fn archive_paths_are_unique() {
        let a = archive_path();
        let b = archive_path();
        assert!(a.starts_with("/tmp/backup"));
        assert!(a.ends_with(".tar.gz"));
        assert_ne!(a, b);
    }

    #[test]
    fn tar_preserves_absolute_paths() {
        let cmd = tar_paths_cmd(
            "/tmp/backup1.tar.gz",
            &["/etc".to_string(), "/var/www".to_string()],
        );
        assert_eq!(cmd, "tar czvfP /tmp/backup1.tar.gz /etc /var/www");

        let cmd = tar_dir_cmd("/tmp/backup1.tar.gz", "/tmp/mongodump_1");
        assert_eq!(cmd, "tar cvfP /tmp/backup1.tar.gz /tmp/mongodump_1");
    }

    #[test]
    fn hook_runs_from_its_cwd() {
        let hook = Hook {
            cwd: "/opt/app".to_string(),
            cmd: "./prepare.sh".to_string(),
        };
        assert_eq!(hook_cmd(&hook), "cd /opt/app && ./prepare.sh");
    }

    #[test]
    fn mongodump_noise_is_not_a_failure() {
        let noisy = result(1, "2024-05-14T09:30:05.000+0000 writing db.users to /tmp/dump");
        assert!(mongodump_failure(&noisy).is_none());

        let clean = result(0, "");
        assert!(mongodump_failure(&clean).is_none());
    }

    #[test]
    fn mongodump_failed_marker_surfaces() {
        let failed = result(1, "Failed: error connecting to db server");
        let output = mongodump_failure(&failed).unwrap();
        assert!(output.contains("error connecting"));
    }
}
