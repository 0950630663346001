use std::process::Command;

/// Env vars consulted in priority order, with the prefix that namespaces
/// the resulting holder string per CI system.
const CHECKS: &[(&str, &str)] = &[
    ("SLOTLOCK_HOLDER", ""),
    ("CI_JOB_ID", "gitlab-job-"),
    ("CI_MERGE_REQUEST_IID", "gitlab-mr-"),
    ("GITHUB_RUN_ID", "github-run-"),
    ("BUILD_ID", "jenkins-"),
];

/// Determine the identity of the current claimant: CI environment
/// variables first, then the hostname.
pub fn resolve() -> String {
    for (var, prefix) in CHECKS {
        if let Ok(value) = std::env::var(var) {
            if !value.is_empty() {
                return format!("{prefix}{value}");
            }
        }
    }

    match detect_hostname() {
        Some(hostname) => format!("host-{hostname}"),
        None => "unknown".to_string(),
    }
}

fn detect_hostname() -> Option<String> {
    let output = Command::new("hostname")
        .output()
        .ok()
        .filter(|output| output.status.success())?;

    let hostname = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if hostname.is_empty() {
        None
    } else {
        Some(hostname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests share process state, so they run as one test to
    // avoid interleaving.
    #[test]
    fn resolve_honors_priority_order() {
        for (var, _) in CHECKS {
            std::env::remove_var(var);
        }

        std::env::set_var("BUILD_ID", "42");
        assert_eq!(resolve(), "jenkins-42");

        std::env::set_var("GITHUB_RUN_ID", "777");
        assert_eq!(resolve(), "github-run-777");

        std::env::set_var("CI_JOB_ID", "123");
        assert_eq!(resolve(), "gitlab-job-123");

        // Explicit override beats everything, with no prefix
        std::env::set_var("SLOTLOCK_HOLDER", "my-laptop");
        assert_eq!(resolve(), "my-laptop");

        // Empty values are skipped
        std::env::set_var("SLOTLOCK_HOLDER", "");
        assert_eq!(resolve(), "gitlab-job-123");

        for (var, _) in CHECKS {
            std::env::remove_var(var);
        }

        // Hostname fallback is always prefixed
        let fallback = resolve();
        assert!(fallback == "unknown" || fallback.starts_with("host-"));
    }
}
