use std::process::Command;
use std::str;

/// CLI interface tests
#[cfg(test)]
mod cli_tests {
    use super::*;

    fn replmux(args: &[&str]) -> std::process::Output {
        Command::new(env!("CARGO_BIN_EXE_replmux"))
            .args(args)
            .output()
            .expect("Failed to execute command")
    }

    #[test]
    fn test_cli_help() {
        let output = replmux(&["--help"]);
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(output.status.success());
        assert!(stdout.contains("Usage:"));
        assert!(stdout.contains("Commands:"));
        assert!(stdout.contains("serve"));
        assert!(stdout.contains("ports"));
        assert!(stdout.contains("config"));
    }

    #[test]
    fn test_cli_serve_help() {
        let output = replmux(&["serve", "--help"]);
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(stdout.contains("--port"));
        assert!(stdout.contains("--serial"));
        assert!(stdout.contains("--no-console"));
        assert!(stdout.contains("--queue-capacity"));
    }

    #[test]
    fn test_cli_version() {
        let output = replmux(&["-q", "version"]);
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(output.status.success());
        assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_cli_json_output() {
        let output = replmux(&["-q", "--output", "json", "version"]);
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        let value: serde_json::Value = serde_json::from_str(stdout).expect("not JSON");
        assert!(value["message"].as_str().unwrap().contains("replmux"));
    }

    #[test]
    fn test_cli_config_path() {
        let output = replmux(&["-q", "config", "path"]);
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(output.status.success());
        assert!(stdout.contains("global:"));
        assert!(stdout.contains("project:"));
    }

    #[test]
    fn test_cli_config_init_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().to_str().unwrap();

        let output = replmux(&["-q", "config", "init", path]);
        assert!(output.status.success());
        assert!(dir.path().join(".replmux").join("config.toml").exists());

        // A second init must not overwrite the first
        let output = replmux(&["-q", "config", "init", path]);
        assert!(!output.status.success());
    }

    #[test]
    fn test_cli_bad_config_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = dir.path().join("bad.toml");
        std::fs::write(&config, "[global]\nqueue_capacity = 0\n").unwrap();

        let output = replmux(&["-q", "--config", config.to_str().unwrap(), "config", "show"]);
        let stderr = str::from_utf8(&output.stderr).expect("Invalid UTF-8");

        assert!(!output.status.success());
        assert!(stderr.contains("queue_capacity"));
    }

    #[test]
    fn test_cli_invalid_command() {
        let output = replmux(&["invalid-command"]);
        assert!(!output.status.success());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let output = replmux(&["-v", "--help"]);
        let stderr = str::from_utf8(&output.stderr).expect("Invalid UTF-8");
        assert!(!stderr.contains("unexpected argument"));
    }
}
