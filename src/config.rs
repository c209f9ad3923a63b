use clap::Parser;
use std::path::PathBuf;

/// Grade record sidecar: newline-delimited JSON requests on stdin, one
/// JSON response per line on stdout.
#[derive(Debug, Clone, Parser)]
#[command(name = "gradesd", version)]
pub struct Config {
    /// Workspace directory to open at startup (otherwise use `workspace.select`).
    #[arg(long, env = "GRADESD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Log filter, e.g. `info` or `gradesd=debug`. Falls back to RUST_LOG.
    #[arg(long, env = "GRADESD_LOG")]
    pub log_level: Option<String>,
}

impl Config {
    /// Reads `.env` (if present) before parsing flags and environment.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse() {
        let cfg = Config::parse_from(["gradesd", "--workspace", "/tmp/ws", "--log-level", "debug"]);
        assert_eq!(cfg.workspace, Some(PathBuf::from("/tmp/ws")));
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
    }
}
