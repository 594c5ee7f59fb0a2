mod analytics;
mod backup;
mod cli;
mod config;
mod dates;
mod db;
mod forms;
mod ipc;
mod listing;
mod logging;
mod model;
mod query;
mod references;
mod store;

use clap::Parser;
use std::io::{self, BufRead, Write};

fn main() {
    let args = cli::Args::parse();
    logging::init_logger(&args.log_level, args.log_format);

    let mut state = ipc::AppState::new(args.config.clone());
    if let Some(path) = &args.workspace {
        if let Err(e) = state.open_workspace(path) {
            tracing::error!(
                workspace = %path.display(),
                error = %e,
                "could not open startup workspace"
            );
        }
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rosterd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "bad request json");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
