#![forbid(unsafe_code)]

use std::env;

use dupcheck_harness::{HarnessConfig, RemoteClientRuntime, ScenarioSuiteRuntime, SuiteConfig};
use dupcheck_tools::render::render_run_report;

const USAGE: &str = "usage: dupcheck run [--report <path>]";

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

async fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args[0] != "run" {
        return Err(USAGE.to_string());
    }
    let report_path = parse_report_path(&args[1..])?;

    let config = HarnessConfig::from_env();
    let client = RemoteClientRuntime::from_config(&config)?;
    let suite = ScenarioSuiteRuntime::new(SuiteConfig::from_harness_config(&config));
    let report = suite.run(&client).await?;

    print!("{}", render_run_report(&report));

    if let Some(path) = report_path {
        let artifact = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("report artifact encode failed: {e}"))?;
        std::fs::write(&path, artifact)
            .map_err(|e| format!("report artifact write failed at {path}: {e}"))?;
        println!("report artifact written to {path}");
    }

    if report.failed_checks > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn parse_report_path(rest: &[String]) -> Result<Option<String>, String> {
    match rest {
        [] => Ok(None),
        [flag, path] if flag == "--report" => Ok(Some(path.clone())),
        _ => Err(USAGE.to_string()),
    }
}
