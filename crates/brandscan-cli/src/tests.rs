use super::*;
use brandscan_core::{JobState, JobStatus, ScanResult};

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["brandscan", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["brandscan", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["brandscan"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn scan_requires_brand_and_website() {
    assert!(Cli::try_parse_from(["brandscan", "scan", "--brand", "Acme"]).is_err());
    assert!(Cli::try_parse_from(["brandscan", "scan", "--website", "acme.com"]).is_err());
}

#[test]
fn scan_args_build_a_request() {
    let cli = Cli::try_parse_from([
        "brandscan",
        "scan",
        "--brand",
        "Acme",
        "--website",
        "acme.com",
        "--instagram",
        "@acme",
        "--industry",
        "Beverages",
        "--no-db",
    ])
    .expect("expected valid cli args");

    let Some(Commands::Scan(args)) = cli.command else {
        panic!("expected scan command");
    };
    assert!(args.no_db);

    let request = args.to_request();
    assert_eq!(request.brand_name, "Acme");
    assert_eq!(request.website_url, "acme.com");
    assert_eq!(request.social.instagram.as_deref(), Some("@acme"));
    assert_eq!(request.social.x, None);
    assert_eq!(request.industry.as_deref(), Some("Beverages"));
    assert!(request.validate().is_ok());
}

#[test]
fn parses_status_with_job_id() {
    let id = Uuid::new_v4().to_string();
    let cli = Cli::try_parse_from(["brandscan", "status", &id]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Status { job_id }) if job_id.to_string() == id));
}

#[test]
fn status_rejects_malformed_job_id() {
    assert!(Cli::try_parse_from(["brandscan", "status", "not-a-uuid"]).is_err());
}

#[test]
fn parses_sweep_purge_cache() {
    let cli = Cli::try_parse_from(["brandscan", "sweep", "purge-cache"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Sweep {
            command: SweepCommands::PurgeCache
        })
    ));
}

#[test]
fn parses_sweep_stale() {
    let cli =
        Cli::try_parse_from(["brandscan", "sweep", "stale"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Sweep {
            command: SweepCommands::Stale
        })
    ));
}

#[test]
fn state_summary_includes_scores_when_completed() {
    let result = ScanResult::from_output(serde_json::json!({
        "search_visibility_score": 80,
        "summary": "Strong search presence.",
    }));
    let state = JobState {
        status: JobStatus::Completed,
        handle: None,
        result: Some(result),
        error: None,
    };

    let id = Uuid::new_v4();
    let summary = scan::state_summary(id, &state);
    assert_eq!(summary["job_id"], id.to_string());
    assert_eq!(summary["status"], "completed");
    assert_eq!(summary["pillar_scores"]["search_visibility"], 80);
    assert_eq!(summary["summary"], "Strong search presence.");
    assert!(summary["overall_score"].is_u64());
    assert!(summary.get("error").is_none());
}

#[test]
fn state_summary_carries_error_when_failed() {
    let state = JobState {
        status: JobStatus::Failed,
        handle: None,
        result: None,
        error: Some("analysis run expired".to_string()),
    };

    let summary = scan::state_summary(Uuid::new_v4(), &state);
    assert_eq!(summary["status"], "failed");
    assert_eq!(summary["error"], "analysis run expired");
    assert!(summary.get("overall_score").is_none());
}
