use clap::{Arg, Command};
use clicksafe::model::RiskAssessment;
use clicksafe::{Analyzer, Config, InMemoryStore};
use log::LevelFilter;
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("clicksafe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("URL risk scoring: reputation lookups fused with heuristic analysis")
        .arg(
            Arg::new("url")
                .value_name("URL")
                .help("URL to assess")
                .index(1),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (YAML)"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Write a default configuration file and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Emit the full assessment as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-network")
                .long("no-network")
                .help("Skip heuristics that need outbound lookups (WHOIS, DNS, TLS, redirects)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        match Config::default().to_file(generate_path) {
            Ok(()) => {
                println!("Default configuration written to {generate_path}");
                return;
            }
            Err(e) => {
                eprintln!("Error writing configuration: {e}");
                process::exit(1);
            }
        }
    }

    let config = match matches.get_one::<String>("config") {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading configuration: {e}");
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    let url = match matches.get_one::<String>("url") {
        Some(url) => url.clone(),
        None => {
            eprintln!("Error: a URL argument is required (or use --generate-config)");
            process::exit(2);
        }
    };

    let analyzer = Analyzer::new(config)
        .with_store(Box::new(InMemoryStore::new()))
        .with_network(!matches.get_flag("no-network"));

    let assessment = tokio::select! {
        result = analyzer.assess(&url) => match result {
            Ok(assessment) => assessment,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(2);
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
            process::exit(130);
        }
    };

    if matches.get_flag("json") {
        match serde_json::to_string_pretty(&assessment) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing assessment: {e}");
                process::exit(1);
            }
        }
    } else {
        print_report(&assessment);
    }

    // shell-friendly verdict: 0 safe, 1 suspicious or worse
    match assessment.band {
        clicksafe::RiskBand::Safe => {}
        _ => process::exit(1),
    }
}

fn print_report(assessment: &RiskAssessment) {
    println!("URL:        {}", assessment.url);
    if assessment.normalized_url != assessment.url {
        println!("Normalized: {}", assessment.normalized_url);
    }
    println!(
        "Verdict:    {} ({:.1}/100)",
        assessment.band.label(),
        assessment.final_score
    );
    println!(
        "Scores:     reputation {:.1}, heuristics {}{}",
        assessment.reputation_score,
        assessment
            .heuristic_score
            .map(|s| format!("{s:.1}"))
            .unwrap_or_else(|| "n/a".to_string()),
        if assessment.fusion_degraded {
            " (degraded: reputation only)"
        } else {
            ""
        }
    );

    println!("Reputation: {}", assessment.reputation_status.label());
    for check in &assessment.reputation_checks {
        let elapsed = check
            .elapsed_ms
            .map(|ms| format!(" [{ms}ms]"))
            .unwrap_or_default();
        println!(
            "  {:<11} {} ({}){}",
            check.source.label(),
            check.status.label(),
            check.reason,
            elapsed
        );
    }

    let triggered: Vec<_> = assessment.hits.iter().filter(|h| h.triggered).collect();
    if triggered.is_empty() {
        println!("Heuristics: no checks triggered");
    } else {
        println!("Heuristics: {} check(s) triggered", triggered.len());
        for hit in triggered {
            println!("  [{:<8}] {}: {}", hit.severity.label(), hit.code, hit.details);
        }
    }

    println!();
    println!("{}", assessment.explanation);
}
