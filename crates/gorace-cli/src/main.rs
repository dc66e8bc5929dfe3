use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use gorace_core::config::{self, CONFIG_FILE_NAME, DEFAULT_CONFIG_TOML};
use gorace_core::orchestrator;
use gorace_diagnostics::rules;

#[derive(Parser)]
#[command(name = "gorace")]
#[command(about = "Static data race detector for Go")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a Go program (bridge IR JSON) for data races
    Check {
        /// IR file produced by the Go bridge
        ir_file: PathBuf,
        /// Output format: human, json
        #[arg(long, default_value = "human")]
        format: String,
        /// Severity threshold: info, warning, error, critical
        #[arg(long)]
        severity: Option<String>,
        /// Max diagnostics to report (0 = unlimited)
        #[arg(long)]
        max_diagnostics: Option<usize>,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
        /// Package to analyze interprocedurally (repeatable, overrides gorace.toml)
        #[arg(long = "package")]
        packages: Vec<String>,
    },
    /// Explain a rule in detail
    Explain {
        /// Rule code (e.g., RACE001)
        rule: String,
    },
    /// List all rules
    Rules {
        /// Output format: human, json
        #[arg(long, default_value = "human")]
        format: String,
    },
    /// Create gorace.toml in the current directory
    Init,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Log to stderr so stdout stays clean for machine output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    match cli.command {
        Commands::Check {
            ir_file,
            format,
            severity,
            max_diagnostics,
            no_color,
            packages,
        } => run_check(CheckArgs {
            ir_file,
            format,
            severity_override: severity,
            max_diagnostics,
            no_color,
            packages,
        }),
        Commands::Explain { rule } => run_explain(&rule),
        Commands::Rules { format } => run_rules(&format),
        Commands::Init => run_init(),
    }
}

struct CheckArgs {
    ir_file: PathBuf,
    format: String,
    severity_override: Option<String>,
    max_diagnostics: Option<usize>,
    no_color: bool,
    packages: Vec<String>,
}

fn run_check(args: CheckArgs) -> ExitCode {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut config = config::load_config(&cwd);

    if let Some(sev) = args.severity_override {
        config.gorace.severity_threshold = sev;
    }
    if let Some(max) = args.max_diagnostics {
        config.gorace.max_diagnostics = max;
    }
    if !args.packages.is_empty() {
        config.scope.packages = args.packages;
    }

    match orchestrator::analyze_file(&args.ir_file, &config) {
        Ok(output) => {
            for err in &output.analysis_errors {
                eprintln!("warning: entry skipped: {err}");
            }

            match args.format.as_str() {
                "json" => {
                    let json = serde_json::to_string_pretty(&output.diagnostics)
                        .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
                    println!("{json}");
                }
                _ => {
                    let text = gorace_diagnostics::human::format_human(
                        &output.diagnostics,
                        !args.no_color,
                    );
                    print!("{text}");
                }
            }

            // Exit code: 0 clean, 1 races found
            if output.summary.critical > 0 || output.summary.error > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run_explain(rule: &str) -> ExitCode {
    let Some(info) = rules::get_rule(&rule.to_uppercase()) else {
        eprintln!("Unknown rule: {rule}. Use 'gorace rules' to see available rules.");
        return ExitCode::from(2);
    };

    let mut text = format!(
        "{}: {}\n\n{}\n\nSeverity: {}",
        info.code, info.name, info.description, info.severity
    );
    if let Some(bad) = &info.example_bad {
        text.push_str(&format!("\n\nExample:\n{}", indent(bad)));
    }
    if let Some(good) = &info.example_good {
        text.push_str(&format!("\n\nFix:\n{}", indent(good)));
    }
    if let Some(idiom) = &info.go_idiom {
        text.push_str(&format!("\n\n{idiom}."));
    }
    println!("{text}");
    ExitCode::SUCCESS
}

fn indent(code: &str) -> String {
    code.lines()
        .map(|l| format!("  {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn run_rules(format: &str) -> ExitCode {
    let all = rules::get_all_rules();
    if format == "json" {
        let json = serde_json::to_string_pretty(&all)
            .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
        println!("{json}");
        return ExitCode::SUCCESS;
    }
    for rule in &all {
        println!("{:<8} {:<9} {}", rule.code, rule.severity.to_string(), rule.name);
    }
    ExitCode::SUCCESS
}

fn run_init() -> ExitCode {
    let config_path = Path::new(CONFIG_FILE_NAME);
    if config_path.exists() {
        eprintln!("{CONFIG_FILE_NAME} already exists");
        return ExitCode::from(2);
    }

    match std::fs::write(config_path, DEFAULT_CONFIG_TOML) {
        Ok(()) => {
            println!("Created {CONFIG_FILE_NAME}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
