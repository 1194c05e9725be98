// Main entry point for grpctestify

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

// Import form library
use grpctestify::cli;
use grpctestify::config;
use grpctestify::execution;
use grpctestify::grpc;
use grpctestify::parser;
use grpctestify::report;
use grpctestify::utils;

use cli::{
    args::{CheckArgs, ListArgs, RunArgs},
    Cli, Commands, LogFormat,
};
use report::{AllureReporter, ConsoleReporter, JsonReporter, JunitReporter, Reporter, StreamingJsonReporter};
use utils::FileUtils;

use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Install the default crypto provider (ring) to avoid panics with rustls 0.23+
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Load configuration from file (if exists)
    let config = config::Config::load();

    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose {
        "grpctestify=debug,warn"
    } else {
        "grpctestify=warn,error"
    };

    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .event_format(grpctestify::logging::CustomFormatter)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    if cli.verbose {
        info!("Starting grpctestify v{}", env!("CARGO_PKG_VERSION"));
    }

    // Handle config flag
    if cli.config {
        println!("Current configuration:");
        println!("\n  Command-line arguments:");
        let args = cli.get_run_args();
        println!("    Parallel jobs: {}", args.parallel);
        println!("    Sort mode: {}", args.sort);
        println!("    Timeout: {}s", args.timeout);
        println!(
            "    Retry: {} times, {}s delay",
            args.retry, args.retry_delay
        );
        if let Some(ref log_format) = args.log_format {
            println!("    Log format: {}", log_format);
        }
        if let Some(ref log_output) = args.log_output {
            println!("    Log output: {}", log_output.display());
        }

        if let Some(cfg) = config {
            println!("\n  Configuration file loaded:");
            if !cfg.general.address.is_empty() {
                println!("    Address: {}", cfg.general.address);
            }
            if !cfg.general.parallel.is_empty() {
                println!("    Parallel: {}", cfg.general.parallel);
            }
            if cfg.general.timeout != 0 {
                println!("    Timeout: {}s", cfg.general.timeout);
            }
            if cfg.general.retry != 0 {
                println!("    Retry: {} times", cfg.general.retry);
            }
            if cfg.general.retry_delay != 0.0 {
                println!("    Retry delay: {}s", cfg.general.retry_delay);
            }
            if let Some(ref log_format) = cfg.general.log_format {
                println!("    Log format: {}", log_format);
            }
            if let Some(ref log_output) = cfg.general.log_output {
                println!("    Log output: {}", log_output);
            }
            println!("    Progress mode: {}", cfg.progress.mode);
            println!(
                "    Color: {}",
                if cfg.progress.color {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            if cfg.coverage.enabled {
                println!("    Coverage: enabled");
                if let Some(ref output) = cfg.coverage.output {
                    println!("      Output: {}", output);
                }
            }
        } else {
            println!("\n  No configuration file loaded");
            println!("  Create one with: grpctestify --init-config .grpctestifyrc.toml");
        }

        println!("\n  Environment variables:");
        if let Ok(addr) = std::env::var(config::ENV_GRPCTESTIFY_ADDRESS) {
            println!("    {}: {}", config::ENV_GRPCTESTIFY_ADDRESS, addr);
        } else {
            println!(
                "    {}: not set (default: {})",
                config::ENV_GRPCTESTIFY_ADDRESS,
                config::default_address()
            );
        }

        println!("\nConfiguration precedence:");
        println!("  1. Command-line arguments (highest)");
        println!("  2. Configuration file");
        println!("  3. Environment variables");
        println!("  4. Built-in defaults (lowest)");

        return Ok(());
    }

    // Handle init_config flag
    if let Some(config_file) = cli.init_config {
        let config = config::Config::default();
        let toml_content = config.to_toml();
        std::fs::write(&config_file, toml_content)?;
        println!("Configuration file created: {}", config_file.display());
        println!("\nYou can now edit the file to customize your settings.");
        println!("\nConfiguration precedence:");
        println!("  1. Command-line arguments (highest)");
        println!("  2. Configuration file");
        println!("  3. Environment variables");
        println!("  4. Built-in defaults (lowest)");
        return Ok(());
    }

    // Handle completion flag
    if let Some(shell_type) = cli.completion {
        handle_completion(&shell_type)?;
        return Ok(());
    }

    match &cli.command {
        Some(Commands::Check(args)) => handle_check(args).await,
        Some(Commands::List(args)) => handle_list(args),
        Some(Commands::Run(args)) => run_tests(&cli, args).await,
        None => {
            // Implicit Run
            let args = cli.run_args.clone();
            if args.test_paths.is_empty() {
                // No paths provided. If dry-run is set, maybe okay?
                // But usually we expect paths.
                // Since `test_paths` is not required in Clap (to avoid conflict), we check here.
                warn!("No test files provided. Use 'grpctestify --help' for usage.");
                return Ok(());
            }
            run_tests(&cli, &args).await
        }
    }
}

fn handle_completion(shell_type: &str) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell};

    let shell = match shell_type {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "elvish" => Shell::Elvish,
        "powershell" => Shell::PowerShell,
        _ => {
            eprintln!("Error: Unsupported shell type '{}'", shell_type);
            eprintln!("Supported shells: bash, zsh, fish, elvish, powershell");
            return Err(anyhow::anyhow!("Unsupported shell type"));
        }
    };

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, &bin_name, &mut std::io::stdout());

    Ok(())
}



fn handle_list(args: &ListArgs) -> Result<()> {
    let path = args.path.as_ref().map(|p| p.as_path()).unwrap_or_else(|| Path::new("."));

    if !path.exists() {
        error!("Path not found: {}", path.display());
        std::process::exit(1);
    }

    let files = FileUtils::collect_test_files(path);

    if args.format == "json" {
        let tests: Vec<serde_json::Value> = files
            .iter()
            .map(|file| {
                let relative = file.strip_prefix(path).unwrap_or(file);
                let id = relative.to_string_lossy().replace('\\', "/");
                let label = file.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| id.clone());
                let uri = format!("file://{}", file.canonicalize()
                    .unwrap_or_else(|_| file.to_path_buf())
                    .to_string_lossy()
                    .replace('\\', "/"));

                let mut test = serde_json::json!({
                    "id": id,
                    "label": label,
                    "uri": uri,
                    "children": []
                });

                if args.with_range {
                    if let Ok(doc) = parser::parse_gctf(file) {
                        let line_count = doc.metadata.source
                            .as_ref()
                            .map(|s| s.lines().count())
                            .unwrap_or(1);
                        test["range"] = serde_json::json!({
                            "start": {"line": 1, "column": 1},
                            "end": {"line": line_count, "column": 1}
                        });
                    }
                }

                test
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "tests": tests }))?);
    } else {
        for file in &files {
            println!("{}", file.display());
        }
    }

    Ok(())
}


async fn handle_check(args: &CheckArgs) -> Result<()> {
    use report::{CheckReport, CheckSummary, Diagnostic, DiagnosticSeverity};

    let mut files = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut files_with_errors = 0;

    for path in &args.files {
        if path.is_dir() {
            files.extend(FileUtils::collect_test_files(path));
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            diagnostics.push(Diagnostic::error(
                &path.to_string_lossy(),
                "FILE_NOT_FOUND",
                "Path not found",
                1,
            ));
            files_with_errors += 1;
        }
    }

    if files.is_empty() {
    if args.format == "json" {
        let total_errors = diagnostics.iter().filter(|d| matches!(d.severity, DiagnosticSeverity::Error)).count();
        let total_warnings = diagnostics.iter().filter(|d| matches!(d.severity, DiagnosticSeverity::Warning)).count();
        let report = CheckReport {
            diagnostics,
            summary: CheckSummary {
                total_files: files.len(),
                files_with_errors,
                total_errors,
                total_warnings,
            },
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
        return Ok(());
    }

    info!("Checking {} file(s)...", files.len());

    for file in &files {
        let file_str = file.to_string_lossy().to_string();
        match parser::parse_gctf(file) {
            Ok(doc) => {
                // Check for deprecated HEADERS using AST section types
                for section in &doc.sections {
                    // Parser normalizes HEADERS to REQUEST_HEADERS, but we can check raw content
                    if let Some(source) = &doc.metadata.source {
                        let lines: Vec<&str> = source.lines().collect();
                        if section.start_line < lines.len() {
                            let line = lines[section.start_line].trim();
                            if line.to_uppercase() == "--- HEADERS ---" {
                                diagnostics.push(Diagnostic::warning(
                                    &file_str,
                                    "DEPRECATED_SECTION",
                                    "HEADERS section is deprecated, use REQUEST_HEADERS instead",
                                    section.start_line + 1,
                                ).with_hint("Replace --- HEADERS --- with --- REQUEST_HEADERS ---"));
                            }
                        }
                    }
                }

                if let Err(e) = parser::validate_document(&doc) {
                    diagnostics.push(Diagnostic::error(
                        &file_str,
                        "VALIDATION_ERROR",
                        &e.to_string(),
                        1,
                    ));
                    files_with_errors += 1;
                } else if args.format != "json" {
                    println!("{} ... OK", file.display());
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    &file_str,
                    "PARSE_ERROR",
                    &e.to_string(),
                    1,
                ));
                files_with_errors += 1;
            }
        }
    }

    if args.format == "json" {
        let total_errors = diagnostics.iter().filter(|d| matches!(d.severity, DiagnosticSeverity::Error)).count();
        let total_warnings = diagnostics.iter().filter(|d| matches!(d.severity, DiagnosticSeverity::Warning)).count();
        let report = CheckReport {
            diagnostics,
            summary: CheckSummary {
                total_files: files.len(),
                files_with_errors,
                total_errors,
                total_warnings,
            },
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if files_with_errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_tests(cli: &Cli, args: &RunArgs) -> Result<()> {
    // Get parallel job count
    let parallel_jobs = execution::OrchestratorConfig::resolve_parallel_jobs(&args.parallel);
    info!("Parallel jobs: {}", parallel_jobs);

    // Handle dry-run mode
    if args.dry_run {
        info!("Dry-run mode enabled");
    }

    if args.no_assert {
        info!("No-assert mode enabled (skipping assertions)");
    }

    // Collect test files
    let mut test_files = Vec::new();
    for path in &args.test_paths {
        if path.is_dir() {
            test_files.extend(FileUtils::collect_test_files_with_depth(
                path,
                args.max_depth,
            ));
        } else if path.is_file() {
            test_files.push(path.clone());
        }
    }

    // Apply --filter/--exclude, then dedup overlapping search roots
    test_files = FileUtils::filter_files(
        test_files,
        args.filter.as_deref(),
        args.exclude.as_deref(),
    )?;
    test_files = FileUtils::dedup_files(test_files);

    info!("Found {} test file(s)", test_files.len());

    if test_files.is_empty() {
        warn!("No test files found");
        return Ok(());
    }

    // Sort files
    FileUtils::sort_files(&mut test_files, &args.sort);

    if args.stream {
        // Silent mode - streaming output only
    } else if test_files.len() == 1 {
        println!(
            "ℹ️  INFO [{}]: Running 1 test sequentially...",
            chrono::Local::now().format("%H:%M:%S")
        );
    } else if parallel_jobs <= 1 {
        println!(
            "ℹ️  INFO [{}]: Running {} test(s) sequentially...",
            chrono::Local::now().format("%H:%M:%S"),
            test_files.len()
        );
    } else {
        println!(
            "ℹ️  INFO [{}]: Running {} test(s) in parallel (jobs: {})...",
            chrono::Local::now().format("%H:%M:%S"),
            test_files.len(),
            parallel_jobs
        );
    }

    // Setup Reporters
    let mut reporters: Vec<Box<dyn Reporter>> = Vec::new();

    // Create environment info
    let env_info = report::console::EnvironmentInfo {
        address: std::env::var(config::ENV_GRPCTESTIFY_ADDRESS)
            .unwrap_or_else(|_| config::default_address()),
        parallel_jobs,
        sort_mode: args.sort.clone(),
        dry_run: args.dry_run,
    };

    // Add streaming JSON reporter if --stream is enabled
    if args.stream {
        reporters.push(Box::new(StreamingJsonReporter::new(test_files.len())));
    } else {
        // Always add console reporter (unless streaming)
        reporters.push(Box::new(ConsoleReporter::new(
            cli.progress_mode(),
            test_files.len() as u64,
            env_info,
        )));
    }

    // Add file reporter if configured
    if let Some(format) = cli.log_format_mode() {
        if let Some(output_path) = &args.log_output {
            match format {
                LogFormat::Json => {
                    reporters.push(Box::new(JsonReporter::new(output_path.clone())));
                }
                LogFormat::JUnit => {
                    reporters.push(Box::new(JunitReporter::new(output_path.clone())));
                }
                LogFormat::Allure => {
                    reporters.push(Box::new(AllureReporter::new(output_path.clone())));
                }
                _ => {}
            }
        } else {
            warn!(
                "--log-format specified but --log-output is missing. File report will be skipped."
            );
        }
    }

    // Initialize Coverage Collector if requested
    let coverage_collector = if args.coverage {
        Some(Arc::new(report::CoverageCollector::new()))
    } else {
        None
    };

    // Execute tests
    let start_time = std::time::Instant::now();
    let retry_config = if args.no_retry {
        grpc::RetryConfig::disabled()
    } else {
        grpc::RetryConfig::new(args.retry, args.retry_delay)
    };
    let runner = Arc::new(execution::TestRunner::with_retry(
        args.dry_run,
        args.timeout,
        args.no_assert,
        args.write,
        cli.verbose,
        coverage_collector.clone(),
        retry_config,
    ));

    // Move reporters to Arc
    let reporters: Arc<Vec<Box<dyn Reporter>>> = Arc::new(reporters);

    let orchestrator_config = execution::OrchestratorConfig::new(
        parallel_jobs,
        std::time::Duration::from_secs(args.timeout),
        args.fail_fast,
    );
    let orchestrator =
        execution::Orchestrator::new(runner.clone(), reporters.clone(), orchestrator_config);

    let outcome = orchestrator.run(test_files).await?;
    if outcome.cancelled {
        warn!("run stopped early (fail-fast or interrupt)");
    }
    let mut test_results = outcome.results;

    // Update metrics
    let total_duration = start_time.elapsed().as_millis() as u64;
    test_results.metrics.total_duration_ms = total_duration;
    test_results.metrics.parallel_jobs = parallel_jobs;

    // Notify suite end
    for r in reporters.iter() {
        r.on_suite_end(&test_results)?;
    }

    // Print Coverage Report if enabled
    if let Some(collector) = coverage_collector {
        if args.coverage_format == "json" {
            let report = collector.generate_json_report();
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            let report = collector.generate_text_report();
            if !args.stream {
                println!("\n{}", report);
            }
        }
    }

    if !test_results.all_passed() {
        std::process::exit(1);
    }

    Ok(())
}

