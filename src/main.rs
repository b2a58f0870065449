use clap::{arg, command, value_parser, Command};
use colored::Colorize;
use session_check::location::FileName;
use session_check::{CheckConfig, CheckResult, ExecutionMode, Program};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "session_check=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = command!()
        .subcommand_required(true)
        .subcommand(
            Command::new("check")
                .about("Check the session correlation of programs")
                .arg(
                    arg!(<file> ... "Programs in the JSON interchange format")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(arg!(--single "Check as a single-execution service"))
                .arg(arg!(--json "Print diagnostics as JSON")),
        )
        .subcommand(
            Command::new("fmt")
                .about("Print a program in normalized interchange form")
                .arg(arg!(<file> "The program to print").value_parser(value_parser!(PathBuf))),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("check", args)) => {
            let files: Vec<PathBuf> = args
                .get_many::<PathBuf>("file")
                .into_iter()
                .flatten()
                .cloned()
                .collect();
            let config = CheckConfig {
                execution: args.get_flag("single").then_some(ExecutionMode::Single),
                ..CheckConfig::default()
            };
            run_check(&files, &config, args.get_flag("json"))
        }
        Some(("fmt", args)) => match args.get_one::<PathBuf>("file") {
            Some(file) => run_fmt(file),
            None => ExitCode::FAILURE,
        },
        _ => unreachable!(),
    }
}

fn read(file: &Path) -> Option<String> {
    match std::fs::read_to_string(file) {
        Ok(source) => Some(source),
        Err(error) => {
            eprintln!(
                "{}: {}",
                format!("Could not read {}", file.display()).bright_red(),
                error
            );
            None
        }
    }
}

fn run_check(files: &[PathBuf], config: &CheckConfig, json: bool) -> ExitCode {
    let mut all_valid = true;
    let mut diagnostics = Vec::new();

    for file in files {
        let Some(source) = read(file) else {
            all_valid = false;
            continue;
        };
        let result = match CheckResult::from_json(&source, FileName::from(file.as_path()), config)
        {
            Ok(result) => result,
            Err(error) => {
                eprintln!("{:?}", error.to_report());
                all_valid = false;
                continue;
            }
        };

        all_valid &= result.valid;
        if json {
            diagnostics.extend(result.diagnostics);
            continue;
        }
        if result.valid {
            println!("{} {}", "ok".bright_green(), file.display());
        } else {
            println!("{} {}", "invalid".bright_red(), file.display());
            for report in result.reports() {
                eprintln!("{:?}", report);
            }
        }
    }

    if json {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(text) => println!("{}", text),
            Err(error) => {
                eprintln!("{}", error);
                return ExitCode::FAILURE;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_fmt(file: &Path) -> ExitCode {
    let Some(source) = read(file) else {
        return ExitCode::FAILURE;
    };
    match Program::from_json(&source, FileName::from(file)) {
        Ok(program) => {
            println!("{}", program.to_json());
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{:?}", error.to_report());
            ExitCode::FAILURE
        }
    }
}
