//! medsign - render, inspect and verify medical documents
//!
//! Usage:
//!   medsign render <document.json> [-o out.pdf] [--sign cert.p12] [--reason R] [--location L] [--config engine.json]
//!   medsign inspect <file.pdf>
//!   medsign verify <file.pdf> [--hash HEX] [--config engine.json]
//!
//! The certificate password is read from MEDSIGN_CERT_PASSWORD.
//! Set RUST_LOG=debug for detailed logs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use medsign::service::{DocumentService, IssueFailure};
use medsign::signatures::{get_signature_info, verify_integrity, HashAlgorithm, SignOptions, SignatureVerifier};
use medsign::{EngineConfig, MedicalDocument};
use zeroize::Zeroizing;

const PASSWORD_VAR: &str = "MEDSIGN_CERT_PASSWORD";

const USAGE: &str = "Usage:
  medsign render <document.json> [-o out.pdf] [--sign cert.p12] [--reason R] [--location L] [--config engine.json]
  medsign inspect <file.pdf>
  medsign verify <file.pdf> [--hash HEX] [--config engine.json]";

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Default)]
struct Args {
    command: String,
    input: PathBuf,
    output: Option<PathBuf>,
    certificate: Option<PathBuf>,
    reason: Option<String>,
    location: Option<String>,
    config: Option<PathBuf>,
    hash: Option<String>,
}

impl Args {
    fn parse() -> Result<Self, String> {
        Self::parse_from(std::env::args().skip(1))
    }

    /// Parse `raw` arguments, program name excluded. `Err("")` means help.
    fn parse_from(raw: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let raw: Vec<String> = raw.into_iter().collect();
        let mut args = Args::default();
        let mut positional = Vec::new();

        let mut i = 0;
        while i < raw.len() {
            let flag = raw[i].as_str();
            let mut value = || {
                i += 1;
                raw.get(i).cloned().ok_or_else(|| format!("{} requires a value", flag))
            };
            match flag {
                "-o" | "--output" => args.output = Some(PathBuf::from(value()?)),
                "--sign" => args.certificate = Some(PathBuf::from(value()?)),
                "--reason" => args.reason = Some(value()?),
                "--location" => args.location = Some(value()?),
                "--config" => args.config = Some(PathBuf::from(value()?)),
                "--hash" => args.hash = Some(value()?),
                "-h" | "--help" => return Err(String::new()),
                other if other.starts_with('-') => return Err(format!("unknown option {}", other)),
                other => positional.push(other.to_string()),
            }
            i += 1;
        }

        match positional.as_slice() {
            [command, input] => {
                args.command = command.clone();
                args.input = PathBuf::from(input);
                Ok(args)
            },
            _ => Err("expected a command and one input file".to_string()),
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    Ok(match path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    })
}

fn render(args: &Args) -> CliResult<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let service = DocumentService::new(config)?;
    let mut document = MedicalDocument::from_json(&std::fs::read_to_string(&args.input)?)?;

    let request = match &args.certificate {
        Some(path) => {
            let password = Zeroizing::new(
                std::env::var(PASSWORD_VAR).map_err(|_| format!("{} is not set", PASSWORD_VAR))?,
            );
            let mut options = SignOptions::default()
                .with_reserve_bytes(service.config().signature_reserve_bytes)
                .allow_resign(true);
            if let Some(reason) = &args.reason {
                options = options.with_reason(reason.clone());
            }
            if let Some(location) = &args.location {
                options = options.with_location(location.clone());
            }
            Some(
                service
                    .signing_request(std::fs::read(path)?, password.as_str())
                    .with_options(options),
            )
        },
        None => None,
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("pdf"));
    let document_type = document.document_type();

    match service.issue(document_type, &mut document, request) {
        Ok(outcome) => {
            for warning in &outcome.validation.warnings {
                eprintln!("warning: {}", warning);
            }
            for notice in &outcome.notices {
                eprintln!("notice: {}", notice);
            }
            std::fs::write(&output, &outcome.document_bytes)?;
            println!("Wrote {} ({} bytes)", output.display(), outcome.document_bytes.len());
            if let Some(signature) = &outcome.signature {
                println!("{}", serde_json::to_string_pretty(signature)?);
            }
            Ok(ExitCode::SUCCESS)
        },
        Err(IssueFailure::Rejected(validation)) => {
            for error in &validation.errors {
                eprintln!("error: {}", error);
            }
            for warning in &validation.warnings {
                eprintln!("warning: {}", warning);
            }
            Ok(ExitCode::from(2))
        },
        Err(failure) => {
            eprintln!("error: {}", failure);
            if let Some(bytes) = failure.unsigned_bytes() {
                std::fs::write(&output, bytes)?;
                eprintln!("Wrote unsigned document to {}", output.display());
            }
            Ok(ExitCode::FAILURE)
        },
    }
}

fn inspect(args: &Args) -> CliResult<ExitCode> {
    let pdf = std::fs::read(&args.input)?;
    match get_signature_info(&pdf) {
        Some(info) => {
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(ExitCode::SUCCESS)
        },
        None => {
            println!("{}: no signature", args.input.display());
            Ok(ExitCode::from(3))
        },
    }
}

fn verify(args: &Args) -> CliResult<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let pdf = std::fs::read(&args.input)?;

    let report = SignatureVerifier::new(&config).verify(&pdf)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    let mut ok = report.status.is_ok();

    if let Some(hash) = &args.hash {
        match verify_integrity(&pdf, hash, HashAlgorithm::Sha256) {
            Ok(()) => println!("Integrity: OK"),
            Err(e) => {
                println!("Integrity: {}", e);
                ok = false;
            },
        }
    }
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match Args::parse() {
        Ok(args) => args,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("Error: {}", message);
            }
            eprintln!("{}", USAGE);
            return ExitCode::from(64);
        },
    };

    let result = match args.command.as_str() {
        "render" => render(&args),
        "inspect" => inspect(&args),
        "verify" => verify(&args),
        other => {
            eprintln!("Error: unknown command {}", other);
            eprintln!("{}", USAGE);
            return ExitCode::from(64);
        },
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
