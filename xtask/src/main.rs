use std::fs;
use std::io::{Seek, Write};
use std::path::Path;
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use zip::result::ZipResult;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_PACKAGE: &str = "edge_redirect_lambda";
const LAMBDA_BIN: &str = "origin_response_lambda";
const DIST_DIR: &str = "dist";
const ARTIFACT_NAME: &str = "origin_response.zip";
const BOOTSTRAP_ENTRY: &str = "bootstrap";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the directory redirect workspace",
    long_about = "A unified CLI for CI checks and Lambda@Edge packaging in the\n\
                  directory redirect workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks (fmt, clippy, tests)
    Ci,
    /// Build the origin-response binary and package it as a Lambda zip
    Package {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
        /// Bucket baked into the binary (Lambda@Edge has no environment variables)
        #[arg(long, env = "DIRECTORY_REDIRECT_BUCKET")]
        bucket: Option<String>,
        /// Region baked into the binary
        #[arg(long, env = "DIRECTORY_REDIRECT_REGION")]
        region: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str], envs: &[(&str, &str)]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .envs(envs.iter().copied())
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    run_cargo_with_env(args, &[]);
}

fn run_cargo_with_env(args: &[&str], envs: &[(&str, &str)]) {
    let status = cargo(args, envs);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn package_lambda(
    target: &str,
    profile: BuildProfile,
    bucket: Option<&str>,
    region: Option<&str>,
) {
    ensure_rust_target_installed(target);

    if bucket.is_none() {
        eprintln!(
            "warning: no bucket baked in; the function will need DIRECTORY_REDIRECT_BUCKET at runtime, which Lambda@Edge does not provide"
        );
    }

    step("Build origin-response lambda binary");

    let mut cargo_args = vec![
        "build",
        "-p",
        LAMBDA_PACKAGE,
        "--target",
        target,
        "--bin",
        LAMBDA_BIN,
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }

    let mut envs = Vec::new();
    if let Some(value) = bucket {
        envs.push(("DIRECTORY_REDIRECT_BUCKET", value));
    }
    if let Some(value) = region {
        envs.push(("DIRECTORY_REDIRECT_REGION", value));
    }
    run_cargo_with_env(&cargo_args, &envs);

    step("Package lambda zip artifact");
    let target_dir = Path::new("target").join(target).join(profile.dir_name());
    let dist_dir = Path::new(DIST_DIR);
    fs::create_dir_all(dist_dir).expect("failed to create lambda dist directory");

    package_lambda_zip(
        &target_dir.join(binary_name(LAMBDA_BIN, target)),
        &dist_dir.join(ARTIFACT_NAME),
    );

    eprintln!(
        "\nPackaged artifact:\n- {}",
        dist_dir.join(ARTIFACT_NAME).display()
    );
}

fn ensure_rust_target_installed(target: &str) {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output();

    let output = match output {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); continuing without target preflight"
            );
            return;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "failed to list installed rust targets; run `rustup target list --installed` manually. details: {}",
            stderr.trim()
        );
    }

    let installed = String::from_utf8_lossy(&output.stdout);
    if !installed.lines().any(|line| line.trim() == target) {
        panic!(
            "required rust target `{target}` is not installed. install it with `rustup target add {target}` and re-run `cargo run -p xtask -- package`"
        );
    }
}

fn binary_name(bin_name: &str, target: &str) -> String {
    if target.contains("windows") {
        format!("{bin_name}.exe")
    } else {
        bin_name.to_string()
    }
}

/// Lambda custom runtimes start the executable named `bootstrap` at the
/// archive root.
fn package_lambda_zip(binary_path: &Path, zip_path: &Path) {
    let binary = fs::read(binary_path).unwrap_or_else(|error| {
        eprintln!(
            "expected lambda binary at '{}': {error}",
            binary_path.display()
        );
        exit(1);
    });
    let file = fs::File::create(zip_path).expect("failed to create lambda zip");

    if let Err(error) = write_bootstrap_zip(&binary, file) {
        eprintln!("failed to write '{}': {error}", zip_path.display());
        exit(1);
    }
}

fn write_bootstrap_zip<W: Write + Seek>(binary: &[u8], writer: W) -> ZipResult<W> {
    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file(BOOTSTRAP_ENTRY, options)?;
    zip.write_all(binary)?;
    zip.finish()
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test edge_redirect_core");
    run_cargo(&["test", "-p", "edge_redirect_core"]);

    step("Test edge_redirect_lambda");
    run_cargo(&["test", "-p", LAMBDA_PACKAGE]);

    step("Test xtask");
    run_cargo(&["test", "-p", "xtask"]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci => ci_check(),
        Commands::Package {
            target,
            profile,
            bucket,
            region,
        } => {
            package_lambda(&target, profile, bucket.as_deref(), region.as_deref());
        }
    }
}
