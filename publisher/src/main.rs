//! `boxpub` command-line entrypoint.
//!
//! Publishes one box and prints its URL on stdout. Progress and errors go to
//! stderr.

use boxpub_publisher::cli::Cli;
use boxpub_publisher::error::{PublisherError, Result};
use boxpub_publisher::output::write_stderr_line;
use boxpub_publisher::pipeline::publish;
use boxpub_publisher::settings::resolve_settings;
use clap::Parser;
use log::debug;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let settings = resolve_settings(cli.config.as_deref(), cli.settings_overlay())?;
    debug!("publishing with {settings:?}");

    let outcome = publish(&settings, &cli.artifact(), cli.quiet, stderr)?;
    writeln!(stdout, "{}", outcome.url).map_err(|source| PublisherError::WriteFailed { source })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxpub_publisher::settings::ACCESS_KEY_ENV;

    fn cli(args: &[&str]) -> Cli {
        let argv = std::iter::once("boxpub").chain(args.iter().copied());
        temp_env::with_var_unset(ACCESS_KEY_ENV, || Cli::parse_from(argv))
    }

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let err = PublisherError::WriteFailed {
            source: std::io::Error::other("stdout closed"),
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.contains("error: failed to write output"));
    }

    #[test]
    fn run_reports_every_missing_setting_before_publishing() {
        let cli = cli(&["-b", "virtualbox", "out/base.box"]);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let err = run(&cli, &mut stdout, &mut stderr).expect_err("settings are incomplete");
        let text = err.to_string();
        for key in ["storage_account_name", "container_name", "access_key", "box_dir"] {
            assert!(text.contains(&format!("{key} must be set")), "{text}");
        }
        assert!(stdout.is_empty());
        assert!(stderr.is_empty());
    }

    #[test]
    fn run_rejects_missing_settings_file() {
        let cli = cli(&[
            "--config",
            "/nonexistent/boxpub.toml",
            "-b",
            "virtualbox",
            "out/base.box",
        ]);
        let err = run(&cli, &mut Vec::new(), &mut Vec::new()).expect_err("missing file");
        assert!(matches!(err, PublisherError::Settings(_)));
    }
}
