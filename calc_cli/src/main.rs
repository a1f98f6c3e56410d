//! # calgo CLI Application
//!
//! Terminal front end for calc_core.
//!
//! ```text
//! calc_cli "10 ft in m" "20% of 50"     # evaluate arguments, one line each
//! calc_cli --file budget.txt            # evaluate a sheet line by line
//! calc_cli --session budget.calc        # interactive, context persisted on exit
//! calc_cli --json "5 USD + 2"           # JSON outcomes for scripting
//! ```

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use calc_core::config::{validate_settings, CalcConfig};
use calc_core::file_io::{load_session_with_lock_check, save_session, FileLock, SessionFile};
use calc_core::{CalculatorContext, LineOutcome, Session};

#[derive(Parser, Debug)]
#[command(name = "calc_cli", version, about = "Unit-aware calculator")]
struct Cli {
    /// Expressions to evaluate, each treated as one line
    expressions: Vec<String>,

    /// Evaluate every line of this file
    #[arg(short, long, conflicts_with = "expressions")]
    file: Option<PathBuf>,

    /// Print outcomes as JSON, one object per line
    #[arg(long)]
    json: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session file to load at start and save at exit
    #[arg(short, long)]
    session: Option<PathBuf>,

    /// Timezone for date values (IANA name)
    #[arg(long)]
    timezone: Option<String>,

    /// Pixels per inch for screen-unit conversions
    #[arg(long)]
    ppi: Option<f64>,

    /// Font size in px for em/rem conversions
    #[arg(long)]
    em_size: Option<f64>,
}

impl Cli {
    fn load_config(&self) -> Result<CalcConfig> {
        let mut config = match &self.config {
            Some(path) => CalcConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
            None => CalcConfig::default(),
        };
        if let Some(tz) = &self.timezone {
            config.context.timezone = tz.clone();
        }
        if let Some(ppi) = self.ppi {
            config.context.ppi = ppi;
        }
        if let Some(em_size) = self.em_size {
            config.context.em_size = em_size;
        }
        config.validate()?;
        Ok(config)
    }

    /// Setting overrides given on the command line win over a loaded session.
    fn apply_overrides(&self, ctx: &mut CalculatorContext) -> Result<()> {
        if let Some(tz) = &self.timezone {
            ctx.timezone = tz.clone();
        }
        if let Some(ppi) = self.ppi {
            ctx.ppi = ppi;
        }
        if let Some(em_size) = self.em_size {
            ctx.em_size = em_size;
        }
        validate_settings(&ctx.timezone, ctx.ppi, ctx.em_size)?;
        Ok(())
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "calc_cli".to_string())
}

/// Lock the session file. A lock held elsewhere is not fatal: the session
/// is then opened read-only and nothing is saved.
fn lock_session(path: &Path) -> Result<Option<FileLock>> {
    match FileLock::acquire(path, current_user()) {
        Ok(lock) => Ok(Some(lock)),
        Err(err) if err.is_recoverable() => {
            warn!(path = %path.display(), "{}; changes will not be saved", err);
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn open_session(path: &Path, config: &CalcConfig, locked: bool) -> Result<SessionFile> {
    if !path.exists() {
        debug!(path = %path.display(), "starting new session file");
        return Ok(SessionFile::new(config.to_context()));
    }
    let (file, holder) = load_session_with_lock_check(path)?;
    info!(path = %path.display(), variables = file.context.len(), "loaded session");
    if let (false, Some(holder)) = (locked, holder) {
        warn!(
            user = %holder.user_id,
            machine = %holder.machine,
            since = %holder.locked_at.to_rfc3339(),
            "session is open elsewhere, running read-only"
        );
    }
    Ok(file)
}

fn print_outcome(out: &mut impl Write, outcome: &LineOutcome, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(outcome)?)?;
        return Ok(());
    }
    if let LineOutcome::Value { label, assigned, value } = outcome {
        match (label, assigned) {
            (Some(label), _) => writeln!(out, "{}: {}", label, value)?,
            (None, Some(name)) => writeln!(out, "{} = {}", name, value)?,
            (None, None) => writeln!(out, "{}", value)?,
        }
    }
    Ok(())
}

fn print_variables(out: &mut impl Write, ctx: &CalculatorContext) -> Result<()> {
    for name in ctx.variable_names() {
        if let Some(value) = ctx.get(name) {
            writeln!(out, "{} = {}", name, value)?;
        }
    }
    Ok(())
}

/// Interactive loop over `input` until EOF or `:quit`.
fn repl(session: &mut Session, input: &mut impl BufRead, out: &mut impl Write, json: bool) -> Result<()> {
    let mut line = String::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            ":quit" | ":q" => break,
            ":vars" => print_variables(out, session.context())?,
            text => {
                let outcome = session.evaluate_line(text);
                print_outcome(out, &outcome, json)?;
            }
        }
    }
    Ok(())
}

/// Evaluate whatever `cli` asks for, writing results to `out`.
///
/// Returns whether any evaluated line produced an error value.
fn run(cli: &Cli, config: &CalcConfig, input: &mut impl BufRead, out: &mut impl Write) -> Result<bool> {
    let lock = match &cli.session {
        Some(path) => lock_session(path)?,
        None => None,
    };

    let mut session_file = match &cli.session {
        Some(path) => Some(open_session(path, config, lock.is_some())?),
        None => None,
    };

    let mut context = match &session_file {
        Some(file) => file.context.clone(),
        None => config.to_context(),
    };
    cli.apply_overrides(&mut context)?;
    let mut session = Session::new(context);

    let mut had_error = false;
    if let Some(path) = &cli.file {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        for outcome in session.evaluate_document(&text) {
            had_error |= outcome.is_error();
            print_outcome(out, &outcome, cli.json)?;
        }
    } else if !cli.expressions.is_empty() {
        for expression in &cli.expressions {
            let outcome = session.evaluate_line(expression);
            had_error |= outcome.is_error();
            print_outcome(out, &outcome, cli.json)?;
        }
    } else {
        repl(&mut session, input, out, cli.json)?;
    }

    if let (Some(path), Some(file), Some(_)) = (&cli.session, session_file.as_mut(), &lock) {
        file.update(session.into_context());
        save_session(file, path)?;
        info!(path = %path.display(), "saved session");
    }
    drop(lock);

    Ok(had_error)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_tracing(&config.log.filter);

    let had_error = run(&cli, &config, &mut io::stdin().lock(), &mut io::stdout().lock())?;
    Ok(if had_error { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

#[cfg(test)]
mod tests {
    use super::*;
    use calc_core::file_io::load_session;
    use std::io::Cursor;

    fn run_args(args: &[&str]) -> (bool, String) {
        run_with_input(args, "")
    }

    fn run_with_input(args: &[&str], input: &str) -> (bool, String) {
        let cli = Cli::try_parse_from(std::iter::once("calc_cli").chain(args.iter().copied())).unwrap();
        let config = cli.load_config().unwrap();
        let mut out = Vec::new();
        let had_error = run(&cli, &config, &mut Cursor::new(input.to_string()), &mut out).unwrap();
        (had_error, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parses_expressions_and_flags() {
        let cli = Cli::try_parse_from(["calc_cli", "--json", "--ppi", "144", "2 + 2", "5 USD"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.ppi, Some(144.0));
        assert_eq!(cli.expressions, vec!["2 + 2", "5 USD"]);
    }

    #[test]
    fn test_file_conflicts_with_expressions() {
        assert!(Cli::try_parse_from(["calc_cli", "--file", "sheet.txt", "1 + 1"]).is_err());
    }

    #[test]
    fn test_overrides_are_validated() {
        let cli = Cli::try_parse_from(["calc_cli", "--timezone", "Nowhere/Special"]).unwrap();
        assert!(cli.load_config().is_err());

        let cli = Cli::try_parse_from(["calc_cli", "--em-size", "20"]).unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.context.em_size, 20.0);

        let mut ctx = CalculatorContext::default();
        cli.apply_overrides(&mut ctx).unwrap();
        assert_eq!(ctx.em_size, 20.0);
    }

    #[test]
    fn test_run_prints_each_expression() {
        let (had_error, out) = run_args(&["2 + 2", "x = 5", "total: x * 3"]);
        assert!(!had_error);
        assert_eq!(out, "4\nx = 5\ntotal: 15\n");
    }

    #[test]
    fn test_run_flags_any_error_line() {
        let (had_error, out) = run_args(&["2 + 2", "1 / 0"]);
        assert!(had_error);
        assert!(out.contains("Error: division by zero"));
    }

    #[test]
    fn test_run_json_outcomes() {
        let (_, out) = run_args(&["--json", "5 USD"]);
        let json: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(json["kind"], "value");
        assert_eq!(json["value"]["unit"], "USD");
        assert_eq!(json["value"]["type"], "Currency");
    }

    #[test]
    fn test_run_file_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("sheet.txt");
        fs::write(&sheet, "a = 2\n# note\n\na * 5\n").unwrap();

        let (had_error, out) = run_args(&["--file", sheet.to_str().unwrap()]);
        assert!(!had_error);
        assert_eq!(out, "a = 2\n10\n");
    }

    #[test]
    fn test_repl_reads_until_quit() {
        let (had_error, out) = run_with_input(&[], "y = 4\n:vars\n:quit\ny * 2\n");
        assert!(!had_error);
        assert!(out.contains("y = 4"));
        assert!(out.contains("ans = 4"));
        assert!(!out.contains('8'));
    }

    #[test]
    fn test_session_is_saved_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("budget.calc");
        let path_arg = path.to_str().unwrap();

        let (had_error, _) = run_args(&["--session", path_arg, "--timezone", "Europe/Berlin", "rate = 3"]);
        assert!(!had_error);
        assert!(path.exists());
        assert!(FileLock::check(&path).is_none());

        let saved = load_session(&path).unwrap();
        assert_eq!(saved.context.timezone, "Europe/Berlin");
        assert_eq!(saved.context.get("rate").unwrap().number_value(), 3.0);

        let (_, out) = run_args(&["--session", path_arg, "rate * 2"]);
        assert_eq!(out, "6\n");
    }

    #[test]
    fn test_locked_session_runs_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.calc");
        let path_arg = path.to_str().unwrap();
        run_args(&["--session", path_arg, "x = 1"]);

        let held = FileLock::acquire(&path, "someone-else").unwrap();
        let (had_error, out) = run_args(&["--session", path_arg, "x = 99", "x + 1"]);
        assert!(!had_error);
        assert_eq!(out, "x = 99\n100\n");
        drop(held);

        let saved = load_session(&path).unwrap();
        assert_eq!(saved.context.get("x").unwrap().number_value(), 1.0);
    }
}
