use std::env;
use std::path::{Path, PathBuf};

use analysis_core::Assumptions;
use anyhow::{bail, Context, Result};

/// Max bundles computed at once when `METRICS_CONCURRENCY` is not set.
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub inputs: Vec<PathBuf>,
    pub assumptions: Assumptions,
    pub concurrency: usize,
    pub parallel: bool,
    pub pretty: bool,
}

/// Command-line flags before any environment overrides are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub inputs: Vec<PathBuf>,
    pub assumptions_file: Option<PathBuf>,
    pub parallel: bool,
    pub pretty: bool,
}

impl CliArgs {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut cli = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--parallel" => cli.parallel = true,
                "--pretty" => cli.pretty = true,
                "--assumptions" => {
                    let path = args.next().context("--assumptions needs a file path")?;
                    cli.assumptions_file = Some(PathBuf::from(path));
                }
                flag if flag.starts_with("--") => bail!("unknown option {}", flag),
                _ => cli.inputs.push(PathBuf::from(arg)),
            }
        }

        if cli.inputs.is_empty() {
            bail!("no input bundles given");
        }
        Ok(cli)
    }
}

impl RunnerConfig {
    /// Build the run configuration from parsed flags and the process environment.
    pub fn from_env(cli: CliArgs) -> Result<Self> {
        dotenvy::dotenv().ok();

        let base = match &cli.assumptions_file {
            Some(path) => load_assumptions(path)?,
            None => Assumptions::default(),
        };
        let lookup = |key: &str| env::var(key).ok();
        let assumptions = apply_overrides(base, lookup)?;
        let concurrency = match lookup("METRICS_CONCURRENCY") {
            Some(v) => parse_var::<usize>("METRICS_CONCURRENCY", &v)?.max(1),
            None => DEFAULT_CONCURRENCY,
        };

        Ok(Self {
            inputs: cli.inputs,
            assumptions,
            concurrency,
            parallel: cli.parallel,
            pretty: cli.pretty,
        })
    }
}

pub fn load_assumptions(path: &Path) -> Result<Assumptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading assumptions file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing assumptions file {}", path.display()))
}

/// Environment overrides on top of `base`. `lookup` returns the raw variable.
pub fn apply_overrides<F>(mut base: Assumptions, lookup: F) -> Result<Assumptions>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("METRICS_EQUITY_RISK_PREMIUM") {
        base.equity_risk_premium = parse_var("METRICS_EQUITY_RISK_PREMIUM", &v)?;
    }
    if let Some(v) = lookup("METRICS_TERMINAL_GROWTH") {
        base.terminal_growth_rate = parse_var("METRICS_TERMINAL_GROWTH", &v)?;
    }
    if let Some(v) = lookup("METRICS_PROJECTION_YEARS") {
        base.projection_years = parse_var("METRICS_PROJECTION_YEARS", &v)?;
    }
    if let Some(v) = lookup("METRICS_TAX_RATE") {
        base.default_tax_rate = parse_var("METRICS_TAX_RATE", &v)?;
    }
    Ok(base)
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{} has an invalid value: {:?}", key, value))
}
