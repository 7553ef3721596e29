use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

use stat_arb_core::signals::{BandMultipliers, StopRearm};
use stat_arb_core::sweep::SweepGrid;
use stat_arb_core::{InstrumentInput, RunMode};

use crate::input;
use crate::input::csv_prices::{read_prices, PriceColumns};

/// One instrument as named in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSource {
    pub name: String,
    /// Path to a `date,value` CSV file
    pub csv: String,
}

/// Band multipliers as they appear in a config file; missing fields fall
/// back to the defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BandConfig {
    pub mean: Option<f64>,
    pub trade: Option<f64>,
    pub stop: Option<f64>,
}

/// Run settings read from a JSON/YAML file or piped JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    pub dependent: Option<InstrumentSource>,
    pub independent: Option<InstrumentSource>,
    pub sample_boundary: Option<String>,
    #[serde(default)]
    pub bands: BandConfig,
    pub mode: Option<RunMode>,
    pub stop_rearm: Option<StopRearm>,
    pub log_file: Option<String>,
    pub spread_name: Option<String>,
    pub date_column: Option<String>,
    pub value_column: Option<String>,
    pub grid: Option<SweepGrid>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    InSample,
    OutOfSample,
}

impl From<ModeArg> for RunMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::InSample => RunMode::InSample,
            ModeArg::OutOfSample => RunMode::OutOfSample,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RearmArg {
    AtMeanCross,
    Immediate,
}

impl From<RearmArg> for StopRearm {
    fn from(r: RearmArg) -> Self {
        match r {
            RearmArg::AtMeanCross => StopRearm::AtMeanCross,
            RearmArg::Immediate => StopRearm::Immediate,
        }
    }
}

/// Flags shared by every command that loads a pair. Flags override values
/// from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct PairArgs {
    /// JSON or YAML config file (JSON may also be piped on stdin)
    #[arg(long)]
    pub config: Option<String>,

    /// CSV file of the dependent instrument (Y)
    #[arg(long)]
    pub y_csv: Option<String>,

    /// Name of the dependent instrument
    #[arg(long)]
    pub y_name: Option<String>,

    /// CSV file of the independent instrument (X)
    #[arg(long)]
    pub x_csv: Option<String>,

    /// Name of the independent instrument
    #[arg(long)]
    pub x_name: Option<String>,

    /// Last in-sample date, YYYY-MM-DD (inclusive)
    #[arg(long)]
    pub boundary: Option<String>,

    /// Header of the date column (default: first column)
    #[arg(long)]
    pub date_column: Option<String>,

    /// Header of the value column (default: second column)
    #[arg(long)]
    pub value_column: Option<String>,

    /// Name given to the residual spread series
    #[arg(long)]
    pub spread_name: Option<String>,
}

/// Flags selecting how a pair is traded.
#[derive(Args, Debug, Clone, Default)]
pub struct TradeArgs {
    /// Mean-reversion band multiplier
    #[arg(long)]
    pub mean_band: Option<f64>,

    /// Entry band multiplier
    #[arg(long)]
    pub trade_band: Option<f64>,

    /// Stop-loss band multiplier
    #[arg(long)]
    pub stop_band: Option<f64>,

    /// Window to trade
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// When entries are allowed again after a stop-loss
    #[arg(long, value_enum)]
    pub stop_rearm: Option<RearmArg>,
}

/// A pair loaded from disk plus the settings resolved for it.
#[derive(Debug, Clone)]
pub struct ResolvedPair {
    pub dependent: InstrumentInput,
    pub independent: InstrumentInput,
    pub sample_boundary: Option<String>,
    pub spread_name: String,
    /// Ingestion warnings to attach to the output
    pub warnings: Vec<String>,
}

pub fn load_config(path: Option<&str>) -> Result<RunConfig, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return input::file::read_config(path);
    }
    match input::stdin::read_stdin()? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(RunConfig::default()),
    }
}

impl RunConfig {
    pub fn bands(&self, overrides: &TradeArgs) -> BandMultipliers {
        let d = BandMultipliers::default();
        BandMultipliers::new(
            overrides.mean_band.or(self.bands.mean).unwrap_or(d.mean),
            overrides.trade_band.or(self.bands.trade).unwrap_or(d.trade),
            overrides.stop_band.or(self.bands.stop).unwrap_or(d.stop),
        )
    }

    pub fn mode(&self, overrides: &TradeArgs, default: RunMode) -> RunMode {
        overrides
            .mode
            .map(RunMode::from)
            .or(self.mode)
            .unwrap_or(default)
    }

    pub fn stop_rearm(&self, overrides: &TradeArgs) -> StopRearm {
        overrides
            .stop_rearm
            .map(StopRearm::from)
            .or(self.stop_rearm)
            .unwrap_or_default()
    }

    /// Read both price files named by the flags or the config.
    pub fn resolve_pair(
        &self,
        args: &PairArgs,
    ) -> Result<ResolvedPair, Box<dyn std::error::Error>> {
        let date_column = args.date_column.as_deref().or(self.date_column.as_deref());
        let value_column = args.value_column.as_deref().or(self.value_column.as_deref());
        let columns = PriceColumns {
            date: date_column,
            value: value_column,
        };

        let mut warnings = Vec::new();
        let dependent = load_instrument(
            "dependent",
            self.dependent.as_ref(),
            args.y_name.as_deref(),
            args.y_csv.as_deref(),
            columns,
            &mut warnings,
        )?;
        let independent = load_instrument(
            "independent",
            self.independent.as_ref(),
            args.x_name.as_deref(),
            args.x_csv.as_deref(),
            columns,
            &mut warnings,
        )?;

        Ok(ResolvedPair {
            dependent,
            independent,
            sample_boundary: args.boundary.clone().or_else(|| self.sample_boundary.clone()),
            spread_name: args
                .spread_name
                .clone()
                .or_else(|| self.spread_name.clone())
                .unwrap_or_else(|| "Spread".to_string()),
            warnings,
        })
    }
}

fn load_instrument(
    role: &str,
    source: Option<&InstrumentSource>,
    name: Option<&str>,
    csv: Option<&str>,
    columns: PriceColumns<'_>,
    warnings: &mut Vec<String>,
) -> Result<InstrumentInput, Box<dyn std::error::Error>> {
    let path = csv
        .or(source.map(|s| s.csv.as_str()))
        .ok_or_else(|| format!("no CSV file given for the {role} instrument"))?;
    let name = name
        .or(source.map(|s| s.name.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| file_stem(path));

    let loaded = read_prices(path, columns)?;
    warnings.extend(loaded.warnings(path));
    Ok(InstrumentInput {
        name,
        points: loaded.points,
    })
}

fn file_stem(path: &str) -> String {
    std::path::Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_file(rows: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(f, "date,value\n{rows}").unwrap();
        f
    }

    #[test]
    fn test_flags_override_config_bands() {
        let cfg: RunConfig = serde_yaml::from_str("bands:\n  mean: 0.75\n  stop: 3.0\n").unwrap();
        let flags = TradeArgs {
            stop_band: Some(2.0),
            ..Default::default()
        };
        let b = cfg.bands(&flags);
        assert_eq!((b.mean, b.trade, b.stop), (0.75, 1.0, 2.0));
    }

    #[test]
    fn test_mode_defaults() {
        let cfg = RunConfig::default();
        let flags = TradeArgs::default();
        assert_eq!(cfg.mode(&flags, RunMode::OutOfSample), RunMode::OutOfSample);
        let cfg: RunConfig = serde_json::from_str(r#"{"mode": "in_sample"}"#).unwrap();
        assert_eq!(cfg.mode(&flags, RunMode::OutOfSample), RunMode::InSample);
        assert_eq!(cfg.stop_rearm(&flags), StopRearm::AtMeanCross);
    }

    #[test]
    fn test_resolve_pair_from_flags() {
        let y = csv_file("2014-01-02,1.0\n2014-01-02,1.5\n2014-01-03,2.0\n");
        let x = csv_file("2014-01-02,3.0\n2014-01-03,4.0\n");
        let args = PairArgs {
            y_csv: Some(y.path().to_string_lossy().into_owned()),
            y_name: Some("GE".into()),
            x_csv: Some(x.path().to_string_lossy().into_owned()),
            boundary: Some("2014-01-02".into()),
            ..Default::default()
        };
        let pair = RunConfig::default().resolve_pair(&args).unwrap();
        assert_eq!(pair.dependent.name, "GE");
        assert_eq!(pair.dependent.points.len(), 2);
        assert_eq!(pair.independent.points.len(), 2);
        assert_eq!(pair.sample_boundary.as_deref(), Some("2014-01-02"));
        assert_eq!(pair.spread_name, "Spread");
        assert_eq!(pair.warnings.len(), 1);
    }

    #[test]
    fn test_missing_csv_is_an_error() {
        let err = RunConfig::default()
            .resolve_pair(&PairArgs::default())
            .unwrap_err();
        assert!(err.to_string().contains("dependent"));
    }
}
