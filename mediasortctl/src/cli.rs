use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mediasort_config::{ConfigFormat, LogFormat, Selection, SortConfig};

#[derive(Parser, Debug)]
#[command(name = "mediasortctl")]
#[command(version, about = "Sort downloaded TV episodes and movies into a tidy library")]
pub struct Cli {
    /// Config file (TOML, JSON or YAML). Defaults to ~/.mediasort.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Follow every decision without touching the filesystem
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Log level or filter directive, e.g. `debug` or `mediasort_core=trace`
    #[arg(short = 'v', long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log line format: text or json
    #[arg(long, global = true, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the configured pipeline until every input is drained
    Sort,
    /// Print a config listing stages with their default options
    Genconf(GenconfArgs),
    /// Print the version
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct GenconfArgs {
    /// Output format: toml, json or yaml
    #[arg(long, default_value = "toml")]
    pub format: ConfigFormat,

    /// Inputs to include (comma separated, default all)
    #[arg(long, value_delimiter = ',')]
    pub inputs: Vec<String>,

    /// Processors to include (comma separated, default all)
    #[arg(long, value_delimiter = ',')]
    pub processors: Vec<String>,

    /// Outputs to include (comma separated, default all)
    #[arg(long, value_delimiter = ',')]
    pub outputs: Vec<String>,
}

impl GenconfArgs {
    pub fn selection(&self) -> Selection {
        Selection {
            inputs: self.inputs.clone(),
            processors: self.processors.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

impl Cli {
    /// Flags win over both the config file and `MEDIASORT_*` variables.
    pub fn apply_overrides(&self, config: &mut SortConfig) {
        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_override_config() {
        let cli = Cli::parse_from([
            "mediasortctl",
            "sort",
            "--dry-run",
            "-v",
            "debug",
            "--log-format",
            "json",
        ]);
        let mut config = SortConfig::default();
        cli.apply_overrides(&mut config);

        assert!(matches!(cli.command, Command::Sort));
        assert!(config.dry_run);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn genconf_lists_split_on_commas() {
        let cli = Cli::parse_from([
            "mediasortctl",
            "genconf",
            "--format",
            "json",
            "--processors",
            "tv,tv-path-solver",
        ]);
        let Command::Genconf(args) = cli.command else {
            panic!("expected genconf");
        };
        assert_eq!(args.format, ConfigFormat::Json);
        assert_eq!(args.selection().processors, ["tv", "tv-path-solver"]);
        assert!(args.selection().inputs.is_empty());
    }
}
