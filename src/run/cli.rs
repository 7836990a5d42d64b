use clap::{Parser, ValueEnum};
use derive_builder::Builder;
use std::fmt::{Display, Formatter};

/// The command-line arguments.
#[derive(Clone, Debug, PartialEq, Eq, Parser)]
#[command(version, about, long_about = None)]
pub struct CliOptions {
    /// Specifies the output format.
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Quiet: do not print anything to stdout. The exit code still reflects whether the input
    /// parsed.
    #[arg(long, short)]
    pub quiet: bool,

    /// How deeply blocks may nest before the parser stops recognizing structure. You should
    /// rarely need this; it exists to bound resource use on hostile input.
    #[arg(long, hide = true)]
    pub max_nesting_depth: Option<usize>,

    /// An optional list of note files to parse, by path. If not provided, standard input will be
    /// used.
    ///
    /// If these are provided, notemark will act as if they were all concatenated into a single
    /// note. A path of "-" represents standard input; all but the first "-" are ignored.
    #[arg()]
    pub note_file_paths: Vec<String>,
}

/// Options analogous to the CLI's switches, for running notemark in-process.
///
/// Use [`RunOptionsBuilder`] to construct one field by field.
#[derive(Clone, Default, Debug, PartialEq, Eq, Builder)]
pub struct RunOptions {
    /// See [`CliOptions::output`].
    #[builder(default)]
    pub output: OutputFormat,

    /// See [`CliOptions::quiet`].
    #[builder(default)]
    pub quiet: bool,

    /// See [`CliOptions::max_nesting_depth`].
    #[builder(default)]
    pub max_nesting_depth: Option<usize>,

    /// See [`CliOptions::note_file_paths`].
    #[builder(default)]
    pub note_file_paths: Vec<String>,
}

impl From<CliOptions> for RunOptions {
    fn from(value: CliOptions) -> Self {
        Self {
            output: value.output,
            quiet: value.quiet,
            max_nesting_depth: value.max_nesting_depth,
            note_file_paths: value.note_file_paths,
        }
    }
}

/// How to write the parsed tree out.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum OutputFormat {
    /// The normalized tree as JSON.
    #[default]
    Json,
    /// The normalized tree in Rust's debug format. Mostly useful for troubleshooting.
    Debug,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutputFormat::Json => "json",
            OutputFormat::Debug => "debug",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        CliOptions::command().debug_assert();
    }

    #[test]
    fn builder_defaults_match_cli_defaults() {
        let from_builder = RunOptionsBuilder::default().build().unwrap();
        let from_cli: RunOptions = CliOptions::parse_from(["notemark"]).into();
        assert_eq!(from_builder, from_cli);
    }

    #[test]
    fn builder_sets_fields() {
        let options = RunOptionsBuilder::default()
            .output(OutputFormat::Debug)
            .quiet(true)
            .build()
            .unwrap();
        assert_eq!(options.output, OutputFormat::Debug);
        assert!(options.quiet);
        assert_eq!(options.note_file_paths, Vec::<String>::new());
    }
}
