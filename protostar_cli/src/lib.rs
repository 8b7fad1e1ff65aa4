use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Compose static HTML prototypes from nested template fragments.",
	long_about = "protostar flattens HTML prototypes built from fragments into deployable \
	              pages.\n\nTemplates reference each other through placeholders in HTML \
	              comments, such as `<!-- file:/header -->`, `<!-- layout:/base(main=file:/body) \
	              -->` or `<!-- wrap:/frame -->`.\n\nQuick start:\n  protostar init       \
	              Create a sample project\n  protostar compose    Compose a single template\n  \
	              protostar check      Compose every template and report problems\n  protostar \
	              build      Write every composed template to the build directory"
)]
pub struct ProtostarCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output. Raises the default log level to `debug`; the
	/// `PROTOSTAR_LOG` environment variable takes precedence.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize protostar in a project.
	///
	/// Creates a `protostar.toml` and a sample `index.html` with a header
	/// fragment. Existing files are left untouched.
	Init,
	/// Compose a single template and print the result.
	///
	/// The template's placeholders are resolved against the project root
	/// until none are left or the run limit is reached.
	Compose {
		/// The template to compose, relative to the project root.
		file: PathBuf,

		/// Stop after this many composition runs. Defaults to
		/// `max_compilation_runs` from `protostar.toml`.
		#[arg(long)]
		max_runs: Option<usize>,

		/// Surround resolved regions with `begin_`/`end_` marker comments so
		/// the output can be decompiled.
		#[arg(long, default_value_t = false)]
		markers: bool,

		/// Output format. `json` includes the collected metadata.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Collapse marked regions of a composed file back into placeholders.
	Decompile {
		/// The composed file, relative to the project root.
		file: PathBuf,

		/// Also decompile the content of every extracted region.
		#[arg(long, default_value_t = false)]
		recursive: bool,

		/// Output format. `json` includes the extracted markers.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// List the placeholders found in a template.
	Scan {
		/// The template to scan, relative to the project root.
		file: PathBuf,

		/// Output format for the placeholder list.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Compose every template of the project without writing anything.
	///
	/// Exits with a non-zero status code when a template fails to compose or
	/// does not converge within the run limit.
	Check {
		/// Output format for check results.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Compose every template and write the results to the build directory.
	///
	/// Each template is written to the same relative path below the target
	/// directory, next to a `<name>.meta.json` file with its collected
	/// metadata.
	Build {
		/// Output directory. Defaults to `[build] target_dir` from
		/// `protostar.toml`.
		#[arg(long)]
		out: Option<PathBuf>,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
