use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use protostar_cli::Commands;
use protostar_cli::OutputFormat;
use protostar_cli::ProtostarCli;
use protostar_core::Composer;
use protostar_core::ComposeError;
use protostar_core::ProjectResolver;
use protostar_core::ProtostarConfig;
use protostar_core::decompile;
use protostar_core::decompile_recursive;
use protostar_core::project::compose_project;
use protostar_core::project::write_outputs;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

/// Environment variable holding the log filter, e.g. `protostar_core=debug`.
const LOG_ENV: &str = "PROTOSTAR_LOG";

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = ProtostarCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Compose {
			file,
			max_runs,
			markers,
			format,
		}) => run_compose(&args, file, *max_runs, *markers, *format),
		Some(Commands::Decompile {
			file,
			recursive,
			format,
		}) => run_decompile(&args, file, *recursive, *format),
		Some(Commands::Scan { file, format }) => run_scan(&args, file, *format),
		Some(Commands::Check { format }) => run_check(&args, *format),
		Some(Commands::Build { out }) => run_build(&args, out.as_deref()),
		None => {
			eprintln!("No subcommand specified. Run `protostar --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Render through miette for diagnostics with help text and error
		// codes.
		match e.downcast::<ComposeError>() {
			Ok(compose_err) => {
				let report: miette::Report = (*compose_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `PROTOSTAR_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.init();
}

fn resolve_root(args: &ProtostarCli) -> PathBuf {
	let root = args
		.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
	tracing::debug!(root = %root.display(), "resolved project root");
	root
}

fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

fn run_init(args: &ProtostarCli) -> CliResult<()> {
	let root = resolve_root(args);
	let config_path = root.join("protostar.toml");
	let index_path = root.join("index.html");
	let header_path = root.join("_header.html");

	if config_path.exists() {
		println!("Config file already exists: {}", config_path.display());
	} else {
		let sample_config = "# protostar configuration\n\n# Upper bound on composition runs per \
		                     template.\nmax_compilation_runs = 100\n\n# Surround resolved \
		                     regions with begin_/end_ markers.\nmark_regions = false\n\n# Named \
		                     paths resolve `<!-- file:/ps/... -->` inside another \
		                     directory.\n# [paths]\n# ps = \"vendor/protostar\"\n\n# \
		                     [exclude]\n# patterns = [\"drafts/\"]\n\n[build]\ntarget_dir = \
		                     \"build\"\n";
		std::fs::write(&config_path, sample_config)?;
		println!("Created protostar.toml");
	}

	let index_exists = index_path.exists();
	if index_exists {
		println!("Template already exists: {}", index_path.display());
	} else {
		let sample_index = "<!DOCTYPE html>\n<html>\n<body>\n<!-- file:/_header -->\n<main \
		                    data-editable>Hello from protostar!</main>\n</body>\n</html>\n";
		std::fs::write(&index_path, sample_index)?;
		println!("Created template: {}", index_path.display());
	}

	if !header_path.exists() {
		std::fs::write(&header_path, "<header><h1>protostar</h1></header>\n")?;
		println!("Created fragment: {}", header_path.display());
	}

	if !index_exists {
		println!();
		println!("Next steps:");
		println!("  1. Add fragments and reference them with <!-- file:/name -->");
		println!("  2. Run `protostar compose index.html` to preview the result");
		println!("  3. Run `protostar build` to write every page");
	}

	Ok(())
}

fn run_compose(
	args: &ProtostarCli,
	file: &Path,
	max_runs: Option<usize>,
	markers: bool,
	format: OutputFormat,
) -> CliResult<()> {
	let root = resolve_root(args);
	let config = ProtostarConfig::load_or_default(&root)?;
	let resolver = ProjectResolver::from_config(&root, &config);
	let composer = Composer::from_config(&resolver, &config);

	let mut options = composer.options();
	if let Some(max_runs) = max_runs {
		options = options.with_max_runs(max_runs);
	}
	if markers {
		options = options.with_markers(true);
	}

	let path = root.join(file);
	let contents = std::fs::read_to_string(&path).map_err(ComposeError::from)?;
	let composition = composer.compose_with(&path, &contents, options)?;

	match format {
		OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&composition)?),
		OutputFormat::Text => {
			println!("{}", composition.content);
			if !composition.converged {
				eprintln!(
					"{} {} did not converge after {} runs",
					colored!("warning:", yellow),
					make_relative(&path, &root),
					composition.runs
				);
			}
		}
	}

	Ok(())
}

fn run_decompile(
	args: &ProtostarCli,
	file: &Path,
	recursive: bool,
	format: OutputFormat,
) -> CliResult<()> {
	let root = resolve_root(args);
	let path = root.join(file);
	let contents = std::fs::read_to_string(&path).map_err(ComposeError::from)?;
	let decompiled = if recursive {
		decompile_recursive(&contents)?
	} else {
		decompile(&contents)?
	};

	match format {
		OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&decompiled)?),
		OutputFormat::Text => println!("{}", decompiled.content),
	}

	Ok(())
}

fn run_scan(args: &ProtostarCli, file: &Path, format: OutputFormat) -> CliResult<()> {
	let root = resolve_root(args);
	let config = ProtostarConfig::load_or_default(&root)?;
	let resolver = ProjectResolver::from_config(&root, &config);
	let composer = Composer::from_config(&resolver, &config);

	let path = root.join(file);
	let contents = std::fs::read_to_string(&path).map_err(ComposeError::from)?;
	let placeholders = composer.scan(&path, &contents)?;

	match format {
		OutputFormat::Json => {
			let entries: Vec<serde_json::Value> = placeholders
				.iter()
				.map(|placeholder| {
					serde_json::json!({
						"type": placeholder.r#type,
						"name": placeholder.name,
						"args": placeholder.args,
						"start": placeholder.start,
						"end": placeholder.end,
					})
				})
				.collect();
			println!("{}", serde_json::to_string_pretty(&entries)?);
		}
		OutputFormat::Text => {
			if placeholders.is_empty() {
				println!("No placeholders found in {}", make_relative(&path, &root));
				return Ok(());
			}

			println!(
				"{}",
				colored!(
					format!(
						"{} placeholder(s) in {}",
						placeholders.len(),
						make_relative(&path, &root)
					),
					bold
				)
			);
			for placeholder in &placeholders {
				let args = if placeholder.args.is_empty() {
					String::new()
				} else {
					format!(" [{}]", placeholder.args.join(", "))
				};
				println!(
					"  {}{args}  {}..{}",
					colored!(placeholder.label(), green),
					placeholder.start,
					placeholder.end
				);
			}
		}
	}

	Ok(())
}

fn run_check(args: &ProtostarCli, format: OutputFormat) -> CliResult<()> {
	let root = resolve_root(args);
	let config = ProtostarConfig::load_or_default(&root)?;
	let project = compose_project(&root, &config)?;

	match format {
		OutputFormat::Json => {
			let errors: Vec<serde_json::Value> = project
				.errors()
				.map(|result| {
					serde_json::json!({
						"file": result.template.relative,
						"message": result.error,
					})
				})
				.collect();
			let unconverged: Vec<serde_json::Value> = project
				.unconverged()
				.map(|result| serde_json::json!({ "file": result.template.relative }))
				.collect();
			let output = serde_json::json!({
				"ok": project.is_ok(),
				"templates": project.results.len(),
				"errors": errors,
				"unconverged": unconverged,
			});
			println!("{output}");
		}
		OutputFormat::Text => {
			if project.is_ok() {
				println!(
					"Check passed: {} template(s) composed.",
					project.results.len()
				);
				return Ok(());
			}

			for result in project.errors() {
				eprintln!(
					"{} {}: {}",
					colored!("error:", red),
					result.template.relative,
					result.error.as_deref().unwrap_or_default()
				);
			}
			for result in project.unconverged() {
				eprintln!(
					"{} {} did not converge within {} runs",
					colored!("warning:", yellow),
					result.template.relative,
					config.max_compilation_runs
				);
			}
			eprintln!();
			eprintln!(
				"Check failed: {} error(s), {} unconverged template(s).",
				project.errors().count(),
				project.unconverged().count()
			);
		}
	}

	if !project.is_ok() {
		process::exit(1);
	}

	Ok(())
}

fn run_build(args: &ProtostarCli, out: Option<&Path>) -> CliResult<()> {
	let root = resolve_root(args);
	let mut config = ProtostarConfig::load_or_default(&root)?;
	if let Some(out) = out {
		config.build.target_dir = out.to_path_buf();
	}
	let target_dir = root.join(&config.build.target_dir);
	let project = compose_project(&root, &config)?;
	let written = write_outputs(&project, &target_dir)?;

	for result in project.errors() {
		eprintln!(
			"{} {}: {}",
			colored!("error:", red),
			result.template.relative,
			result.error.as_deref().unwrap_or_default()
		);
	}

	println!(
		"{} {} template(s) to {}",
		colored!("Wrote", green),
		written.len(),
		target_dir.display()
	);

	if project.errors().next().is_some() {
		process::exit(1);
	}

	Ok(())
}
