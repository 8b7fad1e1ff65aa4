use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::ComposeError;
use crate::ComposeResult;
use crate::PlaceholderType;

/// Default number of composition runs before giving up on convergence.
pub const DEFAULT_MAX_COMPILATION_RUNS: usize = 100;

/// Default directory (relative to the project root) that `build` writes to.
pub const DEFAULT_TARGET_DIR: &str = "build";

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"protostar.toml",
	".protostar.toml",
	".config/protostar.toml",
];

/// Configuration loaded from a `protostar.toml` file.
///
/// ```toml
/// max_compilation_runs = 100
/// placeholder_types = ["file", "content", "layout", "wrap", "linkCss", "linkScript"]
/// mark_regions = false
///
/// [paths]
/// ps = "vendor/protostar"
///
/// [exclude]
/// patterns = ["drafts/", "*.old.html"]
///
/// [include]
/// patterns = ["pages/**/*.html"]
///
/// [build]
/// target_dir = "dist"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ProtostarConfig {
	/// Upper bound on composition runs for a single template.
	#[serde(default = "default_max_compilation_runs")]
	pub max_compilation_runs: usize,
	/// The placeholder types the composer scans for, in scan order.
	#[serde(default = "default_placeholder_types")]
	pub placeholder_types: Vec<PlaceholderType>,
	/// Wrap resolved `file` and `layout` regions in `begin_`/`end_` marker
	/// comments so the output can be decompiled again.
	#[serde(default)]
	pub mark_regions: bool,
	/// Named paths. A placeholder name whose first segment matches a key
	/// resolves inside the mapped directory instead of the project root.
	#[serde(default)]
	pub paths: BTreeMap<String, PathBuf>,
	/// Exclusion configuration for the project template scan.
	#[serde(default)]
	pub exclude: ExcludeConfig,
	/// Glob patterns restricting which templates the project scan composes.
	#[serde(default)]
	pub include: IncludeConfig,
	/// Build output configuration.
	#[serde(default)]
	pub build: BuildConfig,
	/// When true, `.gitignore` files are not used to filter templates.
	#[serde(default)]
	pub disable_gitignore: bool,
}

impl Default for ProtostarConfig {
	fn default() -> Self {
		Self {
			max_compilation_runs: DEFAULT_MAX_COMPILATION_RUNS,
			placeholder_types: default_placeholder_types(),
			mark_regions: false,
			paths: BTreeMap::new(),
			exclude: ExcludeConfig::default(),
			include: IncludeConfig::default(),
			build: BuildConfig::default(),
			disable_gitignore: false,
		}
	}
}

/// Gitignore-style patterns for templates that should never be composed on
/// their own.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExcludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

/// Glob patterns (relative to the project root) a template has to match to
/// be composed. Empty means every template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
	/// Output directory relative to the project root.
	#[serde(default = "default_target_dir")]
	pub target_dir: PathBuf,
}

impl Default for BuildConfig {
	fn default() -> Self {
		Self {
			target_dir: default_target_dir(),
		}
	}
}

fn default_max_compilation_runs() -> usize {
	DEFAULT_MAX_COMPILATION_RUNS
}

fn default_placeholder_types() -> Vec<PlaceholderType> {
	PlaceholderType::ALL.to_vec()
}

fn default_target_dir() -> PathBuf {
	PathBuf::from(DEFAULT_TARGET_DIR)
}

impl ProtostarConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> ComposeResult<Option<ProtostarConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;

		Ok(Some(config))
	}

	/// Load the discovered config or fall back to defaults.
	pub fn load_or_default(root: &Path) -> ComposeResult<ProtostarConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	/// Parse config from TOML source text.
	pub fn parse(content: &str) -> ComposeResult<ProtostarConfig> {
		toml::from_str(content).map_err(|e| ComposeError::ConfigParse(e.to_string()))
	}

	/// Per-call composition options derived from this config.
	pub fn compose_options(&self) -> ComposeOptions {
		ComposeOptions {
			max_runs: self.max_compilation_runs,
			mark_regions: self.mark_regions,
		}
	}
}

/// Options for a single `compose` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
	/// Stop after this many composition runs even when placeholders remain.
	pub max_runs: usize,
	/// Wrap resolved regions in decompilable marker comments.
	pub mark_regions: bool,
}

impl Default for ComposeOptions {
	fn default() -> Self {
		Self {
			max_runs: DEFAULT_MAX_COMPILATION_RUNS,
			mark_regions: false,
		}
	}
}

impl ComposeOptions {
	#[must_use]
	pub fn with_max_runs(mut self, max_runs: usize) -> Self {
		self.max_runs = max_runs;
		self
	}

	#[must_use]
	pub fn with_markers(mut self, mark_regions: bool) -> Self {
		self.mark_regions = mark_regions;
		self
	}
}
