use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use serde::Serialize;

use crate::ComposeError;
use crate::ComposeResult;
use crate::Composer;
use crate::Composition;
use crate::ProjectResolver;
use crate::ProtostarConfig;
use crate::config::CONFIG_FILE_CANDIDATES;

/// Options for controlling how a project is scanned for templates.
///
/// Use [`ScanOptions::default()`] for sensible defaults or
/// [`ScanOptions::from_config`] to construct from a [`ProtostarConfig`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
	/// Gitignore-style patterns to exclude from scanning.
	pub exclude_patterns: Vec<String>,
	/// Glob patterns restricting which templates to include. Empty matches
	/// everything.
	pub include_set: GlobSet,
	/// Whether to disable `.gitignore` integration.
	pub disable_gitignore: bool,
	/// Directory names skipped on top of the built in ones, usually the
	/// build output directory.
	pub skip_dirs: Vec<PathBuf>,
}

impl Default for ScanOptions {
	fn default() -> Self {
		Self {
			exclude_patterns: Vec::new(),
			include_set: GlobSet::empty(),
			disable_gitignore: false,
			skip_dirs: Vec::new(),
		}
	}
}

impl ScanOptions {
	pub fn from_config(root: &Path, config: &ProtostarConfig) -> Self {
		Self {
			exclude_patterns: config.exclude.patterns.clone(),
			include_set: build_glob_set(&config.include.patterns),
			disable_gitignore: config.disable_gitignore,
			skip_dirs: vec![root.join(&config.build.target_dir)],
		}
	}
}

/// A template found by the project scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEntry {
	/// Absolute path of the template.
	pub path: PathBuf,
	/// Path relative to the project root, with `/` separators.
	pub relative: String,
}

/// The outcome of composing one template of a project.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateResult {
	pub template: TemplateEntry,
	pub composition: Option<Composition>,
	pub error: Option<String>,
}

/// Every template of a project composed.
#[derive(Debug, Default, Serialize)]
pub struct ProjectComposition {
	pub root: PathBuf,
	pub results: Vec<TemplateResult>,
}

impl ProjectComposition {
	/// Results that failed to compose.
	pub fn errors(&self) -> impl Iterator<Item = &TemplateResult> {
		self.results.iter().filter(|result| result.error.is_some())
	}

	/// Results that stopped at the run limit.
	pub fn unconverged(&self) -> impl Iterator<Item = &TemplateResult> {
		self.results.iter().filter(|result| {
			result
				.composition
				.as_ref()
				.is_some_and(|composition| !composition.converged)
		})
	}

	/// True when every template composed and converged.
	pub fn is_ok(&self) -> bool {
		self.errors().next().is_none() && self.unconverged().next().is_none()
	}
}

/// Collect every composable `.html` template below `root`, sorted by path.
///
/// Files whose name starts with `_` are partials and are only ever included
/// by other templates.
pub fn collect_templates(root: &Path, options: &ScanOptions) -> ComposeResult<Vec<TemplateEntry>> {
	let gitignore = if options.disable_gitignore {
		Gitignore::empty()
	} else {
		build_gitignore(root)
	};
	let custom_exclude = build_exclude_matcher(root, &options.exclude_patterns)?;

	let mut files = Vec::new();
	let mut visited_dirs = HashSet::new();
	let walker = Walker {
		gitignore: &gitignore,
		custom_exclude: &custom_exclude,
		skip_dirs: &options.skip_dirs,
	};
	walker.walk_dir(root, &mut files, &mut visited_dirs)?;
	files.sort();

	Ok(files
		.into_iter()
		.filter(|path| {
			options.include_set.is_empty()
				|| path
					.strip_prefix(root)
					.is_ok_and(|rel| options.include_set.is_match(rel))
		})
		.map(|path| {
			let relative = path
				.strip_prefix(root)
				.unwrap_or(&path)
				.to_string_lossy()
				.replace('\\', "/");
			TemplateEntry { path, relative }
		})
		.collect())
}

/// Load the config at `root` (or defaults) and compose every template.
pub fn compose_project_with_config(root: &Path) -> ComposeResult<ProjectComposition> {
	let config = ProtostarConfig::load_or_default(root)?;
	compose_project(root, &config)
}

/// Compose every template below `root`. Errors in individual templates are
/// collected rather than returned.
pub fn compose_project(root: &Path, config: &ProtostarConfig) -> ComposeResult<ProjectComposition> {
	let resolver = ProjectResolver::from_config(root, config);
	let composer = Composer::from_config(&resolver, config);
	let templates = collect_templates(root, &ScanOptions::from_config(root, config))?;
	tracing::info!(root = %root.display(), templates = templates.len(), "composing project");

	let mut results = Vec::with_capacity(templates.len());
	for template in templates {
		let outcome = std::fs::read_to_string(&template.path)
			.map_err(ComposeError::from)
			.and_then(|contents| composer.compose(&template.path, &contents));

		let result = match outcome {
			Ok(composition) => {
				TemplateResult {
					template,
					composition: Some(composition),
					error: None,
				}
			}
			Err(e) => {
				tracing::error!(template = %template.relative, error = %e, "failed to compose template");
				TemplateResult {
					template,
					composition: None,
					error: Some(e.to_string()),
				}
			}
		};
		results.push(result);
	}

	Ok(ProjectComposition {
		root: root.to_path_buf(),
		results,
	})
}

/// Write every composed template below `target_dir`, mirroring its path in
/// the project, together with a `<name>.meta.json` metadata file. Returns the
/// written HTML paths.
pub fn write_outputs(project: &ProjectComposition, target_dir: &Path) -> ComposeResult<Vec<PathBuf>> {
	let mut written = Vec::new();
	for result in &project.results {
		let Some(composition) = &result.composition else {
			continue;
		};

		let output = target_dir.join(&result.template.relative);
		if let Some(parent) = output.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&output, &composition.content)?;

		let metadata = serde_json::to_string_pretty(&composition.metadata)
			.map_err(|e| ComposeError::Io(std::io::Error::other(e)))?;
		std::fs::write(output.with_extension("meta.json"), metadata)?;

		tracing::debug!(output = %output.display(), "wrote composed template");
		written.push(output);
	}

	Ok(written)
}

fn build_glob_set(patterns: &[String]) -> GlobSet {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		match Glob::new(pattern) {
			Ok(glob) => {
				builder.add(glob);
			}
			Err(e) => tracing::warn!(%pattern, error = %e, "ignoring invalid include pattern"),
		}
	}
	builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// Build a `Gitignore` matcher from the `[exclude]` patterns of
/// `protostar.toml`.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> ComposeResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			ComposeError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {e}"))
		})?;
	}
	builder
		.build()
		.map_err(|e| ComposeError::ConfigParse(format!("failed to build exclude rules: {e}")))
}

/// Build a `Gitignore` matcher from the project's `.gitignore` file (if any).
fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		let _ = builder.add(gitignore_path);
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

fn is_ignored_directory_name(name: &str) -> bool {
	name.starts_with('.')
		|| matches!(name, "node_modules" | "bower_components" | "target")
}

fn has_project_config(dir: &Path) -> bool {
	CONFIG_FILE_CANDIDATES
		.iter()
		.any(|candidate| dir.join(candidate).is_file())
}

/// Whether `path` is an `.html` template that can be composed on its own.
pub fn is_template_file(path: &Path) -> bool {
	let is_html = path.extension().and_then(|ext| ext.to_str()) == Some("html");
	let is_partial = path
		.file_name()
		.and_then(|name| name.to_str())
		.is_some_and(|name| name.starts_with('_'));

	is_html && !is_partial
}

struct Walker<'a> {
	gitignore: &'a Gitignore,
	custom_exclude: &'a Gitignore,
	skip_dirs: &'a [PathBuf],
}

impl Walker<'_> {
	fn walk_dir(
		&self,
		dir: &Path,
		files: &mut Vec<PathBuf>,
		visited_dirs: &mut HashSet<PathBuf>,
	) -> ComposeResult<()> {
		if !dir.is_dir() {
			return Ok(());
		}

		let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
		if !visited_dirs.insert(canonical) {
			return Err(ComposeError::SymlinkCycle {
				path: dir.display().to_string(),
			});
		}

		for entry in std::fs::read_dir(dir)? {
			let path = entry?.path();

			if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
				if is_ignored_directory_name(name) {
					continue;
				}
			}

			let is_dir = path.is_dir();
			if self.gitignore.matched(&path, is_dir).is_ignore()
				|| self.custom_exclude.matched(&path, is_dir).is_ignore()
			{
				continue;
			}

			if is_dir {
				if self.skip_dirs.contains(&path) {
					continue;
				}
				// Nested projects are composed on their own.
				if has_project_config(&path) {
					continue;
				}
				self.walk_dir(&path, files, visited_dirs)?;
			} else if is_template_file(&path) {
				files.push(path);
			}
		}

		Ok(())
	}
}
