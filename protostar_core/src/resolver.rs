use std::collections::BTreeMap;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::ComposeError;
use crate::ComposeResult;
use crate::Placeholder;
use crate::ProtostarConfig;

/// The environment a composer resolves placeholder names against.
///
/// The composer never touches the filesystem directly; every lookup and read
/// goes through this trait.
pub trait PathResolver {
	/// Map a placeholder to the absolute path of the file it references.
	/// Fails with [`ComposeError::Unresolved`] when no file matches.
	fn resolve_placeholder(&self, placeholder: &Placeholder) -> ComposeResult<PathBuf>;

	fn read_to_string(&self, path: &Path) -> ComposeResult<String>;

	fn exists(&self, path: &Path) -> bool;

	/// The URL path (leading `/`) a file is served under.
	fn url_path_for_file(&self, path: &Path) -> String;
}

/// Resolves placeholder names against a project directory on disk.
///
/// `/pages/header` (or `pages/header`) maps to `<root>/pages/header.html` for
/// `file`, `layout`, `wrap` and `content` names, to `.css` for `linkCss` and
/// to `.js` for `linkScript`. A name whose first segment is a configured
/// named path resolves inside that directory instead.
#[derive(Debug, Clone)]
pub struct ProjectResolver {
	root: PathBuf,
	named_paths: BTreeMap<String, PathBuf>,
}

impl ProjectResolver {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: normalize_path(&root.into()),
			named_paths: BTreeMap::new(),
		}
	}

	/// Build a resolver using the named paths from `config`.
	pub fn from_config(root: impl Into<PathBuf>, config: &ProtostarConfig) -> Self {
		let mut resolver = Self::new(root);
		for (name, dir) in &config.paths {
			resolver = resolver.with_named_path(name.clone(), dir);
		}
		resolver
	}

	/// Register a named path. Relative directories are taken relative to the
	/// project root.
	#[must_use]
	pub fn with_named_path(mut self, name: impl Into<String>, dir: impl AsRef<Path>) -> Self {
		let dir = normalize_path(&self.root.join(dir.as_ref()));
		self.named_paths.insert(name.into(), dir);
		self
	}

	/// The path a placeholder would resolve to, whether or not it exists.
	pub fn candidate_path(&self, placeholder: &Placeholder) -> PathBuf {
		let extension = placeholder.r#type.resource_extension();
		let trimmed = placeholder.name.trim_start_matches('/');
		let file_name = if trimmed.ends_with(&format!(".{extension}")) {
			trimmed.to_string()
		} else {
			format!("{trimmed}.{extension}")
		};

		if let Some((head, rest)) = file_name.split_once('/') {
			if let Some(dir) = self.named_paths.get(head) {
				return normalize_path(&dir.join(rest));
			}
		}

		normalize_path(&self.root.join(file_name))
	}
}

impl PathResolver for ProjectResolver {
	fn resolve_placeholder(&self, placeholder: &Placeholder) -> ComposeResult<PathBuf> {
		let path = self.candidate_path(placeholder);
		if path.is_file() {
			return Ok(path);
		}

		Err(ComposeError::Unresolved {
			kind: placeholder.r#type.to_string(),
			name: placeholder.name.clone(),
			reason: format!("no file at `{}`", path.display()),
		})
	}

	fn read_to_string(&self, path: &Path) -> ComposeResult<String> {
		Ok(std::fs::read_to_string(path)?)
	}

	fn exists(&self, path: &Path) -> bool {
		path.is_file()
	}

	fn url_path_for_file(&self, path: &Path) -> String {
		let path = normalize_path(path);

		// Longest named directory first so nested named paths win.
		let mut named: Vec<_> = self.named_paths.iter().collect();
		named.sort_by_key(|(_, dir)| std::cmp::Reverse(dir.components().count()));
		for (name, dir) in named {
			if let Ok(rel) = path.strip_prefix(dir) {
				return format!("/{name}/{}", path_to_url(rel));
			}
		}

		match path.strip_prefix(&self.root) {
			Ok(rel) => format!("/{}", path_to_url(rel)),
			Err(_) => path_to_url(&path),
		}
	}
}

/// Lexically normalize a path, dropping `.` and folding `..` segments.
pub fn normalize_path(path: &Path) -> PathBuf {
	let mut normalized = PathBuf::new();
	for component in path.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				if !normalized.pop() {
					normalized.push(Component::ParentDir.as_os_str());
				}
			}
			other => normalized.push(other.as_os_str()),
		}
	}
	normalized
}

fn path_to_url(path: &Path) -> String {
	path.to_string_lossy().replace('\\', "/")
}
