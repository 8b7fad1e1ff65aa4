use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use crate::ComposeError;
use crate::ComposeResult;
use crate::PathResolver;
use crate::Placeholder;
use crate::ProjectResolver;

pub const SITE_ROOT: &str = "/site";

/// Resolves placeholders against an in-memory file tree rooted at `/site`,
/// using the same name to path mapping as [`ProjectResolver`].
#[derive(Debug, Clone)]
pub struct MemoryResolver {
	project: ProjectResolver,
	files: HashMap<PathBuf, String>,
}

impl MemoryResolver {
	pub fn new() -> Self {
		Self {
			project: ProjectResolver::new(SITE_ROOT),
			files: HashMap::new(),
		}
	}

	/// Add a file, `path` being relative to the site root.
	pub fn with_file(mut self, path: &str, contents: &str) -> Self {
		self.files.insert(site_path(path), contents.to_string());
		self
	}

	pub fn with_named_path(mut self, name: &str, dir: &str) -> Self {
		self.project = self.project.with_named_path(name, dir);
		self
	}
}

impl PathResolver for MemoryResolver {
	fn resolve_placeholder(&self, placeholder: &Placeholder) -> ComposeResult<PathBuf> {
		let path = self.project.candidate_path(placeholder);
		if self.files.contains_key(&path) {
			return Ok(path);
		}

		Err(ComposeError::Unresolved {
			kind: placeholder.r#type.to_string(),
			name: placeholder.name.clone(),
			reason: format!("no file at `{}`", path.display()),
		})
	}

	fn read_to_string(&self, path: &Path) -> ComposeResult<String> {
		self.files.get(path).cloned().ok_or_else(|| {
			ComposeError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				path.display().to_string(),
			))
		})
	}

	fn exists(&self, path: &Path) -> bool {
		self.files.contains_key(path)
	}

	fn url_path_for_file(&self, path: &Path) -> String {
		self.project.url_path_for_file(path)
	}
}

/// Absolute path of a file below the site root.
pub fn site_path(path: &str) -> PathBuf {
	Path::new(SITE_ROOT).join(path.trim_start_matches('/'))
}

pub const HEADER: &str = "  <h1>Hi</h1>\n";
pub const BODY: &str = "<p>Body</p>\n";
pub const BASE_LAYOUT: &str = "\n<title><!-- content:title --></title><main><!-- content:main --></main>\n";
pub const FRAME: &str = "<div class=\"frame\"><!-- content:main --></div>";

/// A small site with a header fragment, a two slot layout and a wrapper.
pub fn site() -> MemoryResolver {
	MemoryResolver::new()
		.with_file("header.html", HEADER)
		.with_file("body.html", BODY)
		.with_file("base.html", BASE_LAYOUT)
		.with_file("frame.html", FRAME)
}

/// `depth` nested layouts `l0` … `l{depth - 1}`, each including the next one
/// and the last holding `done`.
pub fn layout_chain(depth: usize) -> MemoryResolver {
	let last = depth.saturating_sub(1);
	let mut resolver = MemoryResolver::new();
	for level in 0..last {
		resolver = resolver.with_file(
			&format!("l{level}.html"),
			&format!("<!-- layout:/l{} -->", level + 1),
		);
	}
	resolver.with_file(&format!("l{last}.html"), "done")
}
