use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::ComposeError;
use crate::ComposeOptions;
use crate::ComposeResult;
use crate::PathResolver;
use crate::Placeholder;
use crate::PlaceholderType;
use crate::ProtostarConfig;
use crate::attributes::prepare_editable_refs;
use crate::attributes::resolve_relative_ps_links;
use crate::decompiler::BEGIN_MARKER;
use crate::decompiler::END_MARKER;
use crate::scanner::TAG_CLOSE;
use crate::scanner::scan;
use crate::scanner::scan_type;

/// Resources discovered through `linkCss` and `linkScript` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Includes {
	pub script: Vec<String>,
	pub head_script: Vec<String>,
	pub style: Vec<String>,
}

/// Metadata accumulated while composing one template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
	pub template_path: PathBuf,
	pub include: Includes,
}

impl Metadata {
	pub fn new(template_path: &Path) -> Self {
		Self {
			template_path: template_path.to_path_buf(),
			include: Includes::default(),
		}
	}
}

/// The result of composing a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Composition {
	/// The flattened markup.
	pub content: String,
	pub metadata: Metadata,
	/// Number of composition runs performed.
	pub runs: usize,
	/// False when the run limit was reached with placeholders still left in
	/// the document. This usually means the templates include each other.
	pub converged: bool,
}

/// Composes HTML templates by resolving their placeholders against a
/// [`PathResolver`].
#[derive(Debug, Clone)]
pub struct Composer<'a, R: PathResolver + ?Sized> {
	pub(crate) resolver: &'a R,
	pub(crate) types: Vec<PlaceholderType>,
	pub(crate) options: ComposeOptions,
}

impl<'a, R: PathResolver + ?Sized> Composer<'a, R> {
	/// A composer scanning for every placeholder type with default options.
	pub fn new(resolver: &'a R) -> Self {
		Self {
			resolver,
			types: PlaceholderType::ALL.to_vec(),
			options: ComposeOptions::default(),
		}
	}

	/// A composer using the placeholder types and options from `config`.
	pub fn from_config(resolver: &'a R, config: &ProtostarConfig) -> Self {
		Self {
			resolver,
			types: config.placeholder_types.clone(),
			options: config.compose_options(),
		}
	}

	#[must_use]
	pub fn with_types(mut self, types: Vec<PlaceholderType>) -> Self {
		self.types = types;
		self
	}

	#[must_use]
	pub fn with_options(mut self, options: ComposeOptions) -> Self {
		self.options = options;
		self
	}

	pub fn options(&self) -> ComposeOptions {
		self.options
	}

	/// Scan `contents` for every configured placeholder type.
	pub fn scan(&self, file_path: &Path, contents: &str) -> ComposeResult<Vec<Placeholder>> {
		scan(self.resolver, file_path, contents, &self.types)
	}

	/// Compose a template with the composer's own options.
	pub fn compose(&self, file_path: &Path, contents: &str) -> ComposeResult<Composition> {
		self.compose_with(file_path, contents, self.options)
	}

	/// Compose a template, overriding the options for this call only.
	pub fn compose_with(
		&self,
		file_path: &Path,
		contents: &str,
		options: ComposeOptions,
	) -> ComposeResult<Composition> {
		if file_path.extension().and_then(|ext| ext.to_str()) != Some("html") {
			return Err(ComposeError::InvalidInputKind(
				file_path.display().to_string(),
			));
		}

		tracing::info!(template = %file_path.display(), "composing template");

		let prepared = prepare_editable_refs(self.resolver, file_path, contents);
		let mut document = resolve_relative_ps_links(self.resolver, file_path, &prepared);
		let mut metadata = Metadata::new(file_path);
		let mut runs = 0;
		let mut placeholders = self.scan(file_path, &document)?;

		while !placeholders.is_empty() && runs < options.max_runs {
			document = self.composition_run(file_path, &document, placeholders, &mut metadata, options)?;
			runs += 1;
			placeholders = self.scan(file_path, &document)?;
		}

		let converged = placeholders.is_empty();
		if !converged {
			tracing::warn!(
				template = %file_path.display(),
				runs,
				remaining = placeholders.len(),
				"composition stopped at the run limit; the template graph may be cyclic"
			);
		}

		Ok(Composition {
			content: document,
			metadata,
			runs,
			converged,
		})
	}

	/// Read a fragment the way `file`, `layout` and `wrap` placeholders see
	/// it: editable refs prepared, its first `wrap` applied and relative
	/// `ps:` links resolved.
	pub fn read_fragment(&self, path: &Path) -> ComposeResult<String> {
		self.read_fragment_inner(path, &mut Vec::new())
	}

	pub(crate) fn read_fragment_inner(
		&self,
		path: &Path,
		wrapping: &mut Vec<PathBuf>,
	) -> ComposeResult<String> {
		let raw = self.resolver.read_to_string(path)?;
		let mut contents = prepare_editable_refs(self.resolver, path, &raw);
		let wraps = scan_type(self.resolver, path, &contents, PlaceholderType::Wrap)?;
		if let Some(wrap) = wraps.first() {
			contents = self.apply_wrap(wrap, &contents, wrapping)?;
		}

		Ok(resolve_relative_ps_links(self.resolver, path, &contents))
	}

	/// Apply every placeholder once, from the end of the document backwards
	/// so that the offsets of unprocessed placeholders stay valid.
	fn composition_run(
		&self,
		template_path: &Path,
		document: &str,
		mut placeholders: Vec<Placeholder>,
		metadata: &mut Metadata,
		options: ComposeOptions,
	) -> ComposeResult<String> {
		placeholders.sort_by(|a, b| b.start.cmp(&a.start));
		ensure_disjoint(&placeholders, template_path)?;

		let linked_styles = metadata.include.style.len();
		let linked_scripts = metadata.include.script.len();
		let mut composed = document.to_string();
		let mut pending_wrap: Option<Placeholder> = None;
		for placeholder in &placeholders {
			tracing::debug!(placeholder = %placeholder.label(), start = placeholder.start, "processing placeholder");

			if placeholder.r#type == PlaceholderType::Wrap {
				// The wrapper surrounds the whole document, so it is applied
				// after everything else. Further wraps wait for the next run.
				if pending_wrap.is_none() {
					pending_wrap = Some(placeholder.clone());
				}
				continue;
			}

			let before = composed.len();
			composed = match placeholder.r#type {
				PlaceholderType::File => self.replace_file(placeholder, &composed, options)?,
				PlaceholderType::Content => {
					let notice = format!(
						"<!-- content placeholder not called as layout - content:{} -->",
						placeholder.name
					);
					replace_span(&composed, placeholder, &notice)
				}
				PlaceholderType::Layout => self.replace_layout(placeholder, &composed, options)?,
				PlaceholderType::LinkCss | PlaceholderType::LinkScript => {
					self.link_resource(placeholder, &composed, template_path, metadata)?
				}
				PlaceholderType::Wrap => continue,
			};

			// Everything processed after the wrap lies before it.
			if let Some(wrap) = pending_wrap.as_mut() {
				wrap.start = wrap.start + composed.len() - before;
				wrap.end = wrap.end + composed.len() - before;
			}
		}

		// Links were collected back to front.
		metadata.include.style[linked_styles..].reverse();
		metadata.include.script[linked_scripts..].reverse();

		if let Some(wrap) = pending_wrap {
			composed = self.apply_wrap(&wrap, &composed, &mut Vec::new())?;
		}

		Ok(composed)
	}

	fn replace_file(
		&self,
		placeholder: &Placeholder,
		document: &str,
		options: ComposeOptions,
	) -> ComposeResult<String> {
		let fragment = self
			.resolver
			.resolve_placeholder(placeholder)
			.and_then(|path| self.read_fragment(&path));

		let replacement = match fragment {
			Ok(contents) => contents.trim().to_string(),
			Err(e) if e.is_resolution() => {
				tracing::warn!(placeholder = %placeholder.label(), file = %placeholder.filepath.display(), error = %e, "could not process file placeholder");
				error_markup(&format!("Could not process {}", placeholder.label()))
			}
			Err(e) => return Err(e),
		};

		Ok(replace_marked(
			document,
			placeholder,
			&replacement,
			options.mark_regions,
		))
	}

	/// Remove the wrap tag from `document` and place what is left inside the
	/// wrapper's `content:main` slot.
	pub(crate) fn apply_wrap(
		&self,
		placeholder: &Placeholder,
		document: &str,
		wrapping: &mut Vec<PathBuf>,
	) -> ComposeResult<String> {
		let wrapper_path = match self.resolver.resolve_placeholder(placeholder) {
			Ok(path) => path,
			Err(e) if e.is_resolution() => return Ok(self.unresolved_wrap(placeholder, document, &e)),
			Err(e) => return Err(e),
		};

		if wrapping.contains(&wrapper_path) {
			return Err(ComposeError::WrapCycle(wrapper_path.display().to_string()));
		}

		wrapping.push(wrapper_path.clone());
		let wrapper = self.read_fragment_inner(&wrapper_path, wrapping);
		wrapping.pop();

		let wrapper = match wrapper {
			Ok(contents) => contents.trim().to_string(),
			Err(e) if e.is_resolution() => return Ok(self.unresolved_wrap(placeholder, document, &e)),
			Err(e) => return Err(e),
		};

		let main = find_main_slot(self.resolver, &wrapper_path, &wrapper)?;
		let unwrapped = replace_span(document, placeholder, "");

		Ok(replace_span(&wrapper, &main, &unwrapped))
	}

	fn unresolved_wrap(&self, placeholder: &Placeholder, document: &str, error: &ComposeError) -> String {
		tracing::warn!(placeholder = %placeholder.label(), file = %placeholder.filepath.display(), %error, "could not process wrap placeholder");
		replace_span(
			document,
			placeholder,
			&error_markup(&format!("Could not process {}", placeholder.label())),
		)
	}

	/// Record a `linkCss`/`linkScript` resource in the metadata and drop the
	/// tag from the document.
	fn link_resource(
		&self,
		placeholder: &Placeholder,
		document: &str,
		template_path: &Path,
		metadata: &mut Metadata,
	) -> ComposeResult<String> {
		let kind = if placeholder.r#type == PlaceholderType::LinkCss {
			"style"
		} else {
			"script"
		};

		let resource = if placeholder.name == "default" {
			default_resource_path(template_path, placeholder.r#type.resource_extension())
		} else {
			match self.resolver.resolve_placeholder(placeholder) {
				Ok(path) => path,
				Err(e) if e.is_resolution() => {
					return Err(ComposeError::MissingResource {
						kind,
						template: template_path.display().to_string(),
						path: placeholder.name.clone(),
					});
				}
				Err(e) => return Err(e),
			}
		};

		if !self.resolver.exists(&resource) {
			return Err(ComposeError::MissingResource {
				kind,
				template: template_path.display().to_string(),
				path: resource.display().to_string(),
			});
		}

		let url = self.resolver.url_path_for_file(&resource);
		tracing::debug!(%url, kind, "linked resource");
		if placeholder.r#type == PlaceholderType::LinkCss {
			metadata.include.style.push(url);
		} else {
			metadata.include.script.push(url);
		}

		Ok(replace_span(document, placeholder, ""))
	}

	/// Whether `value` starts with one of the configured type prefixes, e.g.
	/// `file:`.
	pub(crate) fn has_type_prefix(&self, value: &str) -> bool {
		self.types.iter().any(|kind| {
			value
				.strip_prefix(kind.as_str())
				.is_some_and(|rest| rest.starts_with(':'))
		})
	}
}

/// The sibling resource `linkCss:default`/`linkScript:default` points at:
/// `pages/about.html` → `pages/about.css`, and for an index page the file
/// named after its directory, `pages/index.html` → `pages/pages.css`.
pub fn default_resource_path(template_path: &Path, extension: &str) -> PathBuf {
	let is_index = template_path
		.file_name()
		.is_some_and(|name| name == "index.html");
	let dir = template_path.parent();
	let dir_name = dir.and_then(Path::file_name).and_then(|name| name.to_str());

	match (is_index, dir, dir_name) {
		(true, Some(dir), Some(dir_name)) => dir.join(format!("{dir_name}.{extension}")),
		_ => template_path.with_extension(extension),
	}
}

/// Find the single `content:main` slot of a wrapper.
pub(crate) fn find_main_slot<R: PathResolver + ?Sized>(
	resolver: &R,
	wrapper_path: &Path,
	wrapper: &str,
) -> ComposeResult<Placeholder> {
	let mut main = None;
	for slot in scan_type(resolver, wrapper_path, wrapper, PlaceholderType::Content)? {
		if slot.name != "main" {
			continue;
		}
		if main.is_some() {
			return Err(ComposeError::OverlappingMainSlot(
				wrapper_path.display().to_string(),
			));
		}
		main = Some(slot);
	}

	main.ok_or_else(|| ComposeError::MissingMainSlot(wrapper_path.display().to_string()))
}

/// Placeholders must be sorted by descending start offset.
fn ensure_disjoint(placeholders: &[Placeholder], template_path: &Path) -> ComposeResult<()> {
	for pair in placeholders.windows(2) {
		let (later, earlier) = (&pair[0], &pair[1]);
		if earlier.end > later.start {
			return Err(ComposeError::OverlappingPlaceholders {
				first: earlier.tag.clone(),
				second: later.tag.clone(),
				file: template_path.display().to_string(),
			});
		}
	}
	Ok(())
}

/// Replace the span of `placeholder` in `content`.
pub(crate) fn replace_span(content: &str, placeholder: &Placeholder, replacement: &str) -> String {
	let mut result = String::with_capacity(
		content.len() - (placeholder.end - placeholder.start) + replacement.len(),
	);
	result.push_str(&content[..placeholder.start]);
	result.push_str(replacement);
	result.push_str(&content[placeholder.end..]);
	result
}

/// Replace the span of `placeholder`, optionally wrapping the replacement in
/// `begin_`/`end_` marker comments.
pub(crate) fn replace_marked(
	content: &str,
	placeholder: &Placeholder,
	replacement: &str,
	mark: bool,
) -> String {
	if !mark {
		return replace_span(content, placeholder, replacement);
	}

	let definition = format!(
		"{}-{}{}",
		placeholder.r#type,
		placeholder.name,
		placeholder.args_suffix()
	);
	let marked = format!(
		"{BEGIN_MARKER}{definition}{TAG_CLOSE}{replacement}{END_MARKER}{definition}{TAG_CLOSE}"
	);
	replace_span(content, placeholder, &marked)
}

/// The visible block that stands in for a reference that could not be
/// resolved.
pub fn error_markup(message: &str) -> String {
	format!("<div style=\"background-color: #f08080\">{message}</div>")
}
