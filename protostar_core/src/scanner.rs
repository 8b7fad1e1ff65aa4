use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::ComposeError;
use crate::ComposeResult;
use crate::PathResolver;
use crate::layout::is_named_argument;
use crate::resolver::normalize_path;

/// Opening of every placeholder comment.
pub const TAG_OPEN: &str = "<!-- ";
/// Closing of every placeholder comment.
pub const TAG_CLOSE: &str = " -->";

const NAME_SEPARATOR: char = ':';
const COLON_ARG_SEPARATOR: char = ',';
const CALL_ARG_SEPARATOR: char = ';';

/// The kind of a placeholder tag.
///
/// The set of kinds is closed; which of them a composer scans for is
/// configurable through `placeholder_types` in `protostar.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaceholderType {
	/// `<!-- file:/header -->` includes another fragment.
	File,
	/// `<!-- content:main -->` declares a slot inside a layout or wrapper.
	Content,
	/// `<!-- layout:/base(main=file:/body) -->` fills a layout's slots.
	Layout,
	/// `<!-- wrap:/frame -->` places the current document inside a wrapper.
	Wrap,
	/// `<!-- linkCss:default -->` registers a stylesheet include.
	LinkCss,
	/// `<!-- linkScript:default -->` registers a script include.
	LinkScript,
}

const PLACEHOLDER_TYPE_NAMES: [(PlaceholderType, &str); 6] = [
	(PlaceholderType::File, "file"),
	(PlaceholderType::Content, "content"),
	(PlaceholderType::Layout, "layout"),
	(PlaceholderType::Wrap, "wrap"),
	(PlaceholderType::LinkCss, "linkCss"),
	(PlaceholderType::LinkScript, "linkScript"),
];

impl PlaceholderType {
	pub const ALL: [PlaceholderType; 6] = [
		Self::File,
		Self::Content,
		Self::Layout,
		Self::Wrap,
		Self::LinkCss,
		Self::LinkScript,
	];

	/// The name used in tags, e.g. `linkCss`.
	pub fn as_str(self) -> &'static str {
		PLACEHOLDER_TYPE_NAMES
			.iter()
			.find_map(|(kind, name)| (*kind == self).then_some(*name))
			.unwrap_or_default()
	}

	/// Look up a kind from its tag name.
	pub fn lookup(name: &str) -> Option<Self> {
		PLACEHOLDER_TYPE_NAMES
			.iter()
			.find_map(|(kind, candidate)| (*candidate == name).then_some(*kind))
	}

	/// The text that starts a tag of this kind, e.g. `<!-- file:`.
	pub fn tag_prefix(self) -> String {
		format!("{TAG_OPEN}{}{NAME_SEPARATOR}", self.as_str())
	}

	/// File extension of the resource a name of this kind points at.
	pub fn resource_extension(self) -> &'static str {
		match self {
			Self::LinkCss => "css",
			Self::LinkScript => "js",
			Self::File | Self::Content | Self::Layout | Self::Wrap => "html",
		}
	}
}

impl FromStr for PlaceholderType {
	type Err = ComposeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::lookup(s).ok_or_else(|| ComposeError::UnknownPlaceholderType(s.to_string()))
	}
}

impl fmt::Display for PlaceholderType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// How the arguments of a placeholder were written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ArgsSyntax {
	/// No arguments.
	#[default]
	None,
	/// `name(a;b)` for layouts and wraps, `name(wrap=x)` for content slots.
	Call,
	/// Legacy `name:a,b`.
	Colon,
}

/// A located, parsed occurrence of a placeholder tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
	/// File reference, slot name, or resource name. Relative references are
	/// already normalized to an absolute, extension-less name.
	pub name: String,
	pub r#type: PlaceholderType,
	/// Byte offset of the first character of the tag.
	pub start: usize,
	/// Byte offset one past the closing ` -->`.
	pub end: usize,
	/// The verbatim source text of the tag.
	pub tag: String,
	/// Arguments, uniformly `key=value` or uniformly positional.
	pub args: Vec<String>,
	pub syntax: ArgsSyntax,
	/// The document the placeholder was found in.
	pub filepath: PathBuf,
}

impl Placeholder {
	/// A placeholder that does not come from scanned markup, used when a name
	/// has to go through the resolver directly.
	pub fn detached(r#type: PlaceholderType, name: impl Into<String>, filepath: &Path) -> Self {
		let name = name.into();
		Self {
			tag: format!("{TAG_OPEN}{}{NAME_SEPARATOR}{name}{TAG_CLOSE}", r#type),
			name,
			r#type,
			start: 0,
			end: 0,
			args: Vec::new(),
			syntax: ArgsSyntax::None,
			filepath: filepath.to_path_buf(),
		}
	}

	/// `type:name`, as used in diagnostics and inline error blocks.
	pub fn label(&self) -> String {
		format!("{}{NAME_SEPARATOR}{}", self.r#type, self.name)
	}

	/// The argument suffix written after the name in marker comments:
	/// empty, `:a,b` or `(a;b)`.
	pub fn args_suffix(&self) -> String {
		if self.args.is_empty() {
			return String::new();
		}

		match self.syntax {
			ArgsSyntax::Call => format!("({})", self.args.join(&CALL_ARG_SEPARATOR.to_string())),
			ArgsSyntax::Colon | ArgsSyntax::None => {
				format!(
					"{NAME_SEPARATOR}{}",
					self.args.join(&COLON_ARG_SEPARATOR.to_string())
				)
			}
		}
	}

	/// For a `content` slot declared as `content:name(wrap=frame)`, the
	/// wrapper name.
	pub fn wrapper_name(&self) -> Option<&str> {
		if self.r#type != PlaceholderType::Content {
			return None;
		}

		self.args.first().map(|arg| {
			arg.split_once('=')
				.map_or(arg.as_str(), |(_, value)| value)
				.trim()
		})
	}
}

/// Find all placeholders of the given kinds, ordered by start offset.
pub fn scan<R: PathResolver + ?Sized>(
	resolver: &R,
	filepath: &Path,
	content: &str,
	types: &[PlaceholderType],
) -> ComposeResult<Vec<Placeholder>> {
	let mut placeholders = Vec::new();
	for kind in types {
		placeholders.extend(scan_type(resolver, filepath, content, *kind)?);
	}
	placeholders.sort_by_key(|placeholder| placeholder.start);

	Ok(placeholders)
}

/// Find all placeholders of a single kind, ordered by start offset.
pub fn scan_type<R: PathResolver + ?Sized>(
	resolver: &R,
	filepath: &Path,
	content: &str,
	kind: PlaceholderType,
) -> ComposeResult<Vec<Placeholder>> {
	let prefix = kind.tag_prefix();
	let mut placeholders = Vec::new();
	let mut from = 0;

	while let Some(found) = content[from..].find(&prefix) {
		let start = from + found;
		let text_start = start + prefix.len();
		let Some(close) = content[text_start..].find(TAG_CLOSE) else {
			return Err(ComposeError::UnterminatedPlaceholder {
				tag: content[start..].lines().next().unwrap_or_default().to_string(),
				file: filepath.display().to_string(),
			});
		};
		let text_end = text_start + close;
		let end = text_end + TAG_CLOSE.len();
		let tag = &content[start..end];
		let raw = &content[text_start..text_end];

		let (name, args, syntax) = match kind {
			PlaceholderType::Content => parse_content(raw),
			PlaceholderType::Layout | PlaceholderType::Wrap => parse_call(raw, tag)?,
			PlaceholderType::File | PlaceholderType::LinkCss | PlaceholderType::LinkScript => {
				(raw.to_string(), Vec::new(), ArgsSyntax::None)
			}
		};

		if name.is_empty() {
			return Err(ComposeError::EmptyName {
				kind: kind.to_string(),
				file: filepath.display().to_string(),
			});
		}

		let mut placeholder = Placeholder {
			name,
			r#type: kind,
			start,
			end,
			tag: tag.to_string(),
			args,
			syntax,
			filepath: filepath.to_path_buf(),
		};
		absolutize_name(resolver, &mut placeholder);
		tracing::trace!(placeholder = %placeholder.label(), start, end, "constructed placeholder");
		placeholders.push(placeholder);

		from = end;
	}

	Ok(placeholders)
}

/// `content:name[:display][(wrap=frame)]`
fn parse_content(raw: &str) -> (String, Vec<String>, ArgsSyntax) {
	let name_only = match raw.find(NAME_SEPARATOR) {
		Some(index) if index > 0 => &raw[..index],
		_ => raw,
	};

	match name_only.find('(') {
		Some(paren) if paren > 0 => {
			let inner = &name_only[paren + 1..];
			let inner = inner.strip_suffix(')').unwrap_or(inner);
			(
				name_only[..paren].to_string(),
				vec![inner.to_string()],
				ArgsSyntax::Call,
			)
		}
		_ => (name_only.to_string(), Vec::new(), ArgsSyntax::None),
	}
}

/// `name(a;b)` or the legacy `name:a,b`.
fn parse_call(raw: &str, tag: &str) -> ComposeResult<(String, Vec<String>, ArgsSyntax)> {
	if let (Some(inner), Some(paren)) = (raw.strip_suffix(')'), raw.find('(')) {
		let args: Vec<String> = inner[paren + 1..]
			.split(CALL_ARG_SEPARATOR)
			.map(|arg| arg.trim().to_string())
			.filter(|arg| !arg.is_empty())
			.collect();

		// `name()` has no arguments to disagree.
		let found_by_name = args.iter().any(|arg| is_named_argument(arg));
		let all_by_name = args.iter().all(|arg| is_named_argument(arg));
		if !args.is_empty() && found_by_name != all_by_name {
			return Err(ComposeError::MixedArguments {
				tag: tag.to_string(),
			});
		}

		let syntax = if args.is_empty() {
			ArgsSyntax::None
		} else {
			ArgsSyntax::Call
		};
		return Ok((raw[..paren].to_string(), args, syntax));
	}

	match raw.find(NAME_SEPARATOR) {
		Some(colon) if colon > 0 => {
			let args: Vec<String> = raw[colon + 1..]
				.split(COLON_ARG_SEPARATOR)
				.map(|arg| arg.trim().to_string())
				.filter(|arg| !arg.is_empty())
				.collect();
			let syntax = if args.is_empty() {
				ArgsSyntax::None
			} else {
				ArgsSyntax::Colon
			};
			Ok((raw[..colon].to_string(), args, syntax))
		}
		Some(_) => Ok((String::new(), Vec::new(), ArgsSyntax::None)),
		None => Ok((raw.to_string(), Vec::new(), ArgsSyntax::None)),
	}
}

fn is_relative_name(name: &str) -> bool {
	name.starts_with("./") || name.starts_with("../")
}

/// Rewrite `./part` and `../part` into a name relative to the project root,
/// e.g. `./header` inside `/pages/about.html` becomes `/pages/header`.
fn absolutize_name<R: PathResolver + ?Sized>(resolver: &R, placeholder: &mut Placeholder) {
	if !is_relative_name(&placeholder.name) {
		return;
	}

	let base = placeholder.filepath.parent().unwrap_or_else(|| Path::new(""));
	let absolute = normalize_path(&base.join(format!("{}.html", placeholder.name)));
	let url = resolver.url_path_for_file(&absolute);
	let url = url.strip_suffix(".html").unwrap_or(&url);
	let name = if url.starts_with('/') {
		url.to_string()
	} else {
		format!("/{url}")
	};

	tracing::debug!(
		from = %placeholder.name,
		to = %name,
		file = %placeholder.filepath.display(),
		"resolved relative placeholder name"
	);
	placeholder.name = name;
}
