use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ComposeError {
	#[error(transparent)]
	#[diagnostic(code(protostar::io_error))]
	Io(#[from] std::io::Error),

	#[error("should be an *.html file: `{0}`")]
	#[diagnostic(
		code(protostar::invalid_input_kind),
		help("only markup templates with an `.html` extension can be composed")
	)]
	InvalidInputKind(String),

	#[error("illegal empty name in `{kind}` placeholder in {file}")]
	#[diagnostic(
		code(protostar::empty_name),
		help("placeholders need a name, e.g. `<!-- file:/header -->`")
	)]
	EmptyName { kind: String, file: String },

	#[error("placeholder `{tag}` in {file} is never closed")]
	#[diagnostic(
		code(protostar::unterminated_placeholder),
		help("close the placeholder with ` -->`")
	)]
	UnterminatedPlaceholder { tag: String, file: String },

	#[error("All or none of the droppoints should be assigned by name : {tag}")]
	#[diagnostic(
		code(protostar::mixed_arguments),
		help("use either `name=value` for every argument or for none of them")
	)]
	MixedArguments { tag: String },

	#[error("Missing type prefix (eg file:) in {0}")]
	#[diagnostic(
		code(protostar::missing_type_prefix),
		help("prefix the value with a placeholder type (`file:/part`) or quote it as a literal")
	)]
	MissingTypePrefix(String),

	#[error("Could not find content:main inside {0} which is being invoked as wrapper")]
	#[diagnostic(
		code(protostar::missing_main_slot),
		help("add exactly one `<!-- content:main -->` to the wrapper")
	)]
	MissingMainSlot(String),

	#[error("Overlapping content:main droppoint in {0}")]
	#[diagnostic(
		code(protostar::overlapping_main_slot),
		help("a wrapper may only declare a single `<!-- content:main -->`")
	)]
	OverlappingMainSlot(String),

	#[error("wrapper `{0}` wraps itself")]
	#[diagnostic(code(protostar::wrap_cycle))]
	WrapCycle(String),

	#[error("placeholders `{first}` and `{second}` overlap in {file}")]
	#[diagnostic(
		code(protostar::overlapping_placeholders),
		help("placeholder tags must not be nested inside each other")
	)]
	OverlappingPlaceholders {
		first: String,
		second: String,
		file: String,
	},

	#[error("There is no default {kind} to include for {template}: {path}")]
	#[diagnostic(code(protostar::missing_resource))]
	MissingResource {
		kind: &'static str,
		template: String,
		path: String,
	},

	#[error("unknown placeholder type: `{0}`")]
	#[diagnostic(
		code(protostar::unknown_placeholder_type),
		help("available types: file, content, layout, wrap, linkCss, linkScript")
	)]
	UnknownPlaceholderType(String),

	#[error("could not resolve `{kind}:{name}`: {reason}")]
	#[diagnostic(code(protostar::unresolved))]
	Unresolved {
		kind: String,
		name: String,
		reason: String,
	},

	#[error("Cannot find matching end tag for {0}")]
	#[diagnostic(
		code(protostar::unmatched_marker),
		help("every `<!-- begin_… -->` marker needs its `<!-- end_… -->` counterpart")
	)]
	UnmatchedMarker(String),

	#[error("symlink cycle detected at `{path}`")]
	#[diagnostic(
		code(protostar::symlink_cycle),
		help("a symbolic link points back to one of its parent directories")
	)]
	SymlinkCycle { path: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(protostar::config_parse),
		help("check that protostar.toml is valid TOML")
	)]
	ConfigParse(String),
}

impl ComposeError {
	/// Whether this error means a referenced file could not be found or read.
	/// These degrade to an inline error block instead of aborting the
	/// composition.
	pub fn is_resolution(&self) -> bool {
		matches!(self, Self::Unresolved { .. } | Self::Io(_))
	}
}

pub type ComposeResult<T> = Result<T, ComposeError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
