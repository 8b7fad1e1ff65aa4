use std::collections::HashMap;

use crate::ComposeError;
use crate::ComposeOptions;
use crate::ComposeResult;
use crate::Composer;
use crate::PathResolver;
use crate::Placeholder;
use crate::PlaceholderType;
use crate::engine::error_markup;
use crate::engine::find_main_slot;
use crate::engine::replace_marked;
use crate::engine::replace_span;
use crate::scanner::TAG_CLOSE;
use crate::scanner::TAG_OPEN;
use crate::scanner::scan_type;

const VALUE_SEPARATOR: char = ',';

/// How the arguments of a layout bind to its content slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
	/// `layout:/base(main=file:/body;aside='<hr>')`
	ByName,
	/// `layout:/base(file:/body;'<hr>')`
	ByPosition,
}

impl BindingMode {
	/// Decide the mode from the arguments in reversed order. The first of them
	/// picks the mode and every other argument has to agree with it.
	pub fn detect(placeholder: &Placeholder, reversed_args: &[String]) -> ComposeResult<Self> {
		let Some(first) = reversed_args.first() else {
			return Ok(Self::ByPosition);
		};

		let by_name = is_named_argument(first);
		if reversed_args
			.iter()
			.any(|arg| is_named_argument(arg) != by_name)
		{
			return Err(ComposeError::MixedArguments {
				tag: placeholder.tag.clone(),
			});
		}

		Ok(if by_name { Self::ByName } else { Self::ByPosition })
	}
}

/// `key=value` where the `=` is not the first character and comes before any
/// opening parenthesis, so `file:/x(wrap=y)` stays positional.
pub(crate) fn is_named_argument(arg: &str) -> bool {
	match (arg.find('='), arg.find('(')) {
		(Some(eq), Some(paren)) => eq > 0 && eq < paren,
		(Some(eq), None) => eq > 0,
		(None, _) => false,
	}
}

/// `a,b` splits into two values unless the comma leads the value.
fn split_values(value: &str) -> Vec<&str> {
	match value.find(VALUE_SEPARATOR) {
		Some(index) if index > 0 => value.split(VALUE_SEPARATOR).collect(),
		_ => vec![value],
	}
}

fn unquote(value: &str) -> Option<&str> {
	let quote = value.chars().next().filter(|c| *c == '\'' || *c == '"')?;
	let inner = &value[quote.len_utf8()..];
	Some(inner.strip_suffix(quote).unwrap_or(inner))
}

impl<R: PathResolver + ?Sized> Composer<'_, R> {
	/// Fill the slots of the layout referenced by `placeholder` and splice the
	/// result into `document`.
	pub(crate) fn replace_layout(
		&self,
		placeholder: &Placeholder,
		document: &str,
		options: ComposeOptions,
	) -> ComposeResult<String> {
		let loaded = self
			.resolver
			.resolve_placeholder(placeholder)
			.and_then(|path| Ok((self.read_fragment(&path)?, path)));

		let (layout, layout_path) = match loaded {
			Ok((contents, path)) => (contents.trim().to_string(), path),
			Err(e) if e.is_resolution() => {
				tracing::warn!(placeholder = %placeholder.label(), file = %placeholder.filepath.display(), error = %e, "could not process layout placeholder");
				let message = format!("Could not process layoutPlaceholder {}", placeholder.label());
				return Ok(replace_marked(
					document,
					placeholder,
					&error_markup(&message),
					options.mark_regions,
				));
			}
			Err(e) => return Err(e),
		};

		let mut slots = scan_type(self.resolver, &layout_path, &layout, PlaceholderType::Content)?;
		slots.reverse();
		let args: Vec<String> = placeholder.args.iter().rev().cloned().collect();
		let mode = BindingMode::detect(placeholder, &args)?;
		tracing::debug!(placeholder = %placeholder.label(), ?mode, slots = slots.len(), "binding layout arguments");

		let by_name: HashMap<&str, &str> = match mode {
			BindingMode::ByName => {
				args.iter()
					.filter_map(|arg| arg.split_once('='))
					.collect()
			}
			BindingMode::ByPosition => HashMap::new(),
		};

		let mut body = layout;
		for (index, slot) in slots.iter().enumerate() {
			let bound = match mode {
				BindingMode::ByName => by_name.get(slot.name.as_str()).copied(),
				BindingMode::ByPosition => args.get(index).map(String::as_str),
			};

			let mut replacement = match bound {
				Some(value) => self.bind_values(value)?,
				None => String::new(),
			};

			if let Some(wrapper) = slot.wrapper_name() {
				replacement = self.wrap_slot(slot, wrapper, &replacement)?;
			}

			body = replace_span(&body, slot, &replacement);
		}

		Ok(replace_marked(
			document,
			placeholder,
			body.trim(),
			options.mark_regions,
		))
	}

	/// Turn an argument value into slot markup. Quoted literals are inserted
	/// as they are, anything else must be a placeholder reference like
	/// `file:/body` and becomes a placeholder tag again.
	fn bind_values(&self, value: &str) -> ComposeResult<String> {
		let mut bound = String::new();
		for part in split_values(value) {
			if let Some(literal) = unquote(part) {
				bound.push_str(literal);
				continue;
			}

			if !self.has_type_prefix(part) {
				return Err(ComposeError::MissingTypePrefix(part.to_string()));
			}

			bound.push_str(TAG_OPEN);
			bound.push_str(part);
			bound.push_str(TAG_CLOSE);
		}

		Ok(bound)
	}

	/// Place `bound` inside the `content:main` slot of the wrapper a slot
	/// names with `wrap=...`. The wrapper is used raw.
	fn wrap_slot(&self, slot: &Placeholder, wrapper: &str, bound: &str) -> ComposeResult<String> {
		let name = if wrapper.starts_with('/') {
			wrapper.to_string()
		} else {
			format!("/{wrapper}")
		};
		let reference = Placeholder::detached(PlaceholderType::Wrap, name, &slot.filepath);

		let loaded = self
			.resolver
			.resolve_placeholder(&reference)
			.and_then(|path| Ok((self.resolver.read_to_string(&path)?, path)));

		let (contents, path) = match loaded {
			Ok(loaded) => loaded,
			Err(e) if e.is_resolution() => {
				tracing::warn!(slot = %slot.label(), wrapper, error = %e, "could not process slot wrapper");
				return Ok(error_markup(&format!("Could not process {}", reference.label())));
			}
			Err(e) => return Err(e),
		};

		let main = find_main_slot(self.resolver, &path, &contents)?;
		Ok(replace_span(&contents, &main, bound))
	}
}
