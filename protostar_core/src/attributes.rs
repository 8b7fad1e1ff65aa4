//! Attribute rewrites applied to every template and fragment before its
//! placeholders are resolved.

use std::path::Path;

use crate::PathResolver;
use crate::resolver::normalize_path;

const EDITABLE_ATTR: &str = "data-editable";
const EMPTY_VALUE: &str = "=\"\"";
const PS_PREFIX: &str = "\"ps:";
const PS_PARENT_DIR: &str = "\"ps:../";
const PS_SAME_DIR: &str = "\"ps:./";

/// Give every valueless `data-editable` attribute a reference to the file it
/// came from and make the element content-editable.
///
/// `<div data-editable>` in `/pages/about.html` becomes
/// `<div data-editable="pages/about" contenteditable="true" >`. Attributes
/// that already carry a value are left alone, so the rewrite is idempotent.
pub fn prepare_editable_refs<R: PathResolver + ?Sized>(
	resolver: &R,
	file_path: &Path,
	contents: &str,
) -> String {
	if !contents.contains(EDITABLE_ATTR) {
		return contents.to_string();
	}

	let url = resolver.url_path_for_file(file_path);
	let url = url.trim_start_matches('/');
	let editable_ref = url.rsplit_once('.').map_or(url, |(stem, _)| stem);
	let attribute = format!("{EDITABLE_ATTR}=\"{editable_ref}\" contenteditable=\"true\" ");

	let mut result = contents.to_string();
	let mut from = 0;
	while let Some(found) = result[from..].find(EDITABLE_ATTR) {
		let start = from + found;
		let after = start + EDITABLE_ATTR.len();
		let rest = &result[after..];

		let replace_end = if rest.starts_with(EMPTY_VALUE) {
			Some(after + EMPTY_VALUE.len())
		} else if rest.starts_with('=') {
			None
		} else {
			Some(after)
		};

		match replace_end {
			Some(end) => {
				result.replace_range(start..end, &attribute);
				from = start + attribute.len();
			}
			None => from = after,
		}
	}

	result
}

/// Resolve `"ps:./…"` and `"ps:../…"` attribute values relative to the file
/// they appear in and strip the `ps:` marker from every other value.
pub fn resolve_relative_ps_links<R: PathResolver + ?Sized>(
	resolver: &R,
	file_path: &Path,
	contents: &str,
) -> String {
	if !contents.contains(PS_PREFIX) {
		return contents.to_string();
	}

	let base = file_path.parent().unwrap_or_else(|| Path::new(""));
	let mut result = contents.to_string();

	for selector in [PS_PARENT_DIR, PS_SAME_DIR] {
		let positions: Vec<usize> = result.match_indices(selector).map(|(i, _)| i).collect();
		for index in positions.into_iter().rev() {
			let value_start = index + PS_PREFIX.len();
			let Some(close) = result[value_start..].find('"') else {
				continue;
			};
			let value_end = value_start + close;
			let relative = &result[value_start..value_end];
			let resolved = normalize_path(&base.join(relative));
			let mut url = resolver.url_path_for_file(&resolved);
			if !url.starts_with("/ps/") && url.starts_with('/') {
				url.remove(0);
			}

			tracing::debug!(link = relative, resolved = %url, "resolved relative ps: link");
			result.replace_range(index + 1..value_end, &url);
		}
	}

	result.replace(PS_PREFIX, "\"")
}
