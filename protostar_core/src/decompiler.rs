//! Turns marker-wrapped output back into placeholder tags.
//!
//! Composing with `mark_regions` enabled leaves every resolved `file` and
//! `layout` region between a pair of comments:
//!
//! ```html
//! <!-- begin_file-/header --><header>…</header><!-- end_file-/header -->
//! ```
//!
//! Decompiling replaces each such region with `<!-- file:/header -->` and
//! reports what was inside as a [`Marker`].
//!
//! Arguments are kept in the syntax the placeholder was written in. A legacy
//! `layout:/base:a,b` marks as `begin_layout-/base:a,b`, while the call form
//! `layout:/base(a;b)` marks as `begin_layout-/base(a;b)` so that `;`
//! separated named arguments survive. Readers that only know the colon form
//! and take everything up to the first space as the name will see
//! `/base(a;b)` as the name of such a marker; compose those templates with the
//! colon form when that output has to stay readable for them.

use serde::Serialize;

use crate::ComposeError;
use crate::ComposeResult;
use crate::PlaceholderType;
use crate::scanner::TAG_CLOSE;
use crate::scanner::TAG_OPEN;

/// Opening of a begin marker comment.
pub const BEGIN_MARKER: &str = "<!-- begin_";
/// Opening of an end marker comment.
pub const END_MARKER: &str = "<!-- end_";

/// Passes over nested marker contents before `decompile_recursive` stops.
pub const MAX_RECURSIVE_PASSES: usize = 1000;

/// A region that was expanded from a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
	pub name: String,
	pub r#type: PlaceholderType,
	/// Raw argument suffix as written after the name: empty, `:a,b` or
	/// `(a;b)`.
	pub args: String,
	/// Offset of the begin marker in the text being decompiled at the time
	/// the marker was extracted.
	pub start: usize,
	/// Offset one past the end marker.
	pub end: usize,
	/// Everything between the begin and end markers.
	pub content: String,
	/// Indices into the flat marker list of markers found inside `content`.
	/// Only filled by [`decompile_recursive`].
	pub nested_markers: Vec<usize>,
}

impl Marker {
	/// The placeholder tag the region collapses into.
	pub fn placeholder_tag(&self) -> String {
		format!("{TAG_OPEN}{}:{}{}{TAG_CLOSE}", self.r#type, self.name, self.args)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decompiled {
	pub content: String,
	pub markers: Vec<Marker>,
}

/// Collapse every top-level marked region into its placeholder tag.
pub fn decompile(contents: &str) -> ComposeResult<Decompiled> {
	let mut content = contents.to_string();
	let mut markers = Vec::new();

	while let Some(start) = content.find(BEGIN_MARKER) {
		let definition_start = start + BEGIN_MARKER.len();
		let Some(close) = content[definition_start..].find(TAG_CLOSE) else {
			return Err(ComposeError::UnmatchedMarker(
				content[start..].lines().next().unwrap_or_default().to_string(),
			));
		};
		let definition_end = definition_start + close;
		let open_end = definition_end + TAG_CLOSE.len();
		let definition = &content[definition_start..definition_end];
		let (r#type, name, args) = parse_marker_definition(definition)?;

		let begin_tag = &content[start..open_end];
		let end_tag = format!("{END_MARKER}{definition}{TAG_CLOSE}");
		let Some(end_start) = find_matching_end(&content, begin_tag, &end_tag, open_end) else {
			return Err(ComposeError::UnmatchedMarker(begin_tag.to_string()));
		};
		let end = end_start + end_tag.len();

		let marker = Marker {
			name,
			r#type,
			args,
			start,
			end,
			content: content[open_end..end_start].to_string(),
			nested_markers: Vec::new(),
		};
		tracing::debug!(marker = %marker.placeholder_tag(), start, end, "decompiled marker");

		content.replace_range(start..end, &marker.placeholder_tag());
		markers.push(marker);
	}

	Ok(Decompiled { content, markers })
}

/// Decompile `contents` and then the content of every marker that still
/// holds marked regions, linking the nested markers to their parent.
pub fn decompile_recursive(contents: &str) -> ComposeResult<Decompiled> {
	let mut decompiled = decompile(contents)?;
	let mut pending_from = 0;

	for _ in 0..MAX_RECURSIVE_PASSES {
		let pending_to = decompiled.markers.len();
		if pending_from == pending_to {
			return Ok(decompiled);
		}

		for index in pending_from..pending_to {
			if !decompiled.markers[index].content.contains(BEGIN_MARKER) {
				continue;
			}

			let nested = decompile(&decompiled.markers[index].content)?;
			let first = decompiled.markers.len();
			let indices: Vec<usize> = (first..first + nested.markers.len()).collect();
			decompiled.markers.extend(nested.markers);

			let parent = &mut decompiled.markers[index];
			parent.content = nested.content;
			parent.nested_markers = indices;
		}

		pending_from = pending_to;
	}

	if decompiled.markers[pending_from..]
		.iter()
		.any(|marker| marker.content.contains(BEGIN_MARKER))
	{
		tracing::warn!(
			passes = MAX_RECURSIVE_PASSES,
			"recursive decompile stopped at the pass limit"
		);
	}
	Ok(decompiled)
}

/// Split `file-/header(a;b)` into its type, name and raw argument suffix.
pub fn parse_marker_definition(definition: &str) -> ComposeResult<(PlaceholderType, String, String)> {
	let Some((type_name, rest)) = definition.split_once('-') else {
		return Err(ComposeError::UnknownPlaceholderType(definition.to_string()));
	};
	let r#type: PlaceholderType = type_name.parse()?;

	let args_start = rest.find([':', '(']).unwrap_or(rest.len());
	Ok((
		r#type,
		rest[..args_start].to_string(),
		rest[args_start..].to_string(),
	))
}

/// Find the end tag that closes the begin tag ending at `from`. Identical
/// begin tags in between open another level.
fn find_matching_end(content: &str, begin_tag: &str, end_tag: &str, from: usize) -> Option<usize> {
	let mut depth = 0usize;
	let mut cursor = from;

	loop {
		let next_end = content[cursor..].find(end_tag).map(|i| cursor + i)?;
		match content[cursor..].find(begin_tag).map(|i| cursor + i) {
			Some(next_begin) if next_begin < next_end => {
				depth += 1;
				cursor = next_begin + begin_tag.len();
			}
			_ => {
				if depth == 0 {
					return Some(next_end);
				}
				depth -= 1;
				cursor = next_end + end_tag.len();
			}
		}
	}
}
