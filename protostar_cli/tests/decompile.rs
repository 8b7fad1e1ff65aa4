mod common;

use protostar_core::AnyEmptyResult;
use serde_json::Value;

const MARKED: &str = "<!-- begin_layout-/base(main=file:/body) --><main><!-- begin_file-/body \
                      --><p>Body</p><!-- end_file-/body --></main><!-- \
                      end_layout-/base(main=file:/body) -->";

#[test]
fn decompile_prints_placeholders() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "out.html", MARKED);

	common::protostar_cmd()
		.arg("decompile")
		.arg("out.html")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("<!-- layout:/base(main=file:/body) -->\n");

	Ok(())
}

#[test]
fn decompile_recursive_json_lists_nested_markers() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "out.html", MARKED);

	let output = common::protostar_cmd()
		.arg("decompile")
		.arg("out.html")
		.arg("--recursive")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.output()?;
	assert!(output.status.success());

	let json: Value = serde_json::from_slice(&output.stdout)?;
	let markers = json["markers"]
		.as_array()
		.unwrap_or_else(|| panic!("markers should be an array"));
	assert_eq!(markers.len(), 2);
	assert_eq!(markers[0]["type"], "layout");
	assert_eq!(markers[0]["content"], "<main><!-- file:/body --></main>");
	assert_eq!(markers[0]["nestedMarkers"][0], 1);
	assert_eq!(markers[1]["name"], "/body");
	assert_eq!(markers[1]["content"], "<p>Body</p>");

	Ok(())
}

#[test]
fn decompile_unmatched_marker_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "out.html", "<!-- begin_file-/a -->X");

	common::protostar_cmd()
		.arg("decompile")
		.arg("out.html")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("Cannot find matching end tag"));

	Ok(())
}
