mod common;

use clap::Parser;
use protostar_cli::Commands;
use protostar_cli::OutputFormat;
use protostar_cli::ProtostarCli;
use protostar_core::AnyEmptyResult;
use serde_json::Value;

#[test]
fn compose_prints_flattened_template() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = common::sample_site(tmp.path());

	common::protostar_cmd()
		.arg("compose")
		.arg("pages/about.html")
		.arg("--path")
		.arg(&root)
		.assert()
		.success()
		.stdout("<title>About</title><main><p>Body</p></main>\n");

	Ok(())
}

#[test]
fn compose_json_includes_metadata() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = common::sample_site(tmp.path());

	let output = common::protostar_cmd()
		.arg("compose")
		.arg("index.html")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(&root)
		.output()?;
	assert!(output.status.success());

	let json: Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(json["content"], "<h1>Hi</h1>");
	assert_eq!(json["converged"], true);
	assert_eq!(json["metadata"]["include"]["style"][0], "/site.css");

	Ok(())
}

#[test]
fn compose_with_markers() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = common::sample_site(tmp.path());

	common::protostar_cmd()
		.arg("compose")
		.arg("index.html")
		.arg("--markers")
		.arg("--path")
		.arg(&root)
		.assert()
		.success()
		.stdout("<!-- begin_file-/_header --><h1>Hi</h1><!-- end_file-/_header -->\n");

	Ok(())
}

#[test]
fn compose_warns_when_run_limit_is_reached() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = common::sample_site(tmp.path());

	common::protostar_cmd()
		.arg("compose")
		.arg("pages/about.html")
		.arg("--max-runs")
		.arg("1")
		.arg("--path")
		.arg(&root)
		.assert()
		.success()
		.stdout(predicates::str::contains("<!-- file:/_body -->"))
		.stderr(predicates::str::contains("did not converge after 1 runs"));

	Ok(())
}

#[test]
fn compose_reports_diagnostics() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	common::write(root, "index.html", "<!-- layout:/base(main=file:/a;file:/b) -->");

	common::protostar_cmd()
		.arg("compose")
		.arg("index.html")
		.arg("--path")
		.arg(root)
		.assert()
		.code(2)
		.stderr(predicates::str::contains("protostar::mixed_arguments"));

	Ok(())
}

#[test]
fn compose_rejects_non_html_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "notes.txt", "hello");

	common::protostar_cmd()
		.arg("compose")
		.arg("notes.txt")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("should be an *.html file"));

	Ok(())
}

#[test]
fn compose_uses_config_named_paths() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	common::write(root, "protostar.toml", "[paths]\nps = \"vendor/ps\"\n");
	common::write(root, "vendor/ps/button.html", "<button>ok</button>");
	common::write(root, "index.html", "<!-- file:/ps/button -->");

	common::protostar_cmd()
		.arg("compose")
		.arg("index.html")
		.arg("--path")
		.arg(root)
		.assert()
		.success()
		.stdout("<button>ok</button>\n");

	Ok(())
}

#[test]
fn compose_arguments_parse() {
	let cli = ProtostarCli::parse_from([
		"protostar",
		"compose",
		"index.html",
		"--max-runs",
		"5",
		"--markers",
	]);
	match cli.command {
		Some(Commands::Compose {
			file,
			max_runs,
			markers,
			format,
		}) => {
			assert_eq!(file, std::path::PathBuf::from("index.html"));
			assert_eq!(max_runs, Some(5));
			assert!(markers);
			assert_eq!(format, OutputFormat::Text);
		}
		_ => panic!("expected Compose command"),
	}
}
