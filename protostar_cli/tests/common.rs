use std::path::Path;

use assert_cmd::Command;

pub fn protostar_cmd() -> Command {
	let mut cmd =
		Command::cargo_bin("protostar").unwrap_or_else(|e| panic!("protostar binary: {e}"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("PROTOSTAR_LOG");
	cmd
}

/// Write `contents` to `path` below `root`, creating parent directories.
pub fn write(root: &Path, path: &str, contents: &str) {
	let path = root.join(path);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("mkdir: {e}"));
	}
	std::fs::write(path, contents).unwrap_or_else(|e| panic!("write: {e}"));
}

/// A small project in `<tmp>/site` with a header partial, a layout and a
/// stylesheet for the index page.
pub fn sample_site(tmp: &Path) -> std::path::PathBuf {
	let root = tmp.join("site");
	write(&root, "_header.html", "<h1>Hi</h1>\n");
	write(&root, "_body.html", "<p>Body</p>");
	write(
		&root,
		"_base.html",
		"<title><!-- content:title --></title><main><!-- content:main --></main>",
	);
	write(
		&root,
		"index.html",
		"<!-- linkCss:default --><!-- file:/_header -->",
	);
	write(&root, "site.css", "body {}");
	write(
		&root,
		"pages/about.html",
		"<!-- layout:/_base(main=file:/_body;title='About') -->",
	);
	root
}
