//! End-to-end build tests: library API and the `blogsmith` binary.
//!
//! Each test builds a throwaway project under a temp directory, so nothing
//! here depends on the checked-in fixtures.

use blogsmith::emit::TAG_DATA_PATH;
use blogsmith::site::{self, BuildError, BuildMode, BuildOptions};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn post(title: &str, date: &str, tags: &[&str]) -> String {
    format!(
        concat!(
            "---\ntitle: {title}\ndate: {date}\ntags: [{tags}]\n---\n\n",
            "## Overview\n\nSome words about {title}.\n",
        ),
        title = title,
        date = date,
        tags = tags.join(", ")
    )
}

/// Three posts dated D1 < D2 < D3, written in an order unrelated to their dates.
fn three_post_site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "data/blog/second.md", &post("Second", "2024-02-01", &["a", "b"]));
    write(root, "data/blog/first.md", &post("First", "2024-01-01", &["a"]));
    write(root, "data/blog/third.mdx", &post("Third", "2024-03-01", &["b"]));
    write(
        root,
        "data/authors/default.md",
        "---\nname: Jane Doe\noccupation: Writer\n---\nHello.\n",
    );
    tmp
}

fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap()
}

fn blogsmith(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_blogsmith"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env_remove("BLOGSMITH_PRODUCTION")
        .env_remove("BASE_PATH")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run blogsmith")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

#[test]
fn build_writes_tag_counts_and_newest_first_search_index() {
    let tmp = three_post_site();
    let report = site::build(tmp.path(), &BuildOptions::default()).unwrap();
    assert_eq!(report.registry.posts().len(), 3);
    assert_eq!(report.registry.authors().len(), 1);

    let tags = read_json(&tmp.path().join(TAG_DATA_PATH));
    assert_eq!(tags, serde_json::json!({ "a": 2, "b": 2 }));

    let search = read_json(&tmp.path().join("public/search.json"));
    let entries = search.as_array().unwrap();
    let titles: Vec<&str> = entries
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Third", "Second", "First"]);

    for entry in entries {
        assert!(entry.get("body").is_none(), "core content carries no body");
        assert_eq!(entry["type"], "post");
    }
    assert_eq!(entries[0]["slug"], "third");
    assert_eq!(entries[0]["path"], "blog/third");
    assert_eq!(entries[0]["filePath"], "blog/third.mdx");
    assert_eq!(entries[0]["readingTime"]["words"], 5);
    assert_eq!(entries[0]["toc"][0]["id"], "overview");
    assert_eq!(entries[0]["structuredData"]["@type"], "BlogPosting");
}

#[test]
fn missing_title_aborts_before_any_artifact() {
    let tmp = three_post_site();
    write(
        tmp.path(),
        "data/blog/untitled.md",
        "---\ndate: 2024-04-01\n---\nNo title here.\n",
    );

    let err = site::build(tmp.path(), &BuildOptions::default()).unwrap_err();
    assert!(matches!(err, BuildError::Registry(_)));
    let message = err.to_string();
    assert!(message.contains("title"), "error names the field: {message}");
    assert!(message.contains("untitled.md"), "error names the file: {message}");

    assert!(!tmp.path().join(TAG_DATA_PATH).exists());
    assert!(!tmp.path().join("public/search.json").exists());
}

#[test]
fn production_build_leaves_drafts_out_of_both_indices() {
    let tmp = three_post_site();
    write(
        tmp.path(),
        "data/blog/wip.md",
        "---\ntitle: WIP\ndate: 2024-05-01\ntags: [secret, a]\ndraft: true\n---\nSoon.\n",
    );
    let options = BuildOptions {
        mode: BuildMode::Production,
        ..BuildOptions::default()
    };
    site::build(tmp.path(), &options).unwrap();

    let tags = read_json(&tmp.path().join(TAG_DATA_PATH));
    assert_eq!(tags, serde_json::json!({ "a": 2, "b": 2 }));

    let search = read_json(&tmp.path().join("public/search.json"));
    assert_eq!(search.as_array().unwrap().len(), 3);
    assert_eq!(search[0]["title"], "Third");
}

#[test]
fn development_build_indexes_drafts() {
    let tmp = three_post_site();
    write(
        tmp.path(),
        "data/blog/wip.md",
        "---\ntitle: WIP\ndate: 2024-05-01\ntags: [secret]\ndraft: true\n---\nSoon.\n",
    );
    site::build(tmp.path(), &BuildOptions::default()).unwrap();

    let search = read_json(&tmp.path().join("public/search.json"));
    assert_eq!(search.as_array().unwrap().len(), 4);
    assert_eq!(search[0]["title"], "WIP");
}

#[test]
fn algolia_provider_writes_no_search_index() {
    let tmp = three_post_site();
    write(tmp.path(), "config.toml", "[search]\nprovider = \"algolia\"\n");

    let report = site::build(tmp.path(), &BuildOptions::default()).unwrap();
    assert_eq!(report.artifacts.len(), 1);
    assert!(tmp.path().join(TAG_DATA_PATH).is_file());
    assert!(!tmp.path().join("public/search.json").exists());
}

// ---------------------------------------------------------------------------
// Binary
// ---------------------------------------------------------------------------

#[test]
fn cli_build_reports_totals() {
    let tmp = three_post_site();
    let out = blogsmith(tmp.path(), &["build"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let text = stdout(&out);
    assert!(text.contains("Wrote app/tag-data.json"), "{text}");
    assert!(text.contains("Built 3 posts, 1 author, 2 tags"), "{text}");
    assert!(tmp.path().join("public/search.json").is_file());
}

#[test]
fn cli_check_writes_nothing() {
    let tmp = three_post_site();
    let out = blogsmith(tmp.path(), &["check"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let text = stdout(&out);
    assert!(text.contains("001 Third (2024-03-01, 1 min read)"), "{text}");
    assert!(text.contains("001 Jane Doe"), "{text}");
    assert!(text.contains("front-matter → gfm"), "{text}");
    assert!(!tmp.path().join(TAG_DATA_PATH).exists());
    assert!(!tmp.path().join("public").exists());
}

#[test]
fn cli_tags_lists_counts() {
    let tmp = three_post_site();
    let out = blogsmith(tmp.path(), &["tags"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "Tags\n    a: 2\n    b: 2\n");
}

#[test]
fn cli_base_path_prefixes_default_banner() {
    let tmp = three_post_site();
    write(tmp.path(), "config.toml", "site_url = \"https://blog.example\"\n");
    let out = blogsmith(tmp.path(), &["build", "--base-path", "/notes"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let search = read_json(&tmp.path().join("public/search.json"));
    let data = &search[0]["structuredData"];
    assert_eq!(data["url"], "https://blog.example/blog/third");
    let image = data["image"].as_str().unwrap();
    assert!(image.starts_with("/notes/"), "{image}");
}

#[test]
fn cli_gen_config_prints_stock_config() {
    let tmp = TempDir::new().unwrap();
    let out = blogsmith(tmp.path(), &["gen-config"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("[search]"));
    let parsed: toml::Value = toml::from_str(&text).unwrap();
    assert!(parsed.get("markdown").is_some());
}

#[test]
fn cli_build_fails_on_invalid_document() {
    let tmp = three_post_site();
    write(tmp.path(), "data/blog/broken.md", "---\ntitle: [unclosed\n---\n");
    let out = blogsmith(tmp.path(), &["build"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("broken.md"));
    assert!(!tmp.path().join(TAG_DATA_PATH).exists());
}
