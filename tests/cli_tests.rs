use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SAMPLE_OPML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="2.0">
  <head><title>Test Feeds</title></head>
  <body>
    <outline text="ai">
      <outline text="Machine Rounds" type="rss" xmlUrl="https://rounds.example/rss"/>
    </outline>
  </body>
</opml>"#;

/// A command isolated from the caller's environment and any `.env` file.
fn podfeed_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("podfeed").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("PODFEED_BACKEND_URL")
        .env_remove("PODFEED_BACKEND_KEY")
        .env_remove("PODFEED_FEEDS_OPML")
        .env_remove("PODFEED_ITEMS_PER_FEED")
        .env_remove("PODFEED_REFRESH_MINUTES")
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();

    podfeed_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("relay"))
        .stdout(predicate::str::contains("sync-session"));
}

#[test]
fn test_fetch_help_shows_flags() {
    let dir = TempDir::new().unwrap();

    podfeed_cmd(&dir)
        .arg("fetch")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--live-only"))
        .stdout(predicate::str::contains("--category"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_feeds_lists_builtin_catalog() {
    let dir = TempDir::new().unwrap();

    podfeed_cmd(&dir)
        .arg("feeds")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dental [dental]"))
        .stdout(predicate::str::contains("The Dental Hacks Podcast"))
        .stdout(predicate::str::contains("10 feeds"));
}

#[test]
fn test_feeds_reads_opml_from_config() {
    let dir = TempDir::new().unwrap();
    let opml_path = dir.path().join("feeds.opml");
    std::fs::write(&opml_path, SAMPLE_OPML).unwrap();

    podfeed_cmd(&dir)
        .arg("feeds")
        .env("PODFEED_FEEDS_OPML", opml_path.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("Machine Rounds"))
        .stdout(predicate::str::contains("1 feeds"))
        .stdout(predicate::str::contains("Dental").not());
}

#[test]
fn test_export_feeds_to_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("export.opml");

    podfeed_cmd(&dir)
        .arg("export-feeds")
        .arg("-o")
        .arg(out.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported feeds to"));

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains("<opml"));
    assert!(written.contains("https://dentalhacks.libsyn.com/rss"));
}

#[test]
fn test_fetch_unknown_category_fails() {
    let dir = TempDir::new().unwrap();

    podfeed_cmd(&dir)
        .arg("fetch")
        .arg("--category")
        .arg("cooking")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown category"));
}

#[test]
fn test_prerelease_requires_backend() {
    let dir = TempDir::new().unwrap();

    podfeed_cmd(&dir)
        .arg("prerelease")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PODFEED_BACKEND_URL"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();

    podfeed_cmd(&dir)
        .arg("feeds")
        .env("PODFEED_ITEMS_PER_FEED", "50")
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading configuration"));
}

#[test]
fn test_watch_survives_closed_stdin() {
    let dir = TempDir::new().unwrap();

    // The loop only ends when the process is killed at the timeout.
    podfeed_cmd(&dir)
        .env("PODFEED_SOURCE_TIMEOUT_SECS", "1")
        .arg("watch")
        .write_stdin("")
        .timeout(std::time::Duration::from_secs(3))
        .assert()
        .failure()
        .stdout(predicate::str::contains("Refreshing every 30 minutes"));
}
