mod common;

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use serde_json::Value as Json;

use common::{TestWorkspace, fixture_path};

fn railbase() -> Command {
    Command::cargo_bin("railbase").expect("binary exists")
}

fn read_store(path: &Path) -> Json {
    let raw = fs::read_to_string(path).expect("store file");
    serde_json::from_str(&raw).expect("store JSON")
}

fn record_count(store: &Json, entity: &str) -> usize {
    store["tables"][entity]["records"]
        .as_array()
        .map_or(0, |records| records.len())
}

fn import_countries(store: &Path) {
    railbase()
        .args([
            "import",
            "-s",
            store.to_str().unwrap(),
            "-e",
            "Country",
            fixture_path("countries.csv").to_str().unwrap(),
        ])
        .assert()
        .success();
}

#[test]
fn passthrough_import_is_idempotent() {
    let ws = TestWorkspace::new();
    let store_path = ws.path().join("store.json");

    import_countries(&store_path);
    let store = read_store(&store_path);
    // The '#obsolete' row is a comment; three data rows survive.
    assert_eq!(record_count(&store, "Country"), 3);
    let first_pass = fs::read_to_string(&store_path).expect("store file");

    railbase()
        .args([
            "import",
            "-s",
            store_path.to_str().unwrap(),
            "-e",
            "Country",
            fixture_path("countries.csv").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(contains("0 created, 3 ignored"));

    let second_pass = fs::read_to_string(&store_path).expect("store file");
    assert_eq!(first_pass, second_pass);
}

#[test]
fn mapping_file_drives_reference_resolution() {
    let ws = TestWorkspace::new();
    let store_path = ws.path().join("store.json");
    import_countries(&store_path);

    railbase()
        .args([
            "import",
            "-s",
            store_path.to_str().unwrap(),
            "-m",
            fixture_path("areas.ini").to_str().unwrap(),
            fixture_path("areas.csv").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(contains("create Area"));

    let store = read_store(&store_path);
    assert_eq!(record_count(&store, "Area"), 3);
    // Kanto points at Japan, the first country created.
    let kanto = &store["tables"]["Area"]["records"][0]["values"];
    assert_eq!(kanto["name"]["Text"], "Kanto");
    assert_eq!(kanto["country"]["Reference"], 1);
}

#[test]
fn missing_reference_aborts_but_keeps_prior_rows() {
    let ws = TestWorkspace::new();
    let store_path = ws.path().join("store.json");
    import_countries(&store_path);
    let areas = ws.write("areas.csv", "name,country\nKanto,JP\nAtlantis,ZZ\nKansai,JP\n");

    railbase()
        .args([
            "import",
            "-s",
            store_path.to_str().unwrap(),
            "-m",
            fixture_path("areas.ini").to_str().unwrap(),
            areas.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("no Country record with code2 = 'ZZ'"));

    // Row 2 was created before row 3 failed; its write stays committed.
    let store = read_store(&store_path);
    assert_eq!(record_count(&store, "Area"), 1);
}

#[test]
fn force_skips_bad_rows_and_continues() {
    let ws = TestWorkspace::new();
    let store_path = ws.path().join("store.json");
    import_countries(&store_path);
    let areas = ws.write("areas.csv", "name,country\nAtlantis,ZZ\nKansai,JP\n");

    railbase()
        .args([
            "import",
            "--force",
            "-s",
            store_path.to_str().unwrap(),
            "-m",
            fixture_path("areas.ini").to_str().unwrap(),
            areas.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(contains("row skipped").and(contains("create Area")));

    let store = read_store(&store_path);
    assert_eq!(record_count(&store, "Area"), 1);
}

#[test]
fn dry_run_reports_but_persists_nothing() {
    let ws = TestWorkspace::new();
    let store_path = ws.path().join("store.json");

    railbase()
        .args([
            "import",
            "--dry-run",
            "-s",
            store_path.to_str().unwrap(),
            "-e",
            "Country",
            fixture_path("countries.csv").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(contains("create Country"));

    assert!(!store_path.exists());
}

#[test]
fn import_requires_a_target() {
    let ws = TestWorkspace::new();
    let store_path = ws.path().join("store.json");

    railbase()
        .args([
            "import",
            "-s",
            store_path.to_str().unwrap(),
            fixture_path("countries.csv").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("either --mapping or --entity"));
}

#[test]
fn entity_flag_must_agree_with_the_mapping_section() {
    let ws = TestWorkspace::new();
    let store_path = ws.path().join("store.json");

    railbase()
        .args([
            "import",
            "-s",
            store_path.to_str().unwrap(),
            "-e",
            "Line",
            "-m",
            fixture_path("areas.ini").to_str().unwrap(),
            fixture_path("areas.csv").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("disagrees"));
}

#[test]
fn malformed_mapping_rules_are_fatal() {
    let ws = TestWorkspace::new();
    let store_path = ws.path().join("store.json");
    let mapping = ws.write("bad.ini", "[Area]\ncountry = field[country]=bogus(bar)\n");

    railbase()
        .args([
            "import",
            "-s",
            store_path.to_str().unwrap(),
            "-m",
            mapping.to_str().unwrap(),
            fixture_path("areas.csv").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("bogus"));
    assert!(!store_path.exists() || record_count(&read_store(&store_path), "Area") == 0);
}

#[test]
fn unknown_entity_is_reported() {
    let ws = TestWorkspace::new();
    let store_path = ws.path().join("store.json");

    railbase()
        .args([
            "import",
            "-s",
            store_path.to_str().unwrap(),
            "-e",
            "Tram",
            fixture_path("countries.csv").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("unknown entity type 'Tram'"));
}

#[test]
fn tsv_extension_switches_the_delimiter() {
    let ws = TestWorkspace::new();
    let store_path = ws.path().join("store.json");
    let tsv = ws.write(
        "countries.tsv",
        "code2\tcode3\tenglish_name\tlocal_name\nJP\tJPN\tJapan\t日本\n",
    );

    railbase()
        .args([
            "import",
            "-s",
            store_path.to_str().unwrap(),
            "-e",
            "Country",
            tsv.to_str().unwrap(),
        ])
        .assert()
        .success();

    let store = read_store(&store_path);
    assert_eq!(record_count(&store, "Country"), 1);
}
