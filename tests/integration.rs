use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn dojo_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dojo"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(files_dir.join("nested")).unwrap();
    fs::write(
        files_dir.join("defesas.md"),
        "# Defesas\n\nDefesa contra estrangulamento frontal: puxar as mãos do agressor. \
         Em seguida aplicar joelhada frontal.",
    )
    .unwrap();
    fs::write(
        files_dir.join("nested").join("ataques.txt"),
        "Soco direto (jab) com a mão da frente. Soco cruzado com rotação do quadril.",
    )
    .unwrap();
    fs::write(files_dir.join("planilha.csv"), "nome,valor\nMensal,150").unwrap();
    fs::write(files_dir.join(".rascunho.txt"), "não deve ser ingerido").unwrap();

    let config_content = format!(
        r#"[storage]
path = "{}/data/dojo.sqlite"

[chunking]
max_chars = 500

[gateway]
enabled = false
"#,
        root.display()
    );

    let config_path = config_dir.join("dojo.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_dojo(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = dojo_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run dojo binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn files_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .and_then(Path::parent)
        .unwrap()
        .join("files")
}

/// The first document id printed by `dojo list`.
fn first_document_id(config_path: &Path) -> String {
    let (stdout, _, success) = run_dojo(config_path, &["list"]);
    assert!(success);
    stdout
        .lines()
        .nth(1)
        .and_then(|line| line.split_whitespace().next())
        .unwrap()
        .to_string()
}

#[test]
fn test_ingest_directory_and_list() {
    let (_tmp, config) = setup_test_env();
    let files = files_dir(&config);

    let (stdout, stderr, success) = run_dojo(&config, &["ingest", files.to_str().unwrap()]);
    assert!(success, "ingest failed: {}", stderr);
    assert!(stdout.contains("Ingest complete: 2 ingested, 0 failed"), "{}", stdout);

    let (stdout, _, success) = run_dojo(&config, &["list"]);
    assert!(success);
    assert!(stdout.contains("defesas"));
    assert!(stdout.contains("ataques"));
    assert!(!stdout.contains("planilha"));
    assert!(!stdout.contains("rascunho"));
}

#[test]
fn test_search_finds_ingested_content() {
    let (_tmp, config) = setup_test_env();
    let files = files_dir(&config);
    run_dojo(&config, &["ingest", files.to_str().unwrap()]);

    let (stdout, _, success) = run_dojo(&config, &["search", "estrangulamento"]);
    assert!(success);
    assert!(stdout.contains("1. [1] defesas.md"), "{}", stdout);

    let (stdout, _, success) = run_dojo(&config, &["search", "inexistente"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_limit_defaults() {
    let (_tmp, config) = setup_test_env();
    let files = files_dir(&config);
    let kiai = files.join("kiai");
    fs::create_dir_all(&kiai).unwrap();
    for i in 0..12 {
        let name = format!("aula{:02}.txt", i);
        fs::write(kiai.join(name), format!("Kiai na aula {}.", i)).unwrap();
    }
    run_dojo(&config, &["ingest", kiai.to_str().unwrap()]);

    let (stdout, _, success) = run_dojo(&config, &["search", "kiai"]);
    assert!(success);
    assert!(stdout.contains("12. [1]"), "{}", stdout);
    assert!(!stdout.contains("matches shown"), "{}", stdout);

    let (stdout, _, success) = run_dojo(&config, &["search", "kiai", "--limit", "3"]);
    assert!(success);
    assert!(stdout.contains("(3 of 12 matches shown)"), "{}", stdout);

    let (stdout, _, success) = run_dojo(&config, &["search", "--technique", "kiai"]);
    assert!(success);
    assert!(stdout.contains("10. ["), "{}", stdout);
    assert!(!stdout.contains("11. ["), "{}", stdout);
    assert!(stdout.contains("12 matching chunks"), "{}", stdout);
}

#[test]
fn test_technique_search() {
    let (_tmp, config) = setup_test_env();
    let files = files_dir(&config);
    run_dojo(&config, &["ingest", files.to_str().unwrap()]);

    let (stdout, _, success) = run_dojo(&config, &["search", "--technique", "soco cruzado"]);
    assert!(success);
    let first = stdout.lines().next().unwrap();
    assert!(first.starts_with("1. ["), "{}", stdout);
    assert!(first.contains("high] ataques"), "{}", stdout);
    assert!(stdout.contains("exact_phrase"), "{}", stdout);
}

#[test]
fn test_ask_without_gateway_answers_from_documents() {
    let (_tmp, config) = setup_test_env();
    let files = files_dir(&config);
    run_dojo(&config, &["ingest", files.to_str().unwrap()]);

    let (stdout, _, success) = run_dojo(&config, &["ask", "estrangulamento", "--json"]);
    assert!(success);
    let response: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["sources"]["documents"], 1);
    assert_eq!(response["sources"]["apis"], 0);
}

#[test]
fn test_get_and_remove() {
    let (_tmp, config) = setup_test_env();
    let files = files_dir(&config);
    run_dojo(&config, &["ingest", files.join("defesas.md").to_str().unwrap()]);

    let id = first_document_id(&config);
    let (stdout, _, success) = run_dojo(&config, &["get", &id]);
    assert!(success);
    assert!(stdout.contains(&format!("[{}_0]", id)), "{}", stdout);
    assert!(stdout.contains("type:          text (text/markdown)"));

    let (stdout, _, success) = run_dojo(&config, &["remove", &id]);
    assert!(success);
    assert!(stdout.contains("Removed"));

    let (_, stderr, success) = run_dojo(&config, &["remove", &id]);
    assert!(!success);
    assert!(stderr.contains("Document not found"));

    let (stdout, _, _) = run_dojo(&config, &["list"]);
    assert!(stdout.contains("Knowledge base is empty."));
}

#[test]
fn test_clear_requires_confirmation() {
    let (_tmp, config) = setup_test_env();
    let files = files_dir(&config);
    run_dojo(&config, &["ingest", files.to_str().unwrap()]);

    let (_, stderr, success) = run_dojo(&config, &["clear"]);
    assert!(!success);
    assert!(stderr.contains("--yes"));

    let (_, _, success) = run_dojo(&config, &["clear", "--yes"]);
    assert!(success);

    let (stdout, _, _) = run_dojo(&config, &["stats"]);
    assert!(stdout.contains("Documents:   0"), "{}", stdout);
    assert!(stdout.contains("Chunks:      0"), "{}", stdout);
}

#[test]
fn test_stats_and_reindex() {
    let (_tmp, config) = setup_test_env();
    let files = files_dir(&config);
    run_dojo(&config, &["ingest", files.to_str().unwrap()]);

    let (stdout, _, success) = run_dojo(&config, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Documents:   2"), "{}", stdout);

    let (stdout, _, success) = run_dojo(&config, &["reindex"]);
    assert!(success);
    assert!(stdout.contains("Reindexed: 2 chunks."), "{}", stdout);
}

#[test]
fn test_health_with_gateway_disabled() {
    let (_tmp, config) = setup_test_env();
    let (stdout, _, success) = run_dojo(&config, &["health"]);
    assert!(success);
    assert!(stdout.contains("disabled"));
}

#[test]
fn test_missing_file_fails_ingest() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) = run_dojo(&config, &["ingest", "/nonexistent/aula.txt"]);
    assert!(!success);
    assert!(stderr.contains("1 file(s) failed to ingest"), "{}", stderr);
}
