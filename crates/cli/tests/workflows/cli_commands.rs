//! The csync binary against a temporary project

use crate::common::TestWorkspace;
use anyhow::Result;
use std::fs;

#[test]
fn test_add_status_remove_cycle() -> Result<()> {
    let ws = TestWorkspace::new();
    ws.file("src/Program.cs");

    let status = ws.csync(&["status", "src/Program.cs"]).assert_success()?;
    assert!(status.contains_stdout("Add to app.csproj"), "{}", status.stdout);

    let added = ws.csync(&["add", "src/Program.cs"]).assert_success()?;
    assert!(added.contains_stderr("Added src\\Program.cs"), "{}", added.stderr);
    assert!(ws
        .manifest_text()
        .contains("    <Content Include=\"src\\Program.cs\" />\n  </ItemGroup>"));

    let status = ws.csync(&["status", "src/Program.cs"]).assert_success()?;
    assert!(status.contains_stdout("Contained in app.csproj"));
    assert!(status.contains_stdout("Not running"));

    fs::remove_file(ws.root.join("src/Program.cs"))?;
    ws.csync(&["remove", "src/Program.cs", "--silent"])
        .assert_success()?;
    assert!(!ws.manifest_text().contains("Program.cs"));
    Ok(())
}

#[test]
fn test_explicit_add_of_tracked_file_warns() -> Result<()> {
    let ws = TestWorkspace::new();

    let result = ws.csync(&["add", "existing.txt"]).assert_success()?;
    assert!(result.contains_stderr("is already in app.csproj"), "{}", result.stderr);
    assert!(result.contains_stdout("No manifest changed"));
    Ok(())
}

#[test]
fn test_add_directory_writes_once() -> Result<()> {
    let ws = TestWorkspace::new();
    ws.file("assets/a.png");
    ws.file("assets/icons/b.png");

    ws.csync(&["add", "assets"]).assert_success()?;

    let text = ws.manifest_text();
    assert!(text.contains("<Content Include=\"assets\\a.png\" />"));
    assert!(text.contains("<Content Include=\"assets\\icons\\b.png\" />"));
    Ok(())
}

#[test]
fn test_prompted_add_answers() -> Result<()> {
    let ws = TestWorkspace::new();
    ws.file("maybe.txt");
    ws.file("never.txt");

    // Dismissed prompt (end of input) adds nothing
    ws.csync(&["add", "maybe.txt", "--prompt"]).assert_success()?;
    assert!(!ws.manifest_text().contains("maybe.txt"));

    ws.csync(&["add", "maybe.txt", "--prompt"])
        .stdin("y\n")
        .assert_success()?;
    assert!(ws.manifest_text().contains("maybe.txt"));

    ws.csync(&["add", "never.txt", "--prompt"])
        .stdin("i\n")
        .assert_success()?;
    assert!(!ws.manifest_text().contains("never.txt"));

    let listed = ws.csync(&["ignore", "list"]).assert_success()?;
    assert!(listed.contains_stdout("never.txt"));

    ws.csync(&["ignore", "clear"]).assert_success()?;
    let listed = ws.csync(&["ignore", "list"]).assert_success()?;
    assert!(listed.contains_stdout("No ignored paths"));
    Ok(())
}

#[test]
fn test_declined_removal_keeps_entry() -> Result<()> {
    let ws = TestWorkspace::new();

    ws.csync(&["remove", "existing.txt"])
        .stdin("n\n")
        .assert_success()?;
    assert!(ws.manifest_text().contains("existing.txt"));

    ws.csync(&["remove", "existing.txt", "--yes"]).assert_success()?;
    assert!(!ws.manifest_text().contains("existing.txt"));
    Ok(())
}

#[test]
fn test_malformed_manifest_fails_the_command() -> Result<()> {
    let ws = TestWorkspace::with_manifest("<Project><ItemGroup></Project>");
    ws.file("a.txt");

    let result = ws.csync(&["add", "a.txt"]).assert_failure()?;
    assert!(result.contains_stderr("failed to parse"), "{}", result.stderr);
    assert_eq!(
        fs::read_to_string(&ws.manifest)?,
        "<Project><ItemGroup></Project>"
    );
    Ok(())
}

#[test]
fn test_config_set_and_get() -> Result<()> {
    let ws = TestWorkspace::new();

    ws.csync(&["config", "set", "silent_deletion", "true"])
        .assert_success()?;
    let value = ws
        .csync(&["config", "get", "silent_deletion"])
        .assert_success()?;
    assert_eq!(value.stdout.trim(), "true");
    assert!(ws.config_path.exists());

    ws.csync(&["config", "set", "debounce_ms", "5"])
        .assert_failure()?;
    ws.csync(&["config", "get", "bogus"]).assert_failure()?;
    Ok(())
}

#[test]
fn test_disabled_config_skips_add() -> Result<()> {
    let ws = TestWorkspace::new();
    ws.file("a.txt");
    fs::write(&ws.config_path, "enabled = false\n")?;

    ws.csync(&["add", "a.txt"]).assert_success()?;
    assert!(!ws.manifest_text().contains("a.txt"));
    Ok(())
}
