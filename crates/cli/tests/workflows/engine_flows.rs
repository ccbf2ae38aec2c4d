//! Engine workflows that span restarts, batches and encodings

use crate::common::{ScriptedPrompter, TestWorkspace};
use anyhow::Result;
use cli_lib::config::SyncConfig;
use cli_lib::{Choice, Engine, Notice};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use watcher::{IgnoreList, PendingRemoval};

type Removals = UnboundedReceiver<Vec<PendingRemoval>>;

fn open(
    ws: &TestWorkspace,
    config: SyncConfig,
    prompter: Arc<ScriptedPrompter>,
) -> Result<(Engine, Removals)> {
    let ignore = IgnoreList::load(&ws.ignore_list_path())?;
    Engine::new(config, ignore, prompter)
}

#[tokio::test]
async fn test_ignore_choice_survives_restart() -> Result<()> {
    let ws = TestWorkspace::new();
    let file = ws.file("scratch.txt");

    let first = ScriptedPrompter::new(&[Choice::Suppress], &[]);
    let (engine, _removals) = open(&ws, SyncConfig::default(), first.clone())?;
    engine.add_file(&file, true).await?;
    engine.shutdown();
    drop(engine);

    let second = ScriptedPrompter::new(&[Choice::Confirm], &[]);
    let (engine, _removals) = open(&ws, SyncConfig::default(), second.clone())?;
    assert_eq!(engine.add_file(&file, true).await?, None);
    assert!(second.asked().is_empty());

    engine.clear_ignore_list()?;
    let (engine, _removals) = open(&ws, SyncConfig::default(), second.clone())?;
    assert_eq!(engine.add_file(&file, true).await?, Some(ws.manifest.clone()));
    assert_eq!(second.asked().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_deletion_burst_becomes_one_confirmation() -> Result<()> {
    let ws = TestWorkspace::new();
    let a = ws.file("a.txt");
    let b = ws.file("b.txt");
    let prompter = ScriptedPrompter::new(&[], &[true]);
    let config = SyncConfig {
        debounce_ms: 50,
        ..SyncConfig::default()
    };
    let (engine, mut removals) = open(&ws, config, prompter.clone())?;
    engine.add_file(&a, false).await?;
    engine.add_file(&b, false).await?;

    fs::remove_file(&a)?;
    fs::remove_file(&b)?;
    engine.file_deleted(&a, false).await?;
    engine.file_deleted(&b, false).await?;

    let batch = tokio::time::timeout(Duration::from_secs(5), removals.recv())
        .await?
        .expect("batch delivered");
    assert_eq!(batch.len(), 2);

    let outcome = engine.process_batch(batch).await;
    assert_eq!(outcome.removed, 2);
    assert_eq!(
        prompter.asked(),
        vec!["2 files were deleted. Remove them from their manifests?"]
    );
    assert_eq!(ws.manifest_text(), crate::common::MANIFEST);
    Ok(())
}

#[tokio::test]
async fn test_bom_and_crlf_survive_an_add() -> Result<()> {
    let original = "\u{feff}<Project>\r\n\t<ItemGroup>\r\n\t\t<None Include=\"sub/x.txt\" />\r\n\t</ItemGroup>\r\n</Project>\r\n";
    let ws = TestWorkspace::with_manifest(original);
    let file = ws.file("sub/y.txt");
    let (engine, _removals) = open(&ws, SyncConfig::default(), ScriptedPrompter::new(&[], &[]))?;

    engine.add_file(&file, false).await?;

    assert_eq!(
        fs::read(&ws.manifest)?,
        "\u{feff}<Project>\r\n\t<ItemGroup>\r\n\t\t<None Include=\"sub/x.txt\" />\r\n\t\t<Content Include=\"sub/y.txt\" />\r\n\t</ItemGroup>\r\n</Project>\r\n".as_bytes()
    );
    Ok(())
}

#[tokio::test]
async fn test_external_edit_between_commands() -> Result<()> {
    let ws = TestWorkspace::new();
    let file = ws.file("late.txt");
    let prompter = ScriptedPrompter::new(&[], &[]);
    let (engine, _removals) = open(&ws, SyncConfig::default(), prompter.clone())?;

    assert!(engine.cache().get(&ws.manifest).await.is_ok());
    fs::write(
        &ws.manifest,
        "<Project>\n  <ItemGroup>\n    <Content Include=\"late.txt\" />\n  </ItemGroup>\n</Project>\n",
    )?;
    engine.manifest_changed(&ws.manifest).await;

    assert_eq!(engine.add_file(&file, false).await?, None);
    assert!(prompter
        .notices()
        .iter()
        .any(|(n, m)| *n == Notice::Warning && m.contains("late.txt")));
    Ok(())
}
