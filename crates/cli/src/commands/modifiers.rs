//! `chatforge modifiers`: edit the activated modifier pipeline.

use super::Workspace;
use chatforge_pipeline::PipelineError;

pub async fn list(ws: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = ws.pipeline()?;
    let entries = pipeline.activated().await?;

    println!("Context modifiers ({} activated)", entries.len());
    println!("=================");
    if entries.is_empty() {
        println!("   (none) Add one with `chatforge modifiers activate <name> [input]`");
        return Ok(());
    }
    for (i, entry) in entries.iter().enumerate() {
        let mark = if entry.enabled { "on " } else { "off" };
        let note = if pipeline.registry().get(&entry.name).is_none() {
            "  (not registered, skipped)"
        } else {
            ""
        };
        println!("  {i:>2}. [{mark}] {:<16} {:?}{note}", entry.name, entry.input);
    }
    Ok(())
}

pub fn available(ws: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = ws.pipeline()?;
    println!("Available modifiers");
    println!("===================");
    for info in pipeline.registry().infos() {
        println!("  {:<16} {}", info.name, info.description);
    }
    Ok(())
}

pub async fn activate(ws: &Workspace, name: &str, input: &str) -> Result<(), Box<dyn std::error::Error>> {
    ws.pipeline()?.activate(name, input).await?;
    println!("✅ Activated {name}");
    Ok(())
}

pub async fn remove(ws: &Workspace, index: usize) -> Result<(), Box<dyn std::error::Error>> {
    let removed = ws.pipeline()?.remove(index).await?;
    println!("🗑️  Removed {} {:?}", removed.name, removed.input);
    Ok(())
}

pub async fn move_entry(ws: &Workspace, from: usize, to: usize) -> Result<(), Box<dyn std::error::Error>> {
    ws.pipeline()?.move_entry(from, to).await?;
    println!("✅ Moved entry {from} to {to}");
    Ok(())
}

pub async fn toggle(ws: &Workspace, index: usize) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = ws.pipeline()?;
    let entries = pipeline.activated().await?;
    let entry = entries.get(index).ok_or(PipelineError::IndexOutOfRange {
        index,
        len: entries.len(),
    })?;
    let enabled = !entry.enabled;
    pipeline.set_enabled(index, enabled).await?;
    println!("✅ {} is now {}", entry.name, if enabled { "enabled" } else { "disabled" });
    Ok(())
}

pub async fn clear(ws: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    ws.pipeline()?.clear().await?;
    println!("✅ Pipeline cleared");
    Ok(())
}
