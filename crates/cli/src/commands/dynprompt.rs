//! `chatforge dynprompt`: dynamic prompt sets.

use super::Workspace;
use chatforge_pipeline::modifiers::{DynPromptLibrary, DynPromptSet};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Many(Vec<DynPromptSet>),
    One(DynPromptSet),
}

impl ImportFile {
    fn into_sets(self) -> Vec<DynPromptSet> {
        match self {
            ImportFile::Many(sets) => sets,
            ImportFile::One(set) => vec![set],
        }
    }
}

pub async fn list(ws: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    let sets = DynPromptLibrary::new(ws.kv.clone()).list().await?;
    if sets.is_empty() {
        println!("   No dynamic prompt sets. Import one with `chatforge dynprompt import <file>`");
        return Ok(());
    }
    for set in &sets {
        println!("📚 {} ({} terms)", set.name, set.terms.len());
        for term in &set.terms {
            let rule = if term.trigger_rule.trim().is_empty() {
                "always"
            } else {
                term.trigger_rule.as_str()
            };
            println!(
                "     {:<20} {:?} depth={} rule: {rule}",
                term.name, term.injection_mode, term.injection_depth
            );
        }
    }
    Ok(())
}

/// Upsert every set in `json`. Returns the imported names.
pub async fn import_json(ws: &Workspace, json: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let sets = serde_json::from_str::<ImportFile>(json)?.into_sets();
    let library = DynPromptLibrary::new(ws.kv.clone());
    let mut names = Vec::with_capacity(sets.len());
    for set in sets {
        names.push(set.name.clone());
        library.upsert(set).await?;
    }
    Ok(names)
}

pub async fn import(ws: &Workspace, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(file).map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let names = import_json(ws, &json).await?;
    println!("📥 Imported {} set(s): {}", names.len(), names.join(", "));
    Ok(())
}
