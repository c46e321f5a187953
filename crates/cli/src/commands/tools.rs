//! `chatforge tools`: tools offered to the model.

use super::Workspace;

pub async fn list(ws: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    let service = ws.tools();
    println!("🔧 Tools");
    println!("========");
    for def in service.registry().definitions() {
        let mark = if service.is_enabled(&def.name).await? { "on " } else { "off" };
        println!("  [{mark}] {:<16} {}", def.name, def.description);
    }
    Ok(())
}

pub async fn enable(ws: &Workspace, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    if ws.tools().enable(name).await? {
        println!("✅ Enabled {name}");
    } else {
        println!("  {name} was already enabled");
    }
    Ok(())
}

pub async fn disable(ws: &Workspace, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    if ws.tools().disable(name).await? {
        println!("✅ Disabled {name}");
    } else {
        println!("  {name} was not enabled");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::in_memory_workspace;

    #[tokio::test]
    async fn enable_then_disable() {
        let ws = in_memory_workspace();
        enable(&ws, "VariableTool").await.unwrap();
        assert!(ws.tools().is_enabled("VariableTool").await.unwrap());
        disable(&ws, "VariableTool").await.unwrap();
        assert!(!ws.tools().is_enabled("VariableTool").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        assert!(enable(&in_memory_workspace(), "shell").await.is_err());
    }
}
