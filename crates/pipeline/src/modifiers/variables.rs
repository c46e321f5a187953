//! `VariableInject`: expose stored variables to the model as a system block.

use crate::modifier::{ContextModifier, ModifierInfo};
use crate::ModifierError;
use async_trait::async_trait;
use chatforge_core::{Agent, Chat, Message, PromptBuffer};
use chatforge_store::{Variable, VariableScope, VariableStore};

pub struct VariableInject {
    store: VariableStore,
}

impl VariableInject {
    pub fn new(store: VariableStore) -> Self {
        Self { store }
    }
}

/// Which variables an input selects.
#[derive(Debug, PartialEq, Eq)]
enum Selector<'a> {
    All,
    Scoped(VariableScope, &'a str),
    Name(&'a str),
}

impl<'a> Selector<'a> {
    fn parse(input: &'a str) -> Self {
        let input = input.trim();
        if input.is_empty() || input.eq_ignore_ascii_case("all") {
            return Selector::All;
        }
        match input.split_once(':') {
            Some((scope, pattern)) => match scope.parse::<VariableScope>() {
                Ok(scope) => Selector::Scoped(scope, pattern),
                Err(_) => Selector::Name(pattern),
            },
            None => Selector::Name(input),
        }
    }

    fn matches(&self, variable: &Variable) -> bool {
        match self {
            Selector::All => true,
            Selector::Scoped(scope, pattern) => variable.scope == *scope && name_contains(&variable.name, pattern),
            Selector::Name(pattern) => name_contains(&variable.name, pattern),
        }
    }
}

fn name_contains(name: &str, pattern: &str) -> bool {
    name.to_lowercase().contains(&pattern.to_lowercase())
}

fn describe(variable: &Variable) -> String {
    format!(
        "[{}] Variable: {} ({}) = {}",
        variable.scope,
        variable.name,
        variable.value.type_name().to_lowercase(),
        variable.value
    )
}

#[async_trait]
impl ContextModifier for VariableInject {
    fn info(&self) -> ModifierInfo {
        ModifierInfo {
            name: "VariableInject",
            description: "Injects variables into the prompt. Input 'all', 'agent:<name>', 'chat:<name>' or a name fragment.",
        }
    }

    async fn apply(
        &self,
        buffer: &mut PromptBuffer,
        input: &str,
        chat: &Chat,
        agent: &Agent,
    ) -> Result<(), ModifierError> {
        let selector = Selector::parse(input);
        let variables = self.store.aggregated(&chat.id.0, &agent.id).await?;
        let lines: Vec<String> = variables
            .iter()
            .filter(|v| selector.matches(v))
            .map(describe)
            .collect();
        if lines.is_empty() {
            return Ok(());
        }
        buffer
            .messages
            .push(Message::system(format!("System Variables:\n{{\n{}\n}}", lines.join("\n"))));
        Ok(())
    }
}
