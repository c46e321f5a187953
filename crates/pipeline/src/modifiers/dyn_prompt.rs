//! `DynPrompt`: rule-triggered prompt injection.
//!
//! A named [`DynPromptSet`] holds terms; each term has content, a trigger
//! rule and an injection mode. When the modifier runs, every term whose rule
//! matches the current context text is injected into the buffer.
//!
//! A rule that fails to parse or compile never aborts the pipeline: it is
//! logged and the term simply does not trigger.

use crate::modifier::{ContextModifier, ModifierInfo};
use crate::ModifierError;
use async_trait::async_trait;
use chatforge_core::error::StoreError;
use chatforge_core::kv::{read_json, read_json_strict, write_json};
use chatforge_core::{Agent, Chat, KvStore, Message, PromptBuffer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DYN_PROMPT_SPACE: &str = "DynPrompt";
pub const SETS_KEY: &str = "DynPromptSets";

/// Where a triggered term's content goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ModeRepr")]
pub enum InjectionMode {
    /// Inserted as a new system message at a message index.
    AtDepth,
    /// Prepended to the first system message, or to the system text.
    #[default]
    BeforeSystem,
    /// Appended to the first system message, or to the system text.
    AfterSystem,
}

/// Persisted modes may be names or their ordinal.
#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRepr {
    Ordinal(i64),
    Name(String),
}

impl TryFrom<ModeRepr> for InjectionMode {
    type Error = String;

    fn try_from(repr: ModeRepr) -> Result<Self, Self::Error> {
        match repr {
            ModeRepr::Ordinal(0) => Ok(InjectionMode::AtDepth),
            ModeRepr::Ordinal(1) => Ok(InjectionMode::BeforeSystem),
            ModeRepr::Ordinal(2) => Ok(InjectionMode::AfterSystem),
            ModeRepr::Ordinal(n) => Err(format!("unknown injection mode ordinal {n}")),
            ModeRepr::Name(name) => match name.to_ascii_lowercase().as_str() {
                "atdepth" | "at_depth" => Ok(InjectionMode::AtDepth),
                "beforesystem" | "before_system" => Ok(InjectionMode::BeforeSystem),
                "aftersystem" | "after_system" => Ok(InjectionMode::AfterSystem),
                _ => Err(format!("unknown injection mode {name:?}")),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynPromptTerm {
    #[serde(alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Content")]
    pub content: String,

    #[serde(default, alias = "InjectionMode")]
    pub injection_mode: InjectionMode,

    /// Message index for [`InjectionMode::AtDepth`]; negative counts from the end.
    #[serde(default = "default_depth", alias = "InjectionDepth")]
    pub injection_depth: i64,

    /// Empty means always.
    #[serde(default, alias = "TriggerRule")]
    pub trigger_rule: String,
}

fn default_depth() -> i64 {
    4
}

impl DynPromptTerm {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            injection_mode: InjectionMode::default(),
            injection_depth: default_depth(),
            trigger_rule: String::new(),
        }
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.trigger_rule = rule.into();
        self
    }

    pub fn at_depth(mut self, depth: i64) -> Self {
        self.injection_mode = InjectionMode::AtDepth;
        self.injection_depth = depth;
        self
    }

    pub fn with_mode(mut self, mode: InjectionMode) -> Self {
        self.injection_mode = mode;
        self
    }

    /// Whether the trigger rule matches `context`. Rule errors count as no match.
    pub fn triggers(&self, context: &str) -> bool {
        if self.trigger_rule.trim().is_empty() {
            return true;
        }
        match chatforge_rules::evaluate(&self.trigger_rule, context) {
            Ok(matched) => matched,
            Err(e) => {
                warn!(
                    term = %self.name,
                    rule = %self.trigger_rule,
                    pattern_error = e.is_pattern_error(),
                    error = %e,
                    "Trigger rule failed, term not injected"
                );
                false
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynPromptSet {
    #[serde(alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Terms")]
    pub terms: Vec<DynPromptTerm>,
}

impl DynPromptSet {
    pub fn new(name: impl Into<String>, terms: Vec<DynPromptTerm>) -> Self {
        Self {
            name: name.into(),
            terms,
        }
    }
}

/// Persisted DynPrompt sets.
#[derive(Clone)]
pub struct DynPromptLibrary {
    kv: Arc<dyn KvStore>,
}

impl DynPromptLibrary {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn list(&self) -> Result<Vec<DynPromptSet>, StoreError> {
        Ok(read_json(self.kv.as_ref(), DYN_PROMPT_SPACE, SETS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Like [`list`](Self::list), but corrupt data is an error.
    async fn list_for_update(&self) -> Result<Vec<DynPromptSet>, StoreError> {
        Ok(read_json_strict(self.kv.as_ref(), DYN_PROMPT_SPACE, SETS_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_all(&self, sets: &[DynPromptSet]) -> Result<(), StoreError> {
        write_json(self.kv.as_ref(), DYN_PROMPT_SPACE, SETS_KEY, &sets).await
    }

    /// The set named `name`. With duplicates, the last one wins.
    pub async fn get(&self, name: &str) -> Result<Option<DynPromptSet>, StoreError> {
        Ok(self.list().await?.into_iter().rev().find(|s| s.name == name))
    }

    /// Replace the set with the same name, or append it.
    pub async fn upsert(&self, set: DynPromptSet) -> Result<(), StoreError> {
        let mut sets = self.list_for_update().await?;
        match sets.iter().rposition(|s| s.name == set.name) {
            Some(i) => sets[i] = set,
            None => sets.push(set),
        }
        self.save_all(&sets).await
    }

    /// Remove every set named `name`. Returns whether any was removed.
    pub async fn remove(&self, name: &str) -> Result<bool, StoreError> {
        let mut sets = self.list_for_update().await?;
        let before = sets.len();
        sets.retain(|s| s.name != name);
        if sets.len() == before {
            return Ok(false);
        }
        self.save_all(&sets).await?;
        Ok(true)
    }
}

/// Index an `AtDepth` term lands at in a list of `len` messages.
pub fn depth_index(depth: i64, len: usize) -> usize {
    if depth < 0 {
        let from_end = i64::try_from(len).unwrap_or(i64::MAX).saturating_add(1).saturating_add(depth);
        usize::try_from(from_end.max(0)).unwrap_or(0)
    } else {
        usize::try_from(depth).unwrap_or(usize::MAX)
    }
}

/// Place `content` into `buffer` according to `mode`.
pub fn inject(buffer: &mut PromptBuffer, content: &str, mode: InjectionMode, depth: i64) {
    match mode {
        InjectionMode::BeforeSystem => match buffer.first_system_index() {
            Some(i) => {
                let message = &mut buffer.messages[i];
                message.content = format!("{content}\n{}", message.content);
            }
            None => {
                buffer.system_text = Some(match buffer.system_text.take().filter(|s| !s.is_empty()) {
                    Some(old) => format!("{content}\n{old}"),
                    None => content.to_string(),
                });
            }
        },
        InjectionMode::AfterSystem => match buffer.first_system_index() {
            Some(i) => {
                let message = &mut buffer.messages[i];
                message.content.push('\n');
                message.content.push_str(content);
            }
            None => {
                buffer.system_text = Some(match buffer.system_text.take().filter(|s| !s.is_empty()) {
                    Some(old) => format!("{old}\n{content}"),
                    None => content.to_string(),
                });
            }
        },
        InjectionMode::AtDepth => {
            let idx = depth_index(depth, buffer.messages.len());
            let message = Message::system(content);
            if idx >= buffer.messages.len() {
                buffer.messages.push(message);
            } else {
                buffer.messages.insert(idx, message);
            }
        }
    }
}

pub struct DynPrompt {
    library: DynPromptLibrary,
}

impl DynPrompt {
    pub fn new(library: DynPromptLibrary) -> Self {
        Self { library }
    }
}

#[async_trait]
impl ContextModifier for DynPrompt {
    fn info(&self) -> ModifierInfo {
        ModifierInfo {
            name: "DynPrompt",
            description: "Inject prompt dynamically based on rules, input the set name.",
        }
    }

    async fn apply(
        &self,
        buffer: &mut PromptBuffer,
        input: &str,
        _chat: &Chat,
        _agent: &Agent,
    ) -> Result<(), ModifierError> {
        let set = self
            .library
            .get(input)
            .await?
            .ok_or_else(|| ModifierError::NotFound(format!("no DynPrompt set named '{input}'")))?;

        for term in &set.terms {
            // Earlier injections are visible to later rules
            if term.triggers(&buffer.context_text()) {
                inject(buffer, &term.content, term.injection_mode, term.injection_depth);
                debug!(set = %set.name, term = %term.name, mode = ?term.injection_mode, "Term injected");
            }
        }
        Ok(())
    }
}
