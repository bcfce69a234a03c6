//! Named prompt shortcuts.
//!
//! A quick action only produces prompt text for the input field; it never starts a turn
//! or touches session state.

use serde::Serialize;

use crate::settings::QuickActionSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickAction {
    pub name: String,
    pub label: String,
    pub prompt: String,
}

const BUILTIN: &[(&str, &str, &str)] = &[
    ("darker", "Darker", "Make it darker and moodier"),
    ("faster", "Faster", "Increase the tempo"),
    ("slower", "Slower", "Decrease the tempo"),
    ("drums", "Add drums", "Add a drum pattern that fits the groove"),
    ("bass", "Add bass", "Add a bassline that follows the harmony"),
    ("simplify", "Simplify", "Simplify the pattern, keep only the essential parts"),
    ("variation", "Variation", "Create a variation of the current pattern"),
];

/// Built-in actions with user-defined ones merged over them by name.
#[derive(Debug, Clone)]
pub struct QuickActions {
    actions: Vec<QuickAction>,
}

impl QuickActions {
    pub fn builtin() -> Self {
        Self {
            actions: BUILTIN
                .iter()
                .map(|(name, label, prompt)| QuickAction {
                    name: name.to_string(),
                    label: label.to_string(),
                    prompt: prompt.to_string(),
                })
                .collect(),
        }
    }

    pub fn from_settings(custom: &[QuickActionSettings]) -> Self {
        let mut actions = Self::builtin();
        for entry in custom {
            let name = entry.name.trim().to_lowercase();
            if name.is_empty() || entry.prompt.trim().is_empty() {
                tracing::warn!("Ignoring quick action with empty name or prompt");
                continue;
            }
            let action = QuickAction {
                label: entry.label.clone().unwrap_or_else(|| entry.name.clone()),
                prompt: entry.prompt.clone(),
                name,
            };
            match actions.actions.iter_mut().find(|a| a.name == action.name) {
                Some(existing) => *existing = action,
                None => actions.actions.push(action),
            }
        }
        actions
    }

    pub fn all(&self) -> &[QuickAction] {
        &self.actions
    }

    pub fn get(&self, name: &str) -> Option<&QuickAction> {
        let name = name.trim().to_lowercase();
        self.actions.iter().find(|a| a.name == name)
    }

    /// Prompt text for `name`, replacing whatever was in the input field.
    pub fn substitute(&self, name: &str) -> Option<String> {
        self.get(name).map(|a| a.prompt.clone())
    }
}

impl Default for QuickActions {
    fn default() -> Self {
        Self::builtin()
    }
}
