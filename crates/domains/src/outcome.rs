//! # Outcome
//!
//! A successful result plus the non-critical side effects that failed along
//! the way. Primary operations never fail because one of these did.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Reputation,
    Notification,
    ActivityLog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectWarning {
    pub effect: Effect,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<EffectWarning>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, effect: Effect, message: impl Into<String>) {
        self.warnings.push(EffectWarning {
            effect,
            message: message.into(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}
