//! Request payload rendering for agent invocations.
//!
//! The [`RequestRenderer`] trait is the seam between the dispatcher and the
//! prompt-content collaborator. The production renderer fills a minijinja
//! template with the work item and, as a cross-run learning channel, the
//! reasons recorded for previously dead-lettered items.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::types::WorkItem;
use crate::io::guardrail::GuardrailEntry;

const REVIEW_TEMPLATE: &str = include_str!("templates/review.md");

/// Most recent guardrail notes exposed to the template.
const GUARDRAIL_NOTE_LIMIT: usize = 20;

/// Renders a work item into the request payload fed to the worker.
pub trait RequestRenderer {
    fn render(&self, item: &WorkItem) -> Result<String>;
}

/// Template engine wrapper around minijinja.
pub struct TemplateRenderer {
    env: Environment<'static>,
    guardrail_notes: Vec<String>,
}

impl TemplateRenderer {
    pub fn new(guardrails: &[GuardrailEntry]) -> Self {
        let mut env = Environment::new();
        env.add_template("review", REVIEW_TEMPLATE)
            .expect("review template should be valid");
        let guardrail_notes = guardrails
            .iter()
            .rev()
            .take(GUARDRAIL_NOTE_LIMIT)
            .map(|entry| format!("{}: {}", entry.item, entry.reason))
            .collect();
        Self {
            env,
            guardrail_notes,
        }
    }
}

impl RequestRenderer for TemplateRenderer {
    fn render(&self, item: &WorkItem) -> Result<String> {
        let template = self.env.get_template("review").context("get review template")?;
        let rendered = template
            .render(context! {
                item => item.id,
                index => item.index,
                guardrail_notes => (!self.guardrail_notes.is_empty()).then_some(&self.guardrail_notes),
            })
            .with_context(|| format!("render request for {}", item.id))?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> WorkItem {
        WorkItem {
            id: id.to_string(),
            index: 4,
        }
    }

    #[test]
    fn renders_item_identity() {
        let renderer = TemplateRenderer::new(&[]);
        let payload = renderer.render(&item("tests/a.rs:12")).expect("render");
        assert!(payload.contains("tests/a.rs:12"));
        assert!(payload.contains("index 4"));
        assert!(!payload.contains("exhausted their retries"));
    }

    #[test]
    fn includes_guardrail_notes_when_present() {
        let guardrails = vec![GuardrailEntry::now("tests/b.rs", "flaky sleep-based wait")];
        let renderer = TemplateRenderer::new(&guardrails);
        let payload = renderer.render(&item("tests/a.rs")).expect("render");
        assert!(payload.contains("tests/b.rs: flaky sleep-based wait"));
    }
}
