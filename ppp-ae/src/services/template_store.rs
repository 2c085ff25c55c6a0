//! Template lookup
//!
//! Requests carry a template id; stores hand back validated templates so no
//! pipeline stage ever sees one that breaks the anchor or ordering rules.

use crate::error::{Error, Result};
use crate::model::Template;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Source of templates by id
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Load and validate template `id`
    ///
    /// An unknown id is a [`Error::Validation`].
    async fn load(&self, id: Uuid) -> Result<Template>;
}

/// Templates held in memory
#[derive(Default)]
pub struct InMemoryTemplateStore {
    templates: RwLock<HashMap<Uuid, Template>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store `template`, replacing any with the same id
    pub async fn insert(&self, template: Template) -> Result<()> {
        template.validate()?;
        self.templates.write().await.insert(template.id, template);
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn load(&self, id: Uuid) -> Result<Template> {
        self.templates
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::Validation(format!("Template {} not found", id)))
    }
}

/// Directory of `<template_id>.json` files in the editor's JSON format
pub struct JsonDirTemplateStore {
    dir: PathBuf,
}

impl JsonDirTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TemplateStore for JsonDirTemplateStore {
    async fn load(&self, id: Uuid) -> Result<Template> {
        let path = self.dir.join(format!("{}.json", id));

        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Validation(format!("Template {} not found", id)));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let template = Template::from_json(&json)?;
        if template.id != id {
            return Err(Error::Validation(format!(
                "Template file {} declares id {}",
                path.display(),
                template.id
            )));
        }

        tracing::debug!(template_id = %id, name = %template.name, "Template loaded");
        Ok(template)
    }
}
