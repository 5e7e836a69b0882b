//! Hub - owner of the registry and the sign save pipeline
//!
//! Every mutation goes through the hub. A save runs these steps in order,
//! under the registry write lock:
//!
//! 1. shortcut fields from the position and state
//! 2. uploaded artwork conversion (aborts the save on failure)
//! 3. review reset on a state change
//! 4. sort keys, search text and API payloads
//! 5. conflict rescan
//! 6. phase mandate update
//! 7. record write
//! 8. permission resync on a state change
//! 9. cache invalidation
//! 10. delayed artwork regeneration
//! 11. `SignSaved` dispatch

use crate::artwork::{ArtworkConverter, ImageConverter};
use crate::config::HubConfig;
use crate::jobs::{ArtworkJobs, Job, JobReport};
use crate::Result;
use chrono::Utc;
use indexmap::IndexMap;
use signage_core::conflict::{self, NumberingKey};
use signage_core::{
    export, label, number, permissions, sort, DomainEvent, Error as CoreError, EventBus,
    InMemoryGrants, PositionId, Registry, ReviewState, Sign, SignId, Subscriber, TagId,
    TemplateId, ZoneId,
};
use signage_render::cache::{label_key, message_html_key};
use signage_render::{ArtworkRenderer, RenderCache, RenderInput, RenderScope, RenderService};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Result of a sign save
#[derive(Debug)]
pub struct SaveReport {
    /// The sign as written
    pub sign: Sign,
    pub created: bool,
    /// Other signs whose conflict flags changed
    pub conflicts_touched: Vec<SignId>,
    /// Pending artwork regeneration
    pub artwork_job: JoinHandle<JobReport>,
}

/// Duplicate-number highlighting for the sign form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Highlights {
    pub sign_type: bool,
    pub location: bool,
    pub number: bool,
}

/// Central coordinator that owns the registry, grants and render state
pub struct Hub<S> {
    registry: Arc<RwLock<Registry>>,
    grants: Arc<RwLock<InMemoryGrants>>,
    cache: RenderCache,
    renderer: Arc<ArtworkRenderer<S>>,
    jobs: ArtworkJobs<S>,
    events: EventBus,
    converter: Box<dyn ArtworkConverter>,
}

impl<S: RenderService + 'static> Hub<S> {
    /// Hub over an empty registry
    pub fn new(service: S, config: &HubConfig) -> Result<Self> {
        Self::with_registry(service, config, Registry::new(), InMemoryGrants::new())
    }

    /// Hub over previously loaded records
    pub fn with_registry(
        service: S,
        config: &HubConfig,
        registry: Registry,
        grants: InMemoryGrants,
    ) -> Result<Self> {
        let registry = Arc::new(RwLock::new(registry));
        let cache = RenderCache::from_config(&config.render)?;
        let renderer = Arc::new(ArtworkRenderer::new(service, &config.render)?);
        let jobs = ArtworkJobs::new(
            Arc::clone(&registry),
            Arc::clone(&renderer),
            cache.clone(),
            config.settle_delay(),
        );
        Ok(Self {
            registry,
            grants: Arc::new(RwLock::new(grants)),
            cache,
            renderer,
            jobs,
            events: EventBus::with_defaults(),
            converter: Box::new(ImageConverter),
        })
    }

    /// Replace the uploaded artwork converter
    pub fn set_converter(&mut self, converter: impl ArtworkConverter + 'static) {
        self.converter = Box::new(converter);
    }

    /// Register an additional event subscriber
    pub fn subscribe(&mut self, subscriber: impl Subscriber + 'static) {
        self.events.subscribe(subscriber);
    }

    pub fn registry(&self) -> Arc<RwLock<Registry>> {
        Arc::clone(&self.registry)
    }

    pub fn grants(&self) -> Arc<RwLock<InMemoryGrants>> {
        Arc::clone(&self.grants)
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    pub fn renderer(&self) -> &ArtworkRenderer<S> {
        &self.renderer
    }

    pub fn jobs(&self) -> &ArtworkJobs<S> {
        &self.jobs
    }

    /// Unsaved sign at `position` with a fresh id
    pub async fn create_sign(&self, position: PositionId) -> Result<Sign> {
        let mut registry = self.registry.write().await;
        registry.require_position(position)?;
        Ok(registry.new_sign(position))
    }

    /// Run the save pipeline and write the sign
    pub async fn save_sign(&self, mut sign: Sign) -> Result<SaveReport> {
        let mut registry = self.registry.write().await;
        let previous = registry.sign(sign.id).cloned();
        let created = previous.is_none();
        let previous_state = previous.as_ref().and_then(|p| p.state);

        // 1. shortcut fields
        let position = registry.require_position(sign.position)?;
        sign.zone = Some(position.zone);
        sign.project = position.project;
        if let Some(state) = sign.state {
            let state = registry.require_state(state)?;
            sign.phase = Some(state.phase);
            sign.workflow = Some(state.workflow);
        }

        // 2. uploaded artwork
        let content_changed = previous.as_ref().is_some_and(|p| {
            p.template != sign.template || p.values != sign.values || p.messages != sign.messages
        });
        if let Some(artwork) = sign.override_artwork.as_mut() {
            let unchanged = previous
                .as_ref()
                .and_then(|p| p.override_artwork.as_ref())
                .is_some_and(|old| old.source == artwork.source && artwork.png.is_some());
            if !unchanged {
                artwork.png = Some(self.converter.to_png(&artwork.source)?);
                artwork.up_to_date = true;
                tracing::debug!(sign = %sign.id, file = %artwork.file_name, "Converted uploaded artwork");
            } else if content_changed {
                artwork.up_to_date = false;
            }
        }

        // 3. review reset
        if sign.state.is_some() && sign.state != previous_state {
            sign.review_state = ReviewState::NeedsReview;
        }

        // 4. derived fields
        sign.last_modified_date = Utc::now();
        sign.sort = sort::sort_keys(&registry, &sign);
        sign.combined_search_text = export::combined_search_text(&registry, &sign)?;
        sign.message_json = export::message_json(&registry, &sign)?;
        sign.repeating_message_json = export::repeating_message_json(&registry, &sign)?;
        sign.meta_json = export::meta_json(&registry, &sign)?;

        // 5. conflicts
        let previous_key = previous.as_ref().map(NumberingKey::of);
        let conflicts_touched = if conflict::needs_rescan(previous_key.as_ref(), &sign) {
            conflict::rescan(&mut registry, &mut sign, previous_key.as_ref())
        } else {
            Vec::new()
        };

        // 6. phase mandate
        let new_zone = sign
            .zone
            .filter(|z| created || previous.as_ref().and_then(|p| p.zone) != Some(*z));
        let new_template = sign
            .template
            .filter(|t| created || previous.as_ref().and_then(|p| p.template) != Some(*t));
        if let Some(phase) = sign.phase {
            if let Some(phase) = registry.phase_mut(phase) {
                phase.zones.extend(new_zone);
                phase.templates.extend(new_template);
            }
        }

        // 7. write
        registry.insert_sign(sign.clone());

        // 8. permissions
        if sign.state.is_some() && (created || sign.state != previous_state) {
            let mut grants = self.grants.write().await;
            permissions::resync(&registry, &mut *grants, &sign, previous_state)?;
        }

        // 9. cache
        self.cache.invalidate_sign(sign.id).await;

        // 10. artwork
        let artwork_job = self.jobs.send(Job::GenerateArtwork {
            sign_ids: vec![sign.id],
        });

        // 11. event
        self.events.dispatch(
            &mut registry,
            &DomainEvent::SignSaved {
                sign: sign.id,
                created,
            },
        )?;

        tracing::info!(
            sign = %sign.id,
            created,
            touched = conflicts_touched.len(),
            "Saved sign"
        );
        let sign = registry.require_sign(sign.id)?.clone();
        Ok(SaveReport {
            sign,
            created,
            conflicts_touched,
            artwork_job,
        })
    }

    /// Remove a sign, releasing its conflicts and cached artifacts
    ///
    /// Grants are left in place.
    pub async fn delete_sign(&self, id: SignId) -> Result<Sign> {
        let mut registry = self.registry.write().await;
        let sign = registry
            .remove_sign(id)
            .ok_or_else(|| CoreError::not_found("sign", id.raw()))?;
        let touched = conflict::release(&mut registry, &sign);
        self.cache.invalidate_sign(id).await;
        self.events.dispatch(
            &mut registry,
            &DomainEvent::SignDeleted {
                sign: id,
                position: sign.position,
            },
        )?;
        tracing::info!(sign = %id, touched = touched.len(), "Deleted sign");
        Ok(sign)
    }

    /// Copy a sign onto a new position, with fresh ids throughout
    pub async fn clone_sign(&self, id: SignId) -> Result<SaveReport> {
        let copy = {
            let mut registry = self.registry.write().await;
            let original = registry.require_sign(id)?.clone();

            let mut position = registry.require_position(original.position)?.clone();
            position.id = PositionId::new(registry.allocate());
            let position = registry.save_position(position)?;

            let mut copy = registry.new_sign(position);
            copy.template = original.template;
            copy.tags = original.tags.clone();
            copy.state = original.state;
            copy.facing_direction = original.facing_direction;
            copy.quantity = original.quantity;
            copy.number = format!("{} (cloned)", original.number);
            copy.review_state = original.review_state;
            copy.override_artwork = original.override_artwork.clone();
            copy.values = original.values.clone();
            copy.messages = original
                .messages
                .iter()
                .map(|m| registry.new_message(m.values.clone()))
                .collect();
            copy
        };
        tracing::debug!(from = %id, to = %copy.id, "Cloning sign");
        let position = copy.position;
        match self.save_sign(copy).await {
            Ok(report) => Ok(report),
            Err(err) => {
                let mut registry = self.registry.write().await;
                if registry.signs_at_position(position).next().is_none() {
                    registry.remove_position(position);
                }
                Err(err)
            }
        }
    }

    /// Replace a sign's tags
    pub async fn set_tags(&self, id: SignId, tags: Vec<TagId>) -> Result<()> {
        let mut registry = self.registry.write().await;
        for tag in &tags {
            registry.require_tag(*tag)?;
        }
        registry
            .sign_mut(id)
            .ok_or_else(|| CoreError::not_found("sign", id.raw()))?
            .tags = tags;
        self.events
            .dispatch(&mut registry, &DomainEvent::SignTagsChanged { sign: id })?;
        Ok(())
    }

    /// Change a tag's text; every tagged sign's tag sort follows
    pub async fn rename_tag(&self, id: TagId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoreError::InvalidOperation("tag text cannot be empty".into()).into());
        }
        let mut registry = self.registry.write().await;
        registry
            .tag_mut(id)
            .ok_or_else(|| CoreError::not_found("tag", id.raw()))?
            .tag = name;
        self.events
            .dispatch(&mut registry, &DomainEvent::TagRenamed { tag: id })?;
        Ok(())
    }

    // Cached views hold the registry read lock until their entry is inserted

    /// Sign label, cached until the next save
    pub async fn label(&self, id: SignId) -> Result<Arc<String>> {
        let key = label_key(id);
        if let Some(label) = self.cache.get_text(&key).await {
            return Ok(label);
        }
        let registry = self.registry.read().await;
        let text = label::label(&registry, registry.require_sign(id)?)?;
        Ok(self.cache.insert_text(key, text).await)
    }

    /// Message HTML, cached until the next save
    pub async fn message_html(&self, id: SignId) -> Result<Arc<String>> {
        let key = message_html_key(id);
        if let Some(html) = self.cache.get_text(&key).await {
            return Ok(html);
        }
        let registry = self.registry.read().await;
        let html = export::message_html(&registry, registry.require_sign(id)?)?;
        Ok(self.cache.insert_text(key, html).await)
    }

    pub async fn meta_html(&self, id: SignId) -> Result<String> {
        let registry = self.registry.read().await;
        Ok(export::meta_html(&registry, registry.require_sign(id)?)?)
    }

    pub async fn snapshot(&self, id: SignId) -> Result<IndexMap<String, String>> {
        let registry = self.registry.read().await;
        Ok(export::snapshot(&registry, registry.require_sign(id)?)?)
    }

    /// Suggested number for a new sign in `zone`
    pub async fn next_number(
        &self,
        zone: ZoneId,
        template: Option<TemplateId>,
    ) -> Result<Option<String>> {
        let registry = self.registry.read().await;
        let project = registry.require_project(registry.require_zone(zone)?.project)?;
        Ok(number::next_number(&registry, project.numbering, zone, template))
    }

    pub async fn highlights(&self, id: SignId) -> Result<Highlights> {
        let registry = self.registry.read().await;
        let sign = registry.require_sign(id)?;
        let Some(project) = sign.project.and_then(|p| registry.project(p)) else {
            return Ok(Highlights::default());
        };
        Ok(Highlights {
            sign_type: conflict::should_highlight_type(project, &sign.conflicts),
            location: conflict::should_highlight_location(project, &sign.conflicts),
            number: conflict::should_highlight_number(project, &sign.conflicts),
        })
    }

    async fn render_input(&self, id: SignId) -> Result<RenderInput> {
        let registry = self.registry.read().await;
        Ok(RenderInput::build(&registry, registry.require_sign(id)?)?)
    }

    /// Rendered SVG, memoized in `scope`
    pub async fn svg(
        &self,
        scope: &mut RenderScope,
        id: SignId,
        text_to_vector: bool,
    ) -> Result<Arc<String>> {
        let input = self.render_input(id).await?;
        Ok(self.renderer.render_in(scope, &input, text_to_vector).await?)
    }

    /// PNG artwork; the placeholder when not cached and `generate` is unset
    pub async fn svg_as_png(&self, id: SignId, generate: bool) -> Result<Arc<Vec<u8>>> {
        let registry = self.registry.read().await;
        let input = RenderInput::build(&registry, registry.require_sign(id)?)?;
        Ok(self.renderer.svg_as_png(&self.cache, &input, generate).await?)
    }
}
