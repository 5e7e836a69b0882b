//! Delayed artwork regeneration
//!
//! A save queues `sign:generate_artwork` for its sign. The job waits for the
//! settle delay on a tokio task, then regenerates the PNG of every listed sign
//! whose template has SVG, replacing any cached one.

use crate::Result;
use signage_core::{Registry, Sign, SignId, TemplateId};
use signage_render::{ArtworkRenderer, RenderCache, RenderInput, RenderService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    GenerateArtwork { sign_ids: Vec<SignId> },
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::GenerateArtwork { .. } => "sign:generate_artwork",
        }
    }
}

/// Outcome of one job run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub generated: Vec<SignId>,
    pub skipped: Vec<SignId>,
    pub failed: Vec<SignId>,
}

/// In-process delayed job queue
pub struct ArtworkJobs<S> {
    registry: Arc<RwLock<Registry>>,
    renderer: Arc<ArtworkRenderer<S>>,
    cache: RenderCache,
    settle_delay: Duration,
}

impl<S> Clone for ArtworkJobs<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            renderer: Arc::clone(&self.renderer),
            cache: self.cache.clone(),
            settle_delay: self.settle_delay,
        }
    }
}

impl<S: RenderService + 'static> ArtworkJobs<S> {
    pub fn new(
        registry: Arc<RwLock<Registry>>,
        renderer: Arc<ArtworkRenderer<S>>,
        cache: RenderCache,
        settle_delay: Duration,
    ) -> Self {
        Self {
            registry,
            renderer,
            cache,
            settle_delay,
        }
    }

    /// Run `job` after the settle delay; the handle may be dropped
    pub fn send(&self, job: Job) -> JoinHandle<JobReport> {
        let jobs = self.clone();
        tracing::debug!(job = job.name(), delay = ?self.settle_delay, "Queued job");
        tokio::spawn(async move {
            tokio::time::sleep(jobs.settle_delay).await;
            jobs.run(job).await
        })
    }

    /// Run `job` immediately
    pub async fn run(&self, job: Job) -> JobReport {
        let Job::GenerateArtwork { sign_ids } = job;
        let mut report = JobReport::default();
        let mut has_svg: HashMap<Option<TemplateId>, bool> = HashMap::new();

        for id in sign_ids {
            // Read lock spans the render: no save interleaves before the PNG is cached
            let registry = self.registry.read().await;
            let Some(sign) = registry.sign(id) else {
                report.skipped.push(id);
                continue;
            };
            let renders = *has_svg.entry(sign.template).or_insert_with(|| {
                sign.template
                    .and_then(|t| registry.template(t))
                    .is_some_and(|t| t.has_svg())
            });
            if !renders {
                report.skipped.push(id);
                continue;
            }

            match self.generate(&registry, sign).await {
                Ok(()) => report.generated.push(id),
                Err(err) => {
                    tracing::warn!(sign = id.raw(), error = %err, "Artwork generation failed");
                    report.failed.push(id);
                }
            }
        }

        tracing::info!(
            generated = report.generated.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Generated artwork"
        );
        report
    }

    async fn generate(&self, registry: &Registry, sign: &Sign) -> Result<()> {
        let input = RenderInput::build(registry, sign)?;
        self.renderer.generate_png(&self.cache, &input).await?;
        Ok(())
    }
}
