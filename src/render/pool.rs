use rayon::prelude::*;

use crate::{
    foundation::error::{StoryreelError, StoryreelResult},
    pipeline::RunContext,
    render::slide::{RenderedClip, render_slot},
    timeline::plan::Timeline,
};

/// Build the render worker pool; `None` uses rayon's default (available parallelism).
pub fn build_thread_pool(threads: Option<usize>) -> StoryreelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(StoryreelError::validation(
            "render 'threads' must be >= 1 when set",
        ));
    }

    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("storyreel-render-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build rayon thread pool: {e}").into())
}

/// Render every slot on `pool`. Results come back in timeline order; the first failure wins and
/// no further slots are started.
pub fn render_all(
    ctx: &RunContext,
    timeline: &Timeline,
    pool: &rayon::ThreadPool,
) -> StoryreelResult<Vec<RenderedClip>> {
    let total = timeline.len();
    tracing::info!(slots = total, threads = pool.current_num_threads(), "rendering slots");
    pool.install(|| {
        timeline
            .slots()
            .par_iter()
            .map(|slot| render_slot(ctx, slot, total))
            .collect::<StoryreelResult<Vec<_>>>()
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/pool.rs"]
mod tests;
