//! Render a single manually specified clip.

use std::path::PathBuf;

use shortmaker_clip_model::clip::ClipDescriptor;
use shortmaker_clip_model::response::make_safe_filename;
use shortmaker_common::config::AppConfig;

use super::{ensure_video_exists, print_summary, RenderContext};
use crate::RenderOptions;

pub fn run(
    config: &AppConfig,
    video: PathBuf,
    start: String,
    end: String,
    title: String,
    options: RenderOptions,
) -> anyhow::Result<()> {
    ensure_video_exists(&video)?;
    let ctx = RenderContext::new(config, &video, options)?;

    let clip = ClipDescriptor::new(start, end, title);
    let output = ctx
        .output_dir
        .join(format!("{}.mp4", make_safe_filename(&clip.title)));

    println!("Rendering '{}' from {}", clip.title, video.display());
    println!("  {} -> {}", clip.start_time, clip.end_time);
    println!("  Output: {}", output.display());

    let result = ctx
        .renderer
        .render(&video, ctx.subtitles(), &clip, &output, ctx.remove_silence);
    print_summary(std::slice::from_ref(&result));

    if !result.succeeded {
        anyhow::bail!("Render failed for '{}'", result.title);
    }
    Ok(())
}
