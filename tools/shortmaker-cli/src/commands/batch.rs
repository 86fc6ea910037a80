//! Render every clip of a clip-selection response.

use std::path::PathBuf;

use chrono::Utc;
use shortmaker_clip_model::response::{clips_within, parse_ai_response, validate_clips};
use shortmaker_common::config::AppConfig;
use shortmaker_render_engine::analysis::probe_duration;

use super::{ensure_video_exists, print_summary, OutputNames, RenderContext};
use crate::report::RenderReport;
use crate::RenderOptions;

pub fn run(
    config: &AppConfig,
    video: PathBuf,
    response: PathBuf,
    options: RenderOptions,
) -> anyhow::Result<()> {
    ensure_video_exists(&video)?;

    let text = std::fs::read_to_string(&response)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", response.display()))?;
    let proposed = parse_ai_response(&text)?;
    let mut clips = validate_clips(&proposed, &config.clip_bounds);
    match probe_duration(&config.render.ffprobe, &video) {
        Some(duration) => clips = clips_within(clips, duration),
        None => tracing::warn!(video = %video.display(), "Could not probe video duration"),
    }
    println!(
        "{} of {} proposed clips passed validation",
        clips.len(),
        proposed.len()
    );
    if clips.is_empty() {
        anyhow::bail!("No valid clips in {}", response.display());
    }

    let ctx = RenderContext::new(config, &video, options)?;
    let mut names = OutputNames::new(&ctx.output_dir);
    let mut results = Vec::with_capacity(clips.len());

    for (index, clip) in clips.iter().enumerate() {
        let output = names.next(&clip.title);
        println!();
        println!(
            "[{}/{}] {} ({} -> {})",
            index + 1,
            clips.len(),
            clip.title,
            clip.start_time,
            clip.end_time
        );
        if !clip.reason.is_empty() {
            println!("  Why: {}", clip.reason);
        }

        results.push(
            ctx.renderer
                .render(&video, ctx.subtitles(), clip, &output, ctx.remove_silence),
        );
    }

    print_summary(&results);

    let report = RenderReport::new(&video, Utc::now(), &results);
    match report.write(&ctx.output_dir) {
        Ok(path) => println!("Report: {}", path.display()),
        Err(e) => tracing::warn!(error = %e, "Failed to write render report"),
    }

    if report.succeeded() == 0 {
        anyhow::bail!("No clips were rendered");
    }
    Ok(())
}
