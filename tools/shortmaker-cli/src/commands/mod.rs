pub mod batch;
pub mod check;
pub mod render;

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use shortmaker_clip_model::response::make_safe_filename;
use shortmaker_common::config::AppConfig;
use shortmaker_render_engine::{ClipRenderer, RenderResult, SystemRunner};

use crate::RenderOptions;

/// Effective settings for one render command: CLI flags over config.
pub struct RenderContext {
    pub renderer: ClipRenderer,
    pub output_dir: PathBuf,
    pub remove_silence: bool,
    pub subtitles: Option<PathBuf>,
}

impl RenderContext {
    pub fn new(config: &AppConfig, video: &Path, options: RenderOptions) -> anyhow::Result<Self> {
        let runner = SystemRunner::new().with_progress(Box::new(|p| {
            eprint!("\r  Encoded {:.1}s (elapsed {:.0}s)  ", p.out_time_secs, p.elapsed_secs);
            if p.complete {
                eprintln!();
            }
            let _ = std::io::stderr().flush();
        }));
        let renderer = ClipRenderer::new(config, Arc::new(runner))
            .map_err(|e| anyhow::anyhow!("Failed to set up renderer: {e}"))?;

        let subtitles = match options.srt {
            Some(srt) if !srt.is_file() => {
                anyhow::bail!("Subtitle file not found: {}", srt.display())
            }
            Some(srt) => Some(srt),
            None => {
                let found = sibling_subtitles(video);
                if let Some(srt) = &found {
                    println!("Found existing SRT: {}", srt.display());
                }
                found
            }
        };

        Ok(Self {
            renderer,
            output_dir: options
                .output_dir
                .unwrap_or_else(|| config.output_dir.clone()),
            remove_silence: options.remove_silence || config.remove_silence,
            subtitles,
        })
    }

    pub fn subtitles(&self) -> Option<&Path> {
        self.subtitles.as_deref()
    }
}

/// `<video>.srt` next to the video, if present.
pub fn sibling_subtitles(video: &Path) -> Option<PathBuf> {
    let srt = video.with_extension("srt");
    srt.is_file().then_some(srt)
}

/// Hands out output paths that are unique within one run.
///
/// Titles that sanitize to the same stem get `_2`, `_3`, ... suffixes so a
/// failed clip never removes another clip's output.
#[derive(Debug)]
pub struct OutputNames {
    dir: PathBuf,
    taken: HashSet<String>,
}

impl OutputNames {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            taken: HashSet::new(),
        }
    }

    pub fn next(&mut self, title: &str) -> PathBuf {
        let stem = make_safe_filename(title);
        let mut name = stem.clone();
        let mut n = 1;
        while !self.taken.insert(name.clone()) {
            n += 1;
            name = format!("{stem}_{n}");
        }
        self.dir.join(format!("{name}.mp4"))
    }
}

pub fn ensure_video_exists(video: &Path) -> anyhow::Result<()> {
    if !video.is_file() {
        anyhow::bail!("Video file not found: {}", video.display());
    }
    Ok(())
}

/// Print the per-clip summary table.
pub fn print_summary(results: &[RenderResult]) {
    println!();
    println!("Results");
    println!("{}", "=".repeat(50));
    for result in results {
        if result.succeeded {
            let size = std::fs::metadata(&result.output_path)
                .map(|m| m.len())
                .unwrap_or(0);
            println!(
                "[OK]   {} -> {} ({:.1} MB)",
                result.title,
                result.output_path.display(),
                size as f64 / 1_048_576.0
            );
        } else {
            println!("[FAIL] {} ({:?})", result.title, result.stage);
            if !result.diagnostic_tail.is_empty() {
                println!("       {}", result.diagnostic_tail.replace('\n', "\n       "));
            }
        }
    }
    let ok = results.iter().filter(|r| r.succeeded).count();
    println!("{}", "=".repeat(50));
    println!("{ok}/{} clips rendered", results.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colliding_titles_get_distinct_paths() {
        let mut names = OutputNames::new(Path::new("shorts"));
        let first = names.next("Hook!");
        let second = names.next("Hook?");
        let third = names.next("Hook_");
        let other = names.next("Other");

        assert_eq!(first, PathBuf::from("shorts/Hook_.mp4"));
        assert_eq!(second, PathBuf::from("shorts/Hook__2.mp4"));
        assert_eq!(third, PathBuf::from("shorts/Hook__3.mp4"));
        assert_eq!(other, PathBuf::from("shorts/Other.mp4"));
    }

    #[test]
    fn test_suffixed_name_does_not_collide_with_later_title() {
        let mut names = OutputNames::new(Path::new("out"));
        assert_eq!(names.next("a"), PathBuf::from("out/a.mp4"));
        assert_eq!(names.next("a"), PathBuf::from("out/a_2.mp4"));
        assert_eq!(names.next("a_2"), PathBuf::from("out/a_2_2.mp4"));
    }

    #[test]
    fn test_sibling_subtitles() {
        let dir = std::env::temp_dir().join(format!("shortmaker-srt-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let video = dir.join("talk.mp4");

        assert_eq!(sibling_subtitles(&video), None);

        std::fs::write(dir.join("talk.srt"), "1\n00:00:01,000 --> 00:00:02,000\nHi\n").unwrap();
        assert_eq!(sibling_subtitles(&video), Some(dir.join("talk.srt")));

        let _ = std::fs::remove_dir_all(dir);
    }
}
