//! ffmpeg command lines for rendering a clip.

use std::path::{Path, PathBuf};

use serde::Serialize;
use shortmaker_clip_model::clip::ClipRequest;
use shortmaker_common::config::RenderSettings;

use crate::graph::FilterGraph;
use crate::process::Invocation;

/// Which encoder a render attempt uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodePath {
    /// VAAPI `h264_vaapi` on the render device.
    Hardware,
    /// CPU `libx264`.
    Software,
}

impl EncodePath {
    pub fn as_str(self) -> &'static str {
        match self {
            EncodePath::Hardware => "hardware",
            EncodePath::Software => "software",
        }
    }
}

/// What is being rendered and where it goes.
#[derive(Debug, Clone, Copy)]
pub struct RenderTarget<'a> {
    pub video: &'a Path,
    pub clip: &'a ClipRequest,
    pub output: &'a Path,
}

/// A complete ffmpeg render command for one encode path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCommand {
    pub path: EncodePath,
    pub output_path: PathBuf,
    pub invocation: Invocation,
}

impl RenderCommand {
    /// CPU encode of `graph` as-is.
    pub fn software(settings: &RenderSettings, target: RenderTarget<'_>, graph: &FilterGraph) -> Self {
        Self::build(EncodePath::Software, settings, target, graph)
    }

    /// VAAPI encode; the graph gets an upload stage appended.
    pub fn hardware(settings: &RenderSettings, target: RenderTarget<'_>, graph: &FilterGraph) -> Self {
        Self::build(
            EncodePath::Hardware,
            settings,
            target,
            &graph.with_hardware_upload(),
        )
    }

    fn build(
        path: EncodePath,
        settings: &RenderSettings,
        target: RenderTarget<'_>,
        graph: &FilterGraph,
    ) -> Self {
        let mut invocation = Invocation::new(&settings.ffmpeg).args([
            "-y",
            "-hide_banner",
            "-nostats",
            "-progress",
            "pipe:1",
        ]);

        if path == EncodePath::Hardware {
            invocation = invocation.args([
                "-init_hw_device".to_string(),
                format!("vaapi=va:{}", settings.vaapi_device.display()),
                "-filter_hw_device".to_string(),
                "va".to_string(),
            ]);
        }

        // Seeking before the input with -copyts keeps source timestamps,
        // which the graph's setpts/trim expressions rely on.
        invocation = invocation
            .args([
                "-ss".to_string(),
                target.clip.start.precise(),
                "-to".to_string(),
                target.clip.end.precise(),
                "-copyts".to_string(),
                "-i".to_string(),
                target.video.display().to_string(),
                "-filter_complex".to_string(),
                graph.to_filter_complex(),
                "-map".to_string(),
                graph.video_map(),
                "-map".to_string(),
                graph.audio_map(),
            ])
            .args(codec_args(path))
            .arg(target.output.display().to_string());

        Self {
            path,
            output_path: target.output.to_path_buf(),
            invocation,
        }
    }

    pub fn filter_complex(&self) -> Option<&str> {
        self.invocation.value_of("-filter_complex")
    }
}

fn codec_args(path: EncodePath) -> Vec<&'static str> {
    let video: &[&'static str] = match path {
        EncodePath::Hardware => &["-c:v", "h264_vaapi", "-qp", "23"],
        EncodePath::Software => &["-c:v", "libx264", "-crf", "23", "-preset", "fast"],
    };
    let mut args = video.to_vec();
    args.extend(["-c:a", "aac", "-b:a", "128k", "-movflags", "+faststart"]);
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{FilterGraphBuilder, GraphRequest};
    use shortmaker_clip_model::clip::ClipDescriptor;
    use shortmaker_processing_core::silence::SilenceEdit;

    fn graph() -> FilterGraph {
        FilterGraphBuilder::default()
            .build(&GraphRequest {
                clip_start_secs: 10.0,
                crop_offset: 360,
                title: "Great Hook",
                subtitles: None,
                font_file: None,
                edit: &SilenceEdit::Untouched,
            })
            .unwrap()
    }

    fn clip() -> ClipRequest {
        ClipRequest::from_descriptor(&ClipDescriptor::new("00:00:10", "00:00:30", "Great Hook"))
            .unwrap()
    }

    #[test]
    fn test_software_command() {
        let clip = clip();
        let target = RenderTarget {
            video: Path::new("in.mp4"),
            clip: &clip,
            output: Path::new("out/Great_Hook.mp4"),
        };
        let cmd = RenderCommand::software(&RenderSettings::default(), target, &graph());
        let args = &cmd.invocation.args;

        assert_eq!(cmd.invocation.program, "ffmpeg");
        assert_eq!(cmd.invocation.value_of("-ss"), Some("10"));
        assert_eq!(cmd.invocation.value_of("-to"), Some("30"));
        assert_eq!(cmd.invocation.value_of("-c:v"), Some("libx264"));
        assert_eq!(cmd.invocation.value_of("-crf"), Some("23"));
        assert!(cmd.invocation.has_arg("-copyts"));
        assert!(!cmd.invocation.has_arg("-init_hw_device"));
        assert_eq!(args.last().map(String::as_str), Some("out/Great_Hook.mp4"));
        assert_eq!(cmd.filter_complex(), Some(graph().to_filter_complex().as_str()));

        let maps: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-map")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(maps, vec!["[outv]", "[outa]"]);
    }

    #[test]
    fn test_hardware_command() {
        let clip = clip();
        let target = RenderTarget {
            video: Path::new("in.mp4"),
            clip: &clip,
            output: Path::new("out.mp4"),
        };
        let cmd = RenderCommand::hardware(&RenderSettings::default(), target, &graph());

        assert_eq!(cmd.path, EncodePath::Hardware);
        assert_eq!(
            cmd.invocation.value_of("-init_hw_device"),
            Some("vaapi=va:/dev/dri/renderD128")
        );
        assert_eq!(cmd.invocation.value_of("-filter_hw_device"), Some("va"));
        assert_eq!(cmd.invocation.value_of("-c:v"), Some("h264_vaapi"));
        assert_eq!(cmd.invocation.value_of("-qp"), Some("23"));
        assert_eq!(cmd.invocation.value_of("-map"), Some("[outv_hw]"));
        assert!(cmd
            .filter_complex()
            .unwrap()
            .ends_with(";[outv]format=nv12,hwupload[outv_hw]"));
    }
}
