//! Filter graph construction for vertical shorts.
//!
//! Every short shares the same visual pipeline: a blurred full-height
//! background, the face-centered foreground laid over it, a title, optional
//! burned-in subtitles and a blinking call-to-action. Timing is applied on
//! top of that, either as one continuous shifted segment or as a
//! concatenation of the keep intervals left after silence removal.

use std::path::Path;

use shortmaker_clip_model::interval::KeepInterval;
use shortmaker_common::error::{ShortsError, ShortsResult};
use shortmaker_common::timecode::format_precise;
use shortmaker_processing_core::framing::CropGeometry;
use shortmaker_processing_core::silence::SilenceEdit;

use crate::graph::{Filter, FilterGraph, Stage, SOURCE_AUDIO, SOURCE_VIDEO};

/// Default playback speed-up applied to every short.
pub const DEFAULT_SPEED: f64 = 1.2;

/// Height of the vertical output frame.
pub const OUTPUT_HEIGHT: u32 = 2560;

/// Titles with more words than this are split over two lines.
pub const TITLE_SPLIT_WORDS: usize = 4;

pub const CALL_TO_ACTION: &str = "Watch Full Video Here \u{25BC}";

/// libass style forced onto burned-in subtitles.
pub const SUBTITLE_FORCE_STYLE: &str = "FontName=Arial,FontSize=12,Bold=1,\
PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,Outline=1,Shadow=0,MarginV=62";

const VISUAL_OUT: &str = "v_visual";
const VIDEO_OUT: &str = "outv";
const AUDIO_OUT: &str = "outa";

// atempo accepts factors in this range
const MIN_SPEED: f64 = 0.5;
const MAX_SPEED: f64 = 100.0;

/// Per-clip inputs to graph construction.
#[derive(Debug, Clone)]
pub struct GraphRequest<'a> {
    /// Clip start in the source, in seconds.
    pub clip_start_secs: f64,
    /// Horizontal foreground crop offset (pixels).
    pub crop_offset: u32,
    pub title: &'a str,
    pub subtitles: Option<&'a Path>,
    pub font_file: Option<&'a Path>,
    pub edit: &'a SilenceEdit,
}

/// Builds validated [`FilterGraph`]s for one output geometry and speed.
#[derive(Debug, Clone)]
pub struct FilterGraphBuilder {
    geometry: CropGeometry,
    output_height: u32,
    speed: f64,
}

impl Default for FilterGraphBuilder {
    fn default() -> Self {
        Self {
            geometry: CropGeometry::default(),
            output_height: OUTPUT_HEIGHT,
            speed: DEFAULT_SPEED,
        }
    }
}

impl FilterGraphBuilder {
    pub fn new(speed: f64) -> ShortsResult<Self> {
        if !speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(ShortsError::graph(format!(
                "speed {speed} is outside {MIN_SPEED}..={MAX_SPEED}"
            )));
        }
        Ok(Self {
            speed,
            ..Self::default()
        })
    }

    pub fn with_geometry(mut self, geometry: CropGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn geometry(&self) -> CropGeometry {
        self.geometry
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Build the complete graph for a clip.
    pub fn build(&self, request: &GraphRequest<'_>) -> ShortsResult<FilterGraph> {
        let mut stages = self.visual_stages(request);
        match request.edit {
            SilenceEdit::Untouched => {
                stages.extend(self.continuous_timing(request.clip_start_secs));
            }
            SilenceEdit::Cut(intervals) => {
                stages.extend(self.segmented_timing(request.clip_start_secs, intervals)?);
            }
        }
        FilterGraph::new(stages, VIDEO_OUT, AUDIO_OUT)
    }

    fn visual_stages(&self, request: &GraphRequest<'_>) -> Vec<Stage> {
        let crop_width = self.geometry.crop_width;
        let height = self.output_height;

        let background = vec![
            Filter::new("scale").arg(-2).arg(height),
            Filter::new("crop")
                .arg(crop_width)
                .arg(height)
                .arg(format!("(iw-{crop_width})/2"))
                .arg(0),
            Filter::new("gblur").named("sigma", 40),
        ];
        let foreground = vec![
            Filter::new("scale").arg(self.geometry.scaled_width).arg(-2),
            Filter::new("crop")
                .arg(crop_width)
                .arg("ih")
                .arg(request.crop_offset)
                .arg(0),
        ];

        let mut composite = vec![Filter::new("overlay").arg(0).arg("(H-h)/2")];
        composite.extend(self.text_filters(request));

        vec![
            Stage::new([SOURCE_VIDEO], vec![Filter::new("split").arg(2)], ["bg", "fg"]),
            Stage::new(["bg"], background, ["bg_out"]),
            Stage::new(["fg"], foreground, ["fg_out"]),
            Stage::new(["bg_out", "fg_out"], composite, [VISUAL_OUT]),
        ]
    }

    fn text_filters(&self, request: &GraphRequest<'_>) -> Vec<Filter> {
        let font = FontSpec::from(request.font_file);
        let (line1, line2) = split_title(request.title);

        let mut filters = vec![title_text(&line1, &font, 200)];
        if let Some(line2) = line2 {
            filters.push(title_text(&line2, &font, 310));
        }

        if let Some(subtitles) = request.subtitles {
            let mut filter = Filter::new("subtitles").arg(escape_filter_path(subtitles));
            if let Some(fonts_dir) = request.font_file.and_then(Path::parent) {
                filter = filter.named("fontsdir", escape_filter_path(fonts_dir));
            }
            filters.push(filter.named("force_style", format!("'{SUBTITLE_FORCE_STYLE}'")));
        }

        let cta = Filter::new("drawtext").named("text", quoted(CALL_TO_ACTION));
        filters.push(
            font.apply(cta)
                .named("fontsize", 30)
                .named("fontcolor", "red")
                .named("borderw", 3)
                .named("bordercolor", "white")
                .named("alpha", "'if(lt(mod(t,1),0.5),1,0)'")
                .named("x", "(w-text_w)/2-20")
                .named("y", "h-310"),
        );
        filters
    }

    fn continuous_timing(&self, clip_start_secs: f64) -> Vec<Stage> {
        let start = format_precise(clip_start_secs);
        let speed = format_precise(self.speed);
        vec![
            Stage::new(
                [VISUAL_OUT],
                vec![Filter::new("setpts").arg(format!("(PTS-{start}/TB)/{speed}"))],
                [VIDEO_OUT],
            ),
            Stage::new(
                [SOURCE_AUDIO],
                vec![
                    Filter::new("asetpts").arg(format!("PTS-{start}/TB")),
                    Filter::new("atempo").arg(&speed),
                ],
                [AUDIO_OUT],
            ),
        ]
    }

    /// Trim each keep interval out of the visual and audio streams and
    /// concatenate the pieces in order. Intervals are relative to the clip
    /// start; the trims use absolute source times because the input keeps
    /// its original timestamps.
    fn segmented_timing(
        &self,
        clip_start_secs: f64,
        intervals: &[KeepInterval],
    ) -> ShortsResult<Vec<Stage>> {
        if intervals.is_empty() {
            return Err(ShortsError::graph("silence cut has no keep intervals"));
        }

        let count = intervals.len();
        let speed = format_precise(self.speed);
        let video_sources: Vec<String> = (0..count).map(|i| format!("v_src{i}")).collect();
        let audio_sources: Vec<String> = (0..count).map(|i| format!("a_src{i}")).collect();

        let mut stages = vec![
            Stage::new(
                [VISUAL_OUT],
                vec![Filter::new("split").arg(count)],
                video_sources.clone(),
            ),
            Stage::new(
                [SOURCE_AUDIO],
                vec![Filter::new("asplit").arg(count)],
                audio_sources.clone(),
            ),
        ];

        let mut concat_inputs = Vec::with_capacity(count * 2);
        for (i, interval) in intervals.iter().enumerate() {
            let absolute = interval.offset_by(clip_start_secs);
            let start = format_precise(absolute.start);
            let end = format_precise(absolute.end);

            stages.push(Stage::new(
                [video_sources[i].clone()],
                vec![
                    Filter::new("trim").named("start", &start).named("end", &end),
                    Filter::new("setpts").arg("PTS-STARTPTS"),
                ],
                [format!("v{i}")],
            ));
            stages.push(Stage::new(
                [audio_sources[i].clone()],
                vec![
                    Filter::new("atrim").named("start", &start).named("end", &end),
                    Filter::new("asetpts").arg("PTS-STARTPTS"),
                ],
                [format!("a{i}")],
            ));
            concat_inputs.push(format!("v{i}"));
            concat_inputs.push(format!("a{i}"));
        }

        stages.push(Stage::new(
            concat_inputs,
            vec![Filter::new("concat")
                .named("n", count)
                .named("v", 1)
                .named("a", 1)],
            ["v_cat", "a_cat"],
        ));
        stages.push(Stage::new(
            ["v_cat"],
            vec![Filter::new("setpts").arg(format!("PTS/{speed}"))],
            [VIDEO_OUT],
        ));
        stages.push(Stage::new(
            ["a_cat"],
            vec![Filter::new("atempo").arg(&speed)],
            [AUDIO_OUT],
        ));
        Ok(stages)
    }
}

enum FontSpec {
    File(String),
    Default,
}

impl FontSpec {
    fn apply(&self, filter: Filter) -> Filter {
        match self {
            FontSpec::File(path) => filter.named("fontfile", path),
            FontSpec::Default => filter.named("font", "Sans"),
        }
    }
}

impl From<Option<&Path>> for FontSpec {
    fn from(font_file: Option<&Path>) -> Self {
        font_file
            .map(|path| FontSpec::File(escape_filter_path(path)))
            .unwrap_or(FontSpec::Default)
    }
}

fn title_text(line: &str, font: &FontSpec, y: u32) -> Filter {
    let filter = Filter::new("drawtext").named("text", quoted(line));
    font.apply(filter)
        .named("fontsize", 90)
        .named("fontcolor", "white")
        .named("borderw", 10)
        .named("bordercolor", "black")
        .named("x", "(w-text_w)/2")
        .named("y", y)
}

fn quoted(text: &str) -> String {
    format!("'{}'", escape_drawtext(text))
}

/// Split a long title into two lines of words, the first line taking the
/// extra word when the count is odd.
pub fn split_title(title: &str) -> (String, Option<String>) {
    let words: Vec<&str> = title.split_whitespace().collect();
    if words.len() > TITLE_SPLIT_WORDS {
        let mid = (words.len() + 1) / 2;
        (words[..mid].join(" "), Some(words[mid..].join(" ")))
    } else {
        (title.to_string(), None)
    }
}

/// Escape text for a single-quoted drawtext `text` value.
///
/// ASCII apostrophes become typographic ones since they cannot appear
/// inside the quotes.
pub fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push('\u{2019}'),
            ':' => out.push_str("\\:"),
            ';' => out.push_str("\\;"),
            // drawtext expands `%{...}` sequences.
            '%' => out.push_str("\\%"),
            other => out.push(other),
        }
    }
    out
}

/// Escape a path used as an unquoted filter option value.
///
/// The value passes through both the filtergraph and the option parser, so
/// special characters carry two levels of escaping.
pub fn escape_filter_path(path: &Path) -> String {
    let text = path.to_string_lossy();
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\\\\\"),
            ':' | '\'' | '[' | ']' => {
                out.push_str("\\\\");
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out
}
