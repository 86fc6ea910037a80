//! Structured filter graphs.
//!
//! A graph is a list of stages. Each stage reads named stream labels, runs
//! a chain of filters and writes new labels. Graphs are checked when they
//! are constructed and only turned into ffmpeg `-filter_complex` text at
//! the command boundary.

use std::collections::HashMap;
use std::fmt;

use shortmaker_common::error::{ShortsError, ShortsResult};

/// Video stream of the first input.
pub const SOURCE_VIDEO: &str = "0:v";

/// Audio stream of the first input.
pub const SOURCE_AUDIO: &str = "0:a";

/// Label of the device-resident video produced by [`FilterGraph::with_hardware_upload`].
pub const HARDWARE_VIDEO_OUT: &str = "outv_hw";

fn is_source(label: &str) -> bool {
    label == SOURCE_VIDEO || label == SOURCE_AUDIO
}

/// One filter argument, either positional (`1440`) or named (`sigma=40`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterArg {
    Positional(String),
    Named(String, String),
}

impl fmt::Display for FilterArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterArg::Positional(value) => f.write_str(value),
            FilterArg::Named(key, value) => write!(f, "{key}={value}"),
        }
    }
}

/// A single filter invocation such as `crop=1440:ih:360:0`.
///
/// Argument values are written verbatim; callers escape them first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub name: String,
    pub args: Vec<FilterArg>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(FilterArg::Positional(value.to_string()));
        self
    }

    /// Append a `key=value` argument.
    pub fn named(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args.push(FilterArg::Named(key.into(), value.to_string()));
        self
    }

    /// Value of a named argument, if present.
    pub fn named_arg(&self, key: &str) -> Option<&str> {
        self.args.iter().find_map(|arg| match arg {
            FilterArg::Named(k, v) if k == key => Some(v.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            write!(f, "{arg}")?;
        }
        Ok(())
    }
}

/// A filter chain with its input and output labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub inputs: Vec<String>,
    pub filters: Vec<Filter>,
    pub outputs: Vec<String>,
}

impl Stage {
    pub fn new<I, O>(inputs: I, filters: Vec<Filter>, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            filters,
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "[{input}]")?;
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        for output in &self.outputs {
            write!(f, "[{output}]")?;
        }
        Ok(())
    }
}

/// A validated filter graph with exactly one video and one audio terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGraph {
    stages: Vec<Stage>,
    video_out: String,
    audio_out: String,
}

impl FilterGraph {
    /// Build a graph, checking label wiring.
    ///
    /// Every consumed label must be a source pad or the output of an
    /// earlier stage, and non-source labels are consumed at most once.
    /// Every produced label except the two terminals must be consumed.
    pub fn new(
        stages: Vec<Stage>,
        video_out: impl Into<String>,
        audio_out: impl Into<String>,
    ) -> ShortsResult<Self> {
        let video_out = video_out.into();
        let audio_out = audio_out.into();

        if stages.is_empty() {
            return Err(ShortsError::graph("graph has no stages"));
        }
        if video_out == audio_out {
            return Err(ShortsError::graph("video and audio terminals must differ"));
        }

        // label -> consumed
        let mut produced: HashMap<&str, bool> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for (index, stage) in stages.iter().enumerate() {
            if stage.inputs.is_empty() || stage.filters.is_empty() || stage.outputs.is_empty() {
                return Err(ShortsError::graph(format!(
                    "stage {index} needs inputs, filters and outputs"
                )));
            }

            for input in &stage.inputs {
                if is_source(input) {
                    continue;
                }
                match produced.get_mut(input.as_str()) {
                    Some(consumed @ false) => *consumed = true,
                    Some(true) => {
                        return Err(ShortsError::graph(format!(
                            "label [{input}] consumed twice (stage {index})"
                        )))
                    }
                    None => {
                        return Err(ShortsError::graph(format!(
                            "label [{input}] used before it is produced (stage {index})"
                        )))
                    }
                }
            }

            for output in &stage.outputs {
                if output.is_empty()
                    || output.contains(['[', ']', ';', ','])
                    || is_source(output)
                {
                    return Err(ShortsError::graph(format!(
                        "invalid output label [{output}] (stage {index})"
                    )));
                }
                if produced.insert(output.as_str(), false).is_some() {
                    return Err(ShortsError::graph(format!(
                        "label [{output}] produced twice (stage {index})"
                    )));
                }
                order.push(output.as_str());
            }
        }

        for terminal in [&video_out, &audio_out] {
            match produced.get(terminal.as_str()) {
                Some(false) => {}
                Some(true) => {
                    return Err(ShortsError::graph(format!(
                        "terminal [{terminal}] is consumed inside the graph"
                    )))
                }
                None => {
                    return Err(ShortsError::graph(format!(
                        "terminal [{terminal}] is never produced"
                    )))
                }
            }
        }

        if let Some(dangling) = order.iter().find(|label| {
            **label != video_out && **label != audio_out && produced.get(**label) == Some(&false)
        }) {
            return Err(ShortsError::graph(format!(
                "label [{dangling}] is produced but never used"
            )));
        }

        Ok(Self {
            stages,
            video_out,
            audio_out,
        })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn video_out(&self) -> &str {
        &self.video_out
    }

    pub fn audio_out(&self) -> &str {
        &self.audio_out
    }

    /// `-map` argument for the video terminal, e.g. `[outv]`.
    pub fn video_map(&self) -> String {
        format!("[{}]", self.video_out)
    }

    /// `-map` argument for the audio terminal, e.g. `[outa]`.
    pub fn audio_map(&self) -> String {
        format!("[{}]", self.audio_out)
    }

    /// All filters with the given name, in graph order.
    pub fn filters_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Filter> + 'a {
        self.stages
            .iter()
            .flat_map(|stage| stage.filters.iter())
            .filter(move |filter| filter.name == name)
    }

    pub fn contains_filter(&self, name: &str) -> bool {
        self.filters_named(name).next().is_some()
    }

    /// The stage that produces `label`.
    pub fn producer_of(&self, label: &str) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|stage| stage.outputs.iter().any(|o| o == label))
    }

    /// Copy of this graph that converts the final video to NV12 and uploads
    /// it to the hardware device before encoding.
    pub fn with_hardware_upload(&self) -> FilterGraph {
        let mut stages = self.stages.clone();
        stages.push(Stage::new(
            [self.video_out.clone()],
            vec![Filter::new("format").arg("nv12"), Filter::new("hwupload")],
            [HARDWARE_VIDEO_OUT],
        ));
        FilterGraph {
            stages,
            video_out: HARDWARE_VIDEO_OUT.to_string(),
            audio_out: self.audio_out.clone(),
        }
    }

    /// Serialize to ffmpeg `-filter_complex` syntax.
    pub fn to_filter_complex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_graph() -> FilterGraph {
        FilterGraph::new(
            vec![
                Stage::new([SOURCE_VIDEO], vec![Filter::new("null")], ["outv"]),
                Stage::new(
                    [SOURCE_AUDIO],
                    vec![Filter::new("atempo").arg(1.2)],
                    ["outa"],
                ),
            ],
            "outv",
            "outa",
        )
        .unwrap()
    }

    #[test]
    fn test_filter_rendering() {
        let filter = Filter::new("crop").arg(1440).arg("ih").arg(360).arg(0);
        assert_eq!(filter.to_string(), "crop=1440:ih:360:0");
        assert_eq!(Filter::new("gblur").named("sigma", 40).to_string(), "gblur=sigma=40");
        assert_eq!(Filter::new("hwupload").to_string(), "hwupload");
    }

    #[test]
    fn test_graph_serialization() {
        assert_eq!(
            simple_graph().to_filter_complex(),
            "[0:v]null[outv];[0:a]atempo=1.2[outa]"
        );
    }

    #[test]
    fn test_rejects_dangling_label() {
        let err = FilterGraph::new(
            vec![
                Stage::new([SOURCE_VIDEO], vec![Filter::new("split").arg(2)], ["a", "b"]),
                Stage::new(["a"], vec![Filter::new("null")], ["outv"]),
                Stage::new([SOURCE_AUDIO], vec![Filter::new("anull")], ["outa"]),
            ],
            "outv",
            "outa",
        )
        .unwrap_err();
        assert!(err.to_string().contains("[b]"));
    }

    #[test]
    fn test_rejects_double_consumption() {
        let err = FilterGraph::new(
            vec![
                Stage::new([SOURCE_VIDEO], vec![Filter::new("null")], ["v"]),
                Stage::new(["v"], vec![Filter::new("null")], ["outv"]),
                Stage::new(["v"], vec![Filter::new("null")], ["other"]),
                Stage::new([SOURCE_AUDIO], vec![Filter::new("anull")], ["outa"]),
            ],
            "outv",
            "outa",
        )
        .unwrap_err();
        assert!(err.to_string().contains("consumed twice"));
    }

    #[test]
    fn test_rejects_unknown_input_and_missing_terminal() {
        assert!(FilterGraph::new(
            vec![Stage::new(["nope"], vec![Filter::new("null")], ["outv"])],
            "outv",
            "outa",
        )
        .is_err());

        assert!(FilterGraph::new(
            vec![Stage::new([SOURCE_VIDEO], vec![Filter::new("null")], ["outv"])],
            "outv",
            "outa",
        )
        .is_err());
    }

    #[test]
    fn test_hardware_upload_appends_stage() {
        let graph = simple_graph();
        let hw = graph.with_hardware_upload();

        assert_eq!(hw.video_out(), HARDWARE_VIDEO_OUT);
        assert_eq!(hw.audio_out(), "outa");
        assert_eq!(hw.stages().len(), graph.stages().len() + 1);
        assert!(hw
            .to_filter_complex()
            .starts_with(&graph.to_filter_complex()));
        assert!(hw
            .to_filter_complex()
            .ends_with(";[outv]format=nv12,hwupload[outv_hw]"));
        // The upload stage keeps the graph well-formed.
        assert!(FilterGraph::new(hw.stages().to_vec(), hw.video_out(), hw.audio_out()).is_ok());
    }
}
