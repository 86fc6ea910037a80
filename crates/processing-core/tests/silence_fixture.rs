use std::path::PathBuf;

use shortmaker_processing_core::framing::CropGeometry;
use shortmaker_processing_core::silence::{parse_silence_log, SilenceEdit, SilenceResolver};

fn load_fixture_log() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("silencedetect")
        .join("interview-20s.log");

    std::fs::read_to_string(path).expect("fixture log should be readable")
}

#[test]
fn interview_fixture_resolves_to_four_keep_intervals() {
    let log = parse_silence_log(&load_fixture_log());
    assert_eq!(log.starts.len(), 5);
    assert_eq!(log.ends.len(), 4);

    let edit = SilenceResolver::default().resolve(&log.events(), 20.0);
    let SilenceEdit::Cut(intervals) = edit else {
        panic!("fixture should produce a cut");
    };

    let bounds: Vec<(f64, f64)> = intervals.iter().map(|i| (i.start, i.end)).collect();
    assert_eq!(
        bounds,
        vec![(0.0, 2.41), (3.184, 7.902), (9.62, 14.35), (15.2, 18.7)]
    );

    let kept: f64 = intervals.iter().map(|i| i.duration()).sum();
    assert!((kept - 15.358).abs() < 1e-9);
}

#[test]
fn keep_intervals_are_ordered_and_disjoint() {
    let log = parse_silence_log(&load_fixture_log());
    let intervals = SilenceResolver::default().keep_intervals(&log.events(), 20.0);

    for interval in &intervals {
        assert!(interval.start < interval.end);
        assert!(interval.start >= 0.0 && interval.end <= 20.0);
    }
    for pair in intervals.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
}

#[test]
fn unknown_face_gives_center_crop() {
    let geometry = CropGeometry::default();
    assert_eq!(
        geometry.offset_for(shortmaker_processing_core::framing::UNKNOWN_FACE_X),
        geometry.max_offset() / 2
    );
}
