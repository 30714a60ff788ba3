//! End-to-end reads of synthetic MFF recordings

use eeg_event_decoder::{AnnotationConfig, Annotation, Decoder, DecoderError};
use std::fs;
use std::path::{Path, PathBuf};

const INFO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<fileInfo xmlns="http://www.egi.com/info_mff">
    <mffVersion>3</mffVersion>
    <recordTime>2023-11-15T10:30:00.000000-08:00</recordTime>
</fileInfo>"#;

const INFO1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<dataInfo xmlns="http://www.egi.com/info_n_mff">
    <generalInformation>
        <fileDataType><EEG/></fileDataType>
        <montageName>HydroCel GSN 128 1.0</montageName>
    </generalInformation>
</dataInfo>"#;

fn event(begin: &str, duration: u32, code: &str, label: Option<&str>, cell: Option<u32>) -> String {
    let label = label
        .map(|l| format!("<label>{}</label>", l))
        .unwrap_or_default();
    let keys = cell
        .map(|c| {
            format!(
                "<keys><key><keyCode>cel#</keyCode><data dataType=\"short\">{}</data></key></keys>",
                c
            )
        })
        .unwrap_or_else(|| "<keys/>".to_string());
    format!(
        "<event><beginTime>2023-11-15T{}-08:00</beginTime><duration>{}</duration><code>{}</code>{}{}</event>",
        begin, duration, code, label, keys
    )
}

fn track(name: &str, events: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<eventTrack xmlns=\"http://www.egi.com/event_mff\"><name>{}</name><trackType>EVNT</trackType>{}</eventTrack>",
        name,
        events.concat()
    )
}

fn make_recording(dir: &Path, name: &str, tracks: &[(&str, String)]) -> PathBuf {
    let root = dir.join(name);
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("info.xml"), INFO).unwrap();
    fs::write(root.join("info1.xml"), INFO1).unwrap();
    for (file, content) in tracks {
        fs::write(root.join(file), content).unwrap();
    }
    root
}

fn semantics_track() -> String {
    track(
        "ECI TCP-IP 55513",
        &[
            event("10:30:00.000000", 0, "bgin", None, None),
            event("10:30:00.000000", 0, "CELL", Some("match"), Some(1)),
            event("10:30:00.000000", 0, "CELL", Some("mismatch"), Some(2)),
            event("10:30:01.000000", 500, "img+", None, Some(1)),
            event("10:30:03.000000", 300, "snd+", None, Some(2)),
            event("10:30:04.000000", 0, "Isi+", None, None),
            event("10:30:05.000000", 0, "TRSP", None, None),
        ],
    )
}

#[test]
fn reads_semantics_recording() {
    let dir = tempfile::tempdir().unwrap();
    let path = make_recording(
        dir.path(),
        "2031_semantics.mff",
        &[("Events_ECI TCP-IP 55513.xml", semantics_track())],
    );

    let config = AnnotationConfig::new()
        .map_code("img+", "image")
        .map_code("snd+", "word");
    let recording = Decoder::new().read_recording(&path, &config).unwrap();

    assert_eq!(recording.montage.as_deref(), Some("GSN-HydroCel-129"));
    assert_eq!(
        recording.meas_date.to_rfc3339(),
        "2023-11-15T18:30:00+00:00"
    );
    assert_eq!(
        recording.annotations,
        vec![
            Annotation::new(1.0, 0.5, "image_match"),
            Annotation::new(3.0, 0.3, "word_mismatch"),
        ]
    );
}

#[test]
fn tracks_are_concatenated_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let din = track(
        "DIN 1",
        &[event("10:30:00.500000", 1, "DIN8", None, None)],
    );
    let path = make_recording(
        dir.path(),
        "2031_phonemes.mff",
        &[
            ("Events_ECI TCP-IP 55513.xml", semantics_track()),
            ("Events_DIN 1.xml", din),
        ],
    );

    let recording = Decoder::new()
        .read_recording(&path, &AnnotationConfig::new())
        .unwrap();
    let descriptions: Vec<_> = recording
        .annotations
        .iter()
        .map(|a| a.description.as_str())
        .collect();
    // "Events_DIN 1.xml" sorts before "Events_ECI ..."; no merge by time
    assert_eq!(descriptions, vec!["DIN8", "img+", "snd+"]);
    assert_eq!(recording.annotations[0].onset, 0.5);
}

#[test]
fn missing_event_tracks() {
    let dir = tempfile::tempdir().unwrap();
    let path = make_recording(dir.path(), "2031_resting.mff", &[]);
    let result = Decoder::new().read_recording(&path, &AnnotationConfig::new());
    assert!(matches!(result, Err(DecoderError::MissingEvents(_))));
}

#[test]
fn ambiguous_legend_needs_selection() {
    let dir = tempfile::tempdir().unwrap();
    let second = track(
        "Second",
        &[event("10:30:00.000000", 0, "CELL", Some("Standard"), Some(1))],
    );
    let path = make_recording(
        dir.path(),
        "2031_semantics.mff",
        &[
            ("Events_ECI TCP-IP 55513.xml", semantics_track()),
            ("Events_Second.xml", second),
        ],
    );

    let config = AnnotationConfig::listen_semantics();
    let mut config_without_legend = config.clone();
    config_without_legend.conditions = None;

    let result = Decoder::new().read_recording(&path, &config_without_legend);
    assert!(matches!(result, Err(DecoderError::AmbiguousLegend(_))));

    let selected = config_without_legend.with_legend_track("ECI TCP-IP 55513");
    let recording = Decoder::new().read_recording(&path, &selected).unwrap();
    assert_eq!(recording.annotations.len(), 2);

    // An explicit legend skips discovery entirely
    let recording = Decoder::new().read_recording(&path, &config).unwrap();
    assert_eq!(recording.annotations[0].description, "image_match");
}

#[test]
fn unresolved_condition_aborts_recording() {
    let dir = tempfile::tempdir().unwrap();
    let content = track(
        "ECI",
        &[
            event("10:30:00.000000", 0, "CELL", Some("match"), Some(1)),
            event("10:30:01.000000", 500, "img+", None, Some(9)),
        ],
    );
    let path = make_recording(dir.path(), "2031_semantics.mff", &[("Events_ECI.xml", content)]);
    let config = AnnotationConfig::new().map_code("img+", "image");
    let result = Decoder::new().read_recording(&path, &config);
    assert!(matches!(
        result,
        Err(DecoderError::UnresolvedCondition { cell: Some(9), .. })
    ));
}

#[test]
fn source_offset_does_not_change_onsets() {
    let dir = tempfile::tempdir().unwrap();
    let path = make_recording(
        dir.path(),
        "2031_semantics.mff",
        &[("Events_ECI TCP-IP 55513.xml", semantics_track())],
    );
    let pacific = AnnotationConfig::listen_semantics();
    let utc = AnnotationConfig::listen_semantics().with_source_offset("+00:00");

    let a = Decoder::new().read_recording(&path, &pacific).unwrap();
    let b = Decoder::new().read_recording(&path, &utc).unwrap();
    assert_eq!(a.annotations, b.annotations);
    assert_ne!(a.meas_date, b.meas_date);
}
