//! Manifest-driven batch export
//!
//! Recordings are processed one at a time, in manifest order. A designated set
//! of conditions skips a row with a warning; any other failure aborts the run.

use anyhow::{Context, Result};
use eeg_event_decoder::{
    write_events_tsv, AnnotationConfig, BidsPath, Decoder, DecoderError, EventIdMap,
    ManifestRow, Task,
};
use std::path::{Path, PathBuf};

/// Row selection and output policy for a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub subject: Option<String>,
    pub session: Option<String>,
    pub task: Option<Task>,
    pub overwrite: bool,
}

impl BatchFilter {
    fn selects(&self, row: &ManifestRow) -> bool {
        if let Some(subject) = &self.subject {
            if &row.subject != subject {
                return false;
            }
        }
        if let Some(session) = &self.session {
            if eeg_event_decoder::manifest::pad_session(session) != row.session_label() {
                return false;
            }
        }
        true
    }
}

/// Reasons a manifest row is skipped rather than failing the run
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("no task label")]
    MissingTask,

    #[error("only the {0} task was requested")]
    OtherTask(Task),

    #[error("output already exists at {0:?}")]
    AlreadyProcessed(PathBuf),

    #[error("{0}")]
    MissingEvents(DecoderError),
}

/// Outcome of one batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<(String, SkipReason)>,
}

/// Runs the export over manifest rows
pub struct BatchRunner<'a> {
    decoder: &'a Decoder,
    annotations: &'a AnnotationConfig,
    event_ids: &'a EventIdMap,
    bids_root: PathBuf,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        decoder: &'a Decoder,
        annotations: &'a AnnotationConfig,
        event_ids: &'a EventIdMap,
        bids_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            decoder,
            annotations,
            event_ids,
            bids_root: bids_root.into(),
        }
    }

    /// Events table location of a row
    pub fn output_path(&self, row: &ManifestRow, task: Task) -> PathBuf {
        match &row.destfile {
            Some(dest) => dest.clone(),
            None => BidsPath::new(&self.bids_root, &row.subject, &row.session, task.as_str())
                .with_suffix("events")
                .file_path(".tsv"),
        }
    }

    pub fn run(&self, rows: &[ManifestRow], filter: &BatchFilter) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        for row in rows.iter().filter(|r| filter.selects(r)) {
            let label = format!("sub-{}_ses-{}", row.subject, row.session_label());
            match self.process_row(row, filter)? {
                Ok(path) => summary.written.push(path),
                Err(reason) => {
                    log::warn!("SKIPPING: {} because {}", label, reason);
                    summary.skipped.push((label, reason));
                }
            }
        }

        log::info!(
            "Batch finished: {} written, {} skipped",
            summary.written.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }

    /// Outer error aborts the run; inner error skips the row
    fn process_row(
        &self,
        row: &ManifestRow,
        filter: &BatchFilter,
    ) -> Result<std::result::Result<PathBuf, SkipReason>> {
        let Some(task) = row.task else {
            return Ok(Err(SkipReason::MissingTask));
        };
        if let Some(wanted) = filter.task {
            if wanted != task {
                return Ok(Err(SkipReason::OtherTask(wanted)));
            }
        }

        let output = self.output_path(row, task);
        if output.exists() && !filter.overwrite {
            return Ok(Err(SkipReason::AlreadyProcessed(output)));
        }

        log::info!(
            "Processing sub-{}_ses-{}_task-{}",
            row.subject,
            row.session_label(),
            task
        );
        let recording = match self.decoder.read_recording(&row.sourcefile, self.annotations) {
            Ok(recording) => recording,
            Err(e @ DecoderError::MissingEvents(_)) => {
                return Ok(Err(SkipReason::MissingEvents(e)));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {:?}", row.sourcefile));
            }
        };

        write_events(&output, &recording.annotations, self.event_ids)?;
        Ok(Ok(output))
    }
}

fn write_events(
    path: &Path,
    annotations: &[eeg_event_decoder::Annotation],
    event_ids: &EventIdMap,
) -> Result<()> {
    write_events_tsv(path, annotations, event_ids)
        .with_context(|| format!("Failed to write events to {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const INFO: &str = "<fileInfo><recordTime>2023-11-15T10:30:00.000000-08:00</recordTime></fileInfo>";

    fn track(events: &str) -> String {
        format!("<eventTrack><name>ECI</name>{}</eventTrack>", events)
    }

    fn ev(secs: u32, code: &str, label: &str, cell: &str) -> String {
        format!(
            "<event><beginTime>2023-11-15T10:30:{:02}.000000-08:00</beginTime><duration>500</duration>\
             <code>{}</code><label>{}</label>\
             <keys><key><keyCode>cel#</keyCode><data>{}</data></key></keys></event>",
            secs, code, label, cell
        )
    }

    fn recording(dir: &Path, name: &str, events: Option<&str>) -> PathBuf {
        let root = dir.join(name);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("info.xml"), INFO).unwrap();
        if let Some(events) = events {
            fs::write(root.join("Events_ECI.xml"), track(events)).unwrap();
        }
        root
    }

    fn row(source: PathBuf, subject: &str, session: &str, task: Option<Task>) -> ManifestRow {
        ManifestRow {
            sourcefile: source,
            subject: subject.to_string(),
            session: session.to_string(),
            task,
            destfile: None,
        }
    }

    #[test]
    fn test_batch_writes_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let events = [ev(0, "CELL", "match", "1"), ev(1, "img+", "", "1")].concat();
        let good = recording(dir.path(), "2031_semantics.mff", Some(&events));
        let empty = recording(dir.path(), "2032_semantics.mff", None);
        let resting = recording(dir.path(), "2033_resting.mff", Some(&events));

        let rows = vec![
            row(good.clone(), "2031", "1", Some(Task::Semantics)),
            row(empty, "2032", "1", Some(Task::Semantics)),
            row(resting, "2033", "1", Some(Task::Resting)),
            row(good, "2034", "1", None),
        ];

        let decoder = Decoder::new();
        let config = AnnotationConfig::listen_semantics();
        let ids = eeg_event_decoder::listen_event_ids();
        let bids_root = dir.path().join("data").join("bids");
        let runner = BatchRunner::new(&decoder, &config, &ids, &bids_root);
        let filter = BatchFilter {
            task: Some(Task::Semantics),
            ..Default::default()
        };

        let summary = runner.run(&rows, &filter).unwrap();
        assert_eq!(summary.written.len(), 1);
        assert_eq!(summary.skipped.len(), 3);
        let written = fs::read_to_string(&summary.written[0]).unwrap();
        assert!(written.contains("image_match\t1"));

        // Second run finds the output and skips it
        let again = runner.run(&rows[..1], &filter).unwrap();
        assert!(again.written.is_empty());
        assert!(matches!(again.skipped[0].1, SkipReason::AlreadyProcessed(_)));

        let overwrite = BatchFilter {
            overwrite: true,
            ..filter
        };
        let forced = runner.run(&rows[..1], &overwrite).unwrap();
        assert_eq!(forced.written.len(), 1);
    }

    #[test]
    fn test_unresolved_condition_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let events = [ev(0, "CELL", "match", "1"), ev(1, "img+", "", "5")].concat();
        let bad = recording(dir.path(), "2031_semantics.mff", Some(&events));
        let rows = vec![row(bad, "2031", "1", Some(Task::Semantics))];

        let decoder = Decoder::new();
        let mut config = AnnotationConfig::listen_semantics();
        config.conditions = None;
        let ids = eeg_event_decoder::listen_event_ids();
        let runner = BatchRunner::new(&decoder, &config, &ids, dir.path().join("bids"));

        assert!(runner.run(&rows, &BatchFilter::default()).is_err());
    }

    #[test]
    fn test_filter_by_subject_and_session() {
        let filter = BatchFilter {
            subject: Some("2031".to_string()),
            session: Some("2".to_string()),
            ..Default::default()
        };
        let a = row(PathBuf::from("a.mff"), "2031", "02", Some(Task::Resting));
        let b = row(PathBuf::from("b.mff"), "2031", "1", Some(Task::Resting));
        let c = row(PathBuf::from("c.mff"), "2040", "2", Some(Task::Resting));
        assert!(filter.selects(&a));
        assert!(!filter.selects(&b));
        assert!(!filter.selects(&c));
    }
}
