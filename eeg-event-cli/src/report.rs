//! Console reports

use crate::batch::BatchSummary;
use eeg_event_decoder::studies::{Condition, SubjectFiles};
use eeg_event_decoder::Recording;
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Print a recording's header and annotation table
pub fn write_recording<W: Write>(out: &mut W, recording: &Recording) -> io::Result<()> {
    writeln!(out, "Recording: {}", recording.path.display())?;
    writeln!(out, "  Start:   {}", recording.meas_date.to_rfc3339())?;
    writeln!(
        out,
        "  Montage: {}",
        recording.montage.as_deref().unwrap_or("n/a")
    )?;
    writeln!(out, "  Events:  {}", recording.annotations.len())?;
    writeln!(out)?;
    writeln!(out, "{:>11}  {:>8}  description", "onset", "duration")?;
    for annotation in &recording.annotations {
        writeln!(out, "{}", annotation)?;
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for annotation in &recording.annotations {
        *counts.entry(annotation.description.as_str()).or_default() += 1;
    }
    if !counts.is_empty() {
        writeln!(out)?;
        for (description, count) in counts {
            writeln!(out, "  {:<24} {}", description, count)?;
        }
    }
    Ok(())
}

/// Print the outcome of a batch run
pub fn write_batch_summary<W: Write>(out: &mut W, summary: &BatchSummary) -> io::Result<()> {
    writeln!(out, "Written: {}", summary.written.len())?;
    for path in &summary.written {
        writeln!(out, "  {}", path.display())?;
    }
    writeln!(out, "Skipped: {}", summary.skipped.len())?;
    for (label, reason) in &summary.skipped {
        writeln!(out, "  {}: {}", label, reason)?;
    }
    Ok(())
}

/// Print Semantics subjects and their condition files
pub fn write_semantics_subjects<W: Write>(
    out: &mut W,
    subjects: &BTreeMap<String, SubjectFiles>,
) -> io::Result<()> {
    for (subject, files) in subjects {
        writeln!(out, "{}", subject)?;
        for condition in [Condition::Match, Condition::Mismatch] {
            let path = files
                .get(condition)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "missing".to_string());
            writeln!(
                out,
                "  {:<9} ({}) {}",
                condition.as_str(),
                condition.event_id(),
                path
            )?;
        }
    }
    Ok(())
}
