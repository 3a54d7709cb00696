use chrono::NaiveDateTime;
use std::io::BufRead as _;
use std::path::Path;

/// Marker the migration job logs when it begins moving data.
const START_MARKER: &str = "Starting database migration";
/// Marker logged once the target has caught up and traffic is switched.
const COMPLETE_MARKER: &str = "Database migration completed";

/// Server logs lead with a fixed-width timestamp field.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIMESTAMP_WIDTH: usize = 19;

/// Extract the migration duration in seconds from a run's server log.
///
/// Scans for the first line carrying the start marker and the first line
/// carrying the complete marker; each match is the first occurrence of its
/// own pattern, the two are not required to be ordered. Returns `None` when
/// the file is missing, either marker is absent, or either leading timestamp
/// does not parse — "no migration measured" is distinct from a measured
/// duration of zero.
pub fn migration_duration_seconds(path: impl AsRef<Path>) -> Option<f64> {
    let path = path.as_ref();
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) => {
            log::debug!("No migration log at {}: {e}", path.display());
            return None;
        }
    };

    duration_from_reader(file, &path.display().to_string())
}

fn duration_from_reader(reader: impl std::io::Read, origin: &str) -> Option<f64> {
    let mut start_line: Option<String> = None;
    let mut complete_line: Option<String> = None;

    for line in std::io::BufReader::new(reader).lines().map_while(Result::ok) {
        if start_line.is_none() && line.contains(START_MARKER) {
            start_line = Some(line);
        } else if complete_line.is_none() && line.contains(COMPLETE_MARKER) {
            complete_line = Some(line);
        }
        if start_line.is_some() && complete_line.is_some() {
            break;
        }
    }

    let start = parse_leading_timestamp(start_line.as_deref()?)?;
    let complete = parse_leading_timestamp(complete_line.as_deref()?)?;

    let duration = (complete - start).num_milliseconds() as f64 / 1000.0;
    if duration < 0.0 {
        // markers matched out of file order; surface the value but flag it
        log::warn!("Migration markers out of order in {origin}: duration {duration}s");
    }
    Some(duration)
}

fn parse_leading_timestamp(line: &str) -> Option<NaiveDateTime> {
    let field = line.get(..TIMESTAMP_WIDTH)?;
    NaiveDateTime::parse_from_str(field, TIMESTAMP_FORMAT).ok()
}
