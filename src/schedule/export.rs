use crate::error::Result;
use crate::schedule::Schedule;
use csv::{Terminator, WriterBuilder};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Writes `<dir>/<name>.csv` for every schedule, one title per row.
pub fn export_schedules(
    schedules: &[Schedule],
    dir: &Path,
    overwrite: bool,
) -> Result<ExportSummary> {
    fs::create_dir_all(dir)?;

    let mut summary = ExportSummary::default();
    for schedule in schedules {
        let path = dir.join(format!("{}.csv", schedule.name));
        if !overwrite && path.exists() {
            summary.skipped.push(path);
            continue;
        }

        write_csv(schedule, File::create(&path)?)?;
        summary.written.push(path);
    }

    Ok(summary)
}

/// `Title` header, then one row per title, CRLF-terminated.
pub fn write_csv<W: Write>(schedule: &Schedule, out: W) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(out);

    writer.write_record(["Title"])?;
    for title in schedule.titles() {
        writer.write_record([title])?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{export_schedules, write_csv};
    use crate::schedule::Schedule;
    use std::fs;

    #[test]
    fn quotes_titles_with_commas_and_quotes() {
        let schedule = Schedule::new(
            "Quoting",
            ["Paris, Texas", "The \"Bicycle\" Thief", "Yi Yi"],
        );

        let mut out = Vec::new();
        write_csv(&schedule, &mut out).expect("write csv");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "Title\r\n\"Paris, Texas\"\r\n\"The \"\"Bicycle\"\" Thief\"\r\nYi Yi\r\n"
        );
    }

    #[test]
    fn keeps_existing_files_unless_overwriting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let schedules = vec![Schedule::new("Kept", ["Harakiri"])];
        let target = dir.path().join("Kept.csv");
        fs::write(&target, "hand edited").expect("seed file");

        let summary = export_schedules(&schedules, dir.path(), false).expect("export");
        assert_eq!(summary.skipped, vec![target.clone()]);
        assert_eq!(fs::read_to_string(&target).expect("read"), "hand edited");

        let summary = export_schedules(&schedules, dir.path(), true).expect("export");
        assert_eq!(summary.written, vec![target.clone()]);
        assert_eq!(
            fs::read_to_string(&target).expect("read"),
            "Title\r\nHarakiri\r\n"
        );
    }
}
