//! Plain-text log written by the validation runner.
use std::io::{self, Write};
use std::path::Path;

use chrono::NaiveDateTime;

const HEADER_RULE_WIDTH: usize = 60;

pub struct ValidationLog<W: Write> {
    out: W,
}

impl<W: Write> ValidationLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn header(&mut self, timestamp: NaiveDateTime, directory: &Path) -> io::Result<()> {
        writeln!(
            self.out,
            "Validation Log - {}",
            timestamp.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(self.out, "Directory: {}", directory.display())?;
        writeln!(self.out, "{}\n", "=".repeat(HEADER_RULE_WIDTH))
    }

    pub fn no_files(&mut self) -> io::Result<()> {
        writeln!(self.out, "No files found in the directory.")
    }

    pub fn validating(&mut self, file_name: &str) -> io::Result<()> {
        writeln!(self.out, "Validating: {}", file_name)
    }

    /// `code` is `None` when the validator was killed by a signal
    pub fn result(&mut self, code: Option<i32>, stdout: &str, stderr: &str) -> io::Result<()> {
        match code {
            Some(c) => writeln!(self.out, "Return code: {}", c)?,
            None => writeln!(self.out, "Return code: signal")?,
        }
        writeln!(self.out, "STDOUT:")?;
        self.out
            .write_all(if stdout.is_empty() { "No output\n" } else { stdout }.as_bytes())?;
        writeln!(self.out, "STDERR:")?;
        self.out
            .write_all(if stderr.is_empty() { "No errors\n" } else { stderr }.as_bytes())?;
        self.separator()
    }

    pub fn spawn_error(&mut self, validator: &str, err: &io::Error) -> io::Result<()> {
        writeln!(self.out, "Error executing {}: {}", validator, err)?;
        self.separator()
    }

    fn separator(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}\n", "-".repeat(HEADER_RULE_WIDTH))
    }

    pub fn completed(mut self) -> io::Result<W> {
        writeln!(self.out, "Validation completed.")?;
        self.out.flush()?;
        Ok(self.out)
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 31)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap()
    }

    #[test]
    fn full_layout() {
        let mut log = ValidationLog::new(Vec::new());
        log.header(timestamp(), Path::new("/data/cogs")).unwrap();
        log.validating("a.tif").unwrap();
        log.result(Some(0), "a.tif is a valid cloud optimized GeoTIFF\n", "")
            .unwrap();
        log.validating("b.tif").unwrap();
        log.result(None, "", "killed\n").unwrap();
        let text = String::from_utf8(log.completed().unwrap()).unwrap();

        let rule = "-".repeat(60);
        let expected = format!(
            "Validation Log - 2025-01-31 09:05:07\n\
             Directory: /data/cogs\n\
             {}\n\n\
             Validating: a.tif\n\
             Return code: 0\n\
             STDOUT:\n\
             a.tif is a valid cloud optimized GeoTIFF\n\
             STDERR:\n\
             No errors\n\
             {rule}\n\n\
             Validating: b.tif\n\
             Return code: signal\n\
             STDOUT:\n\
             No output\n\
             STDERR:\n\
             killed\n\
             {rule}\n\n\
             Validation completed.\n",
            "=".repeat(60),
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn spawn_error_line() {
        let mut log = ValidationLog::new(Vec::new());
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file or directory");
        log.spawn_error("validate.py", &err).unwrap();
        let text = String::from_utf8(log.finish().unwrap()).unwrap();
        assert!(text.starts_with("Error executing validate.py: No such file or directory\n"));
        assert!(text.ends_with(&format!("{}\n\n", "-".repeat(60))));
    }
}
