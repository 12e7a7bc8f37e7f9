//! Delimited-text helpers shared by the table writers.
//!
//! All output files are UTF-8 with a leading byte-order mark so that
//! spreadsheet software picks the right encoding.

use crate::error::Result;
use csv::{Writer, WriterBuilder};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writer handed to table fill functions.
pub type StagingWriter<'a> = Writer<&'a mut BufWriter<NamedTempFile>>;

/// Strip a leading byte-order mark from a header cell.
pub fn strip_bom(cell: &str) -> &str {
    cell.trim_start_matches('\u{feff}')
}

/// Wrap a sink in a CSV writer, emitting the BOM first.
pub fn bom_writer<W: Write>(mut sink: W) -> Result<Writer<W>> {
    sink.write_all(UTF8_BOM)?;
    Ok(WriterBuilder::new().from_writer(sink))
}

/// A complete table held in a temporary file next to its destination.
///
/// Dropping it without `commit` removes the temporary file and leaves the
/// destination untouched.
#[derive(Debug)]
pub struct StagedCsv {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl StagedCsv {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the staged file over its destination.
    pub fn commit(self) -> Result<()> {
        self.tmp.persist(&self.path)?;
        Ok(())
    }
}

/// Write a table into a temporary file in the destination directory.
pub fn stage_csv<P, F>(path: P, fill: F) -> Result<StagedCsv>
where
    P: AsRef<Path>,
    F: FnOnce(&mut StagingWriter<'_>) -> Result<()>,
{
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut sink = BufWriter::new(NamedTempFile::new_in(dir)?);
    {
        let mut writer = bom_writer(&mut sink)?;
        fill(&mut writer)?;
        writer.flush()?;
    }
    let tmp = sink.into_inner().map_err(|e| e.into_error())?;
    tmp.as_file().sync_all()?;
    Ok(StagedCsv {
        tmp,
        path: path.to_path_buf(),
    })
}

/// Write a CSV file so that readers only ever see the old or the complete
/// new content.
pub fn write_csv_atomic<P, F>(path: P, fill: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut StagingWriter<'_>) -> Result<()>,
{
    stage_csv(path, fill)?.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_bom_written() {
        let mut buf = Vec::new();
        {
            let mut w = bom_writer(&mut buf).unwrap();
            w.write_record(["a", "b"]).unwrap();
            w.flush().unwrap();
        }
        assert!(buf.starts_with(UTF8_BOM));
        assert_eq!(&buf[UTF8_BOM.len()..], b"a,b\n");
    }

    #[test]
    fn test_atomic_write_replaces_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        std::fs::write(&path, "old").unwrap();

        write_csv_atomic(&path, |w| {
            w.write_record(["x", "1"])?;
            Ok(())
        })
        .unwrap();

        let content = std::fs::read(&path).unwrap();
        assert!(content.starts_with(UTF8_BOM));
        assert_eq!(&content[UTF8_BOM.len()..], b"x,1\n");
        // Only the destination remains in the directory.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_table_leaves_destinations_untouched() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        std::fs::write(&first, "old first").unwrap();
        std::fs::write(&second, "old second").unwrap();

        let staged = stage_csv(&first, |w| {
            w.write_record(["new", "1"])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(staged.path(), first.as_path());

        let err = stage_csv(&second, |_| {
            Err(crate::error::QpcrError::EmptyData("nothing to write".to_string()))
        });
        assert!(err.is_err());
        drop(staged);

        assert_eq!(std::fs::read_to_string(&first).unwrap(), "old first");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "old second");
        // No temporary files are left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom("\u{feff}taxa"), "taxa");
        assert_eq!(strip_bom("taxa"), "taxa");
    }
}
