//! Line-oriented helpers for address-list files.
//!
//! One hex identity per line (`0x` prefix optional). Blank lines and lines
//! starting with `#` are skipped; `\r\n` endings are accepted so spreadsheet
//! exports load unchanged.
//!
//! - **Reader**: [`IdentityLines`] *owns* its underlying reader and yields
//!   `Result<Identity>` so callers can surface per-line errors with a line
//!   number.
//! - **Writer**: [`write_identity_list`] emits the canonical text form.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::io::ensure_parent_dir;
use crate::Identity;

/// Owning iterator over identities in a line-delimited source.
pub struct IdentityLines<R> {
    rdr: R,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> IdentityLines<R> {
    /// Wrap any buffered reader.
    pub fn new(rdr: R) -> Self {
        Self {
            rdr,
            buf: String::with_capacity(64),
            line_no: 0,
        }
    }
}

impl IdentityLines<BufReader<File>> {
    /// Open a file for streaming.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path.as_ref())
            .with_context(|| format!("open {}", path.as_ref().display()))?;
        Ok(Self::new(BufReader::new(f)))
    }
}

impl<R: BufRead> Iterator for IdentityLines<R> {
    type Item = Result<Identity>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.rdr.read_line(&mut self.buf) {
                Ok(0) => return None, // EOF
                Ok(_) => {
                    self.line_no += 1;
                    let line = self.buf.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    let parsed = line
                        .parse::<Identity>()
                        .with_context(|| format!("parse address on line {}", self.line_no));
                    return Some(parsed);
                }
                Err(e) => {
                    return Some(Err(e).with_context(|| format!("read line {}", self.line_no + 1)))
                }
            }
        }
    }
}

/// Read every identity from an address-list file, failing on the first bad line.
pub fn read_identity_list<P: AsRef<Path>>(path: P) -> Result<Vec<Identity>> {
    IdentityLines::open(path)?.collect()
}

/// Write identities one per line in canonical `0x…` form.
pub fn write_identity_list<P: AsRef<Path>>(path: P, ids: &[Identity]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    for id in ids {
        writeln!(w, "{id}").context("write address line")?;
    }
    w.flush().context("flush writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn skips_blanks_and_comments() {
        let src = "# campaign list\r\n\
                   0x0101010101010101010101010101010101010101\r\n\
                   \r\n\
                   0202020202020202020202020202020202020202\n";
        let ids: Vec<Identity> = IdentityLines::new(Cursor::new(src))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            ids,
            vec![Identity::new([1u8; 20]), Identity::new([2u8; 20])]
        );
    }

    #[test]
    fn reports_line_number() {
        let src = "0x0101010101010101010101010101010101010101\n0xdead\n";
        let err = IdentityLines::new(Cursor::new(src))
            .collect::<Result<Vec<_>>>()
            .unwrap_err();
        assert!(format!("{err:#}").contains("line 2"), "{err:#}");
    }

    #[test]
    fn write_then_read_file() {
        let mut p = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("mintgate_core_lines_{nanos}.txt"));
        let ids = vec![Identity::new([0xaau8; 20]), Identity::new([0x0bu8; 20])];
        write_identity_list(&p, &ids).unwrap();
        assert_eq!(read_identity_list(&p).unwrap(), ids);
        let _ = std::fs::remove_file(p);
    }
}
