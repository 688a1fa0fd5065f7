//! A directory on the host standing in for the SD card.

use rocket_core::RemovableStorage;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

pub struct DirectoryCard {
    root: PathBuf,
}

impl DirectoryCard {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

pub struct DirectoryFile {
    writer: BufWriter<File>,
    // `fmt::Error` carries no detail, so the io error is kept for close.
    error: Option<io::Error>,
}

impl fmt::Write for DirectoryFile {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.error.is_some() {
            return Err(fmt::Error);
        }
        self.writer.write_all(s.as_bytes()).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }
}

impl RemovableStorage for DirectoryCard {
    type Error = io::Error;
    type File = DirectoryFile;

    fn init(&mut self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    fn file_exists(&mut self, name: &str) -> bool {
        self.root.join(name).exists()
    }

    fn create_file(&mut self, name: &str) -> io::Result<DirectoryFile> {
        let file = File::create(self.root.join(name))?;
        Ok(DirectoryFile {
            writer: BufWriter::new(file),
            error: None,
        })
    }

    fn close_file(&mut self, mut file: DirectoryFile) -> io::Result<()> {
        if let Some(e) = file.error.take() {
            return Err(e);
        }
        file.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rocket-sitl-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_files_land_in_directory() {
        let dir = scratch_dir("card");
        let mut card = DirectoryCard::new(&dir);
        card.init().unwrap();
        assert!(!card.file_exists("Log_0.csv"));

        let mut file = card.create_file("Log_0.csv").unwrap();
        writeln!(file, "TIME,ALTITUDE").unwrap();
        card.close_file(file).unwrap();

        assert!(card.file_exists("Log_0.csv"));
        assert_eq!(
            fs::read_to_string(dir.join("Log_0.csv")).unwrap(),
            "TIME,ALTITUDE\n"
        );
        fs::remove_dir_all(dir).unwrap();
    }
}
