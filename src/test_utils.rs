use std::io::Write;
use tempfile::NamedTempFile;

/// Write each line followed by a newline into a fresh temporary file
pub fn write_lines(lines: &[&str]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(temp_file, "{}", line).unwrap();
    }
    temp_file.flush().unwrap();
    temp_file
}

/// Append lines to an existing temporary file, as a log writer would
pub fn append_lines(temp_file: &NamedTempFile, lines: &[&str]) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(temp_file.path())
        .unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
}
