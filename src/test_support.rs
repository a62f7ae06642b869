use std::{fs::File, io::Write, path::Path};

use zip::{ZipWriter, write::SimpleFileOptions};

pub enum Entry<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
}

/// Write a zip archive with the given entries, in order.
pub fn write_zip(path: &Path, entries: &[Entry<'_>]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for entry in entries {
        match entry {
            Entry::Dir(name) => zip.add_directory(*name, SimpleFileOptions::default()).unwrap(),
            Entry::File(name, bytes) => {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(bytes).unwrap();
            }
        }
    }
    zip.finish().unwrap();
}
