// Single file dictionary content: one buffer per (directory, extension) pair.
// The file for a directory `foo/bar` with extension `.tat` is `foo/bar/bar.tat`.

use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use memmap::{Mmap, MmapOptions};
use tracing::debug;

use crate::buffer::{AddressBuffer, ExtendableBuffer};
use crate::constants::TEMP_FILE_SUFFIX;
use crate::error::BufferError;

pub fn content_file_path(dict_dir: &Path, extension: &str) -> Result<PathBuf, BufferError> {
  let name = dict_dir
    .file_name()
    .and_then(|n| n.to_str())
    .ok_or_else(|| BufferError::InvalidPath(dict_dir.to_path_buf()))?;
  Ok(dict_dir.join(format!("{}{}", name, extension)))
}

#[derive(Debug, Default)]
pub struct SingleDictContent {
  buffer: ExtendableBuffer,
}

impl SingleDictContent {
  pub fn new() -> SingleDictContent {
    SingleDictContent {
      buffer: ExtendableBuffer::new(),
    }
  }

  pub fn from_buffer(buffer: ExtendableBuffer) -> SingleDictContent {
    SingleDictContent { buffer }
  }

  // Maps an existing content file. Updatable content gets a private mapping
  // so that nothing reaches disk until `flush`.
  pub fn open(
    dict_dir: &Path,
    extension: &str,
    updatable: bool,
  ) -> Result<SingleDictContent, BufferError> {
    let path = content_file_path(dict_dir, extension)?;
    let file = OpenOptions::new().read(true).open(&path)?;
    let len = file.metadata()?.len();

    // Zero length files can't be mapped
    let buffer = if len == 0 {
      ExtendableBuffer::from_bytes(Vec::new(), updatable)
    } else if updatable {
      ExtendableBuffer::copy_on_write(unsafe { MmapOptions::new().map_copy(&file) }?)
    } else {
      ExtendableBuffer::mapped(unsafe { Mmap::map(&file) }?)
    };
    debug!(path = %path.display(), len, updatable, "opened dict content");
    Ok(SingleDictContent { buffer })
  }

  pub fn buffer(&self) -> &ExtendableBuffer {
    &self.buffer
  }

  pub fn writable_buffer(&mut self) -> &mut ExtendableBuffer {
    &mut self.buffer
  }

  // Writes the whole buffer next to the target and renames it into place,
  // so the target is either replaced or left as it was.
  pub fn flush(&self, dict_dir: &Path, extension: &str) -> Result<(), BufferError> {
    fs::create_dir_all(dict_dir)?;
    let path = content_file_path(dict_dir, extension)?;
    let mut tmp_name = path.clone().into_os_string();
    tmp_name.push(TEMP_FILE_SUFFIX);
    let tmp_path = PathBuf::from(tmp_name);

    let file = File::create(&tmp_path)?;
    let mut writer = BufWriter::new(file);
    self.buffer.write_to(writer.by_ref())?;
    let file = writer.into_inner().map_err(|e| BufferError::Io(e.into_error()))?;
    file.sync_all()?;
    fs::rename(&tmp_path, &path)?;

    debug!(
      path = %path.display(),
      len = self.buffer.tail_position(),
      "flushed dict content"
    );
    Ok(())
  }
}

#[cfg(test)]
pub mod tests {
  use super::*;

  #[test]
  pub fn path_is_inside_directory() {
    let path = content_file_path(Path::new("/data/main_en"), ".tat").unwrap();
    assert_eq!(path, PathBuf::from("/data/main_en/main_en.tat"));
    assert!(content_file_path(Path::new("/"), ".tat").is_err());
  }

  #[test]
  pub fn flush_then_open() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("dict");

    let mut content = SingleDictContent::new();
    let mut pos = 0;
    for v in &[5u32, 6, 7] {
      content.writable_buffer().write_uint_and_advance(*v, 2, &mut pos).unwrap();
    }
    content.flush(&dir, ".ext").unwrap();
    assert_eq!(
      fs::read(dir.join("dict.ext")).unwrap(),
      vec![0, 5, 0, 6, 0, 7]
    );
    assert!(!dir.join("dict.ext.tmp").exists());

    let ro = SingleDictContent::open(&dir, ".ext", false).unwrap();
    assert!(!ro.buffer().is_updatable());
    assert_eq!(ro.buffer().read_uint(2, 4), 7);

    let mut rw = SingleDictContent::open(&dir, ".ext", true).unwrap();
    rw.writable_buffer().write_uint(9, 2, 0).unwrap();
    rw.writable_buffer().write_uint(8, 2, 6).unwrap();
    // Flushing over the file it was mapped from
    rw.flush(&dir, ".ext").unwrap();
    drop(rw);
    assert_eq!(
      fs::read(dir.join("dict.ext")).unwrap(),
      vec![0, 9, 0, 6, 0, 7, 0, 8]
    );
  }

  #[test]
  pub fn open_empty_and_missing() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("d");
    assert!(matches!(
      SingleDictContent::open(&dir, ".ext", true),
      Err(BufferError::Io(_))
    ));

    fs::create_dir_all(&dir).unwrap();
    File::create(dir.join("d.ext")).unwrap();
    let content = SingleDictContent::open(&dir, ".ext", true).unwrap();
    assert_eq!(content.buffer().tail_position(), 0);
    assert!(content.buffer().is_updatable());
  }
}
