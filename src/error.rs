use thiserror::Error;

#[derive(Error, Debug)]
pub enum BufferError {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("buffer is not updatable")]
  ReadOnly,

  #[error("unsupported integer width: {0}")]
  InvalidWidth(usize),

  #[error("value {value:#x} does not fit in {width} bytes")]
  ValueTooLarge { value: u32, width: usize },

  // Writes may overwrite inside the tail or append exactly at it, nothing else.
  #[error("cannot write {width} bytes at {pos}, tail is {tail}")]
  OutOfBounds { pos: usize, width: usize, tail: usize },

  #[error("additional buffer would grow to {requested} bytes, limit is {max}")]
  CapacityExceeded { requested: usize, max: usize },

  #[error("cannot derive a file name from '{0}'")]
  InvalidPath(std::path::PathBuf),
}

#[derive(Error, Debug)]
pub enum TableError {
  #[error("invalid terminal id: {0}")]
  InvalidTerminalId(i32),

  // The biased value is negative or collides with the sentinel.
  #[error("position {position} for terminal {id} is out of range with header region size {header_region_size}")]
  PositionOutOfRange {
    id: i32,
    position: i64,
    header_region_size: i32,
  },

  #[error("table is {len} bytes, not a multiple of the {width} byte record size")]
  MisalignedTable { len: usize, width: usize },

  #[error(transparent)]
  Buffer(#[from] BufferError),

  #[error("cannot rebase terminal {id} to position {position}")]
  RebaseFailed {
    id: i32,
    position: i64,
    #[source]
    source: Box<TableError>,
  },
}
