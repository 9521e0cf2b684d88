// Terminal id -> PtNode position table.
//
// Flat array of TERMINAL_ADDRESS_TABLE_ADDRESS_SIZE byte records, record i at i * size.
// A record holds position + header region size, or NOT_A_TERMINAL_ADDRESS if the
// id has been allocated but not assigned.
//
//   | id 0 | id 1 | id 2 | ... | id size-1 |   <- tail
//
// Assigning an id past the end fills every skipped record with the sentinel.

use std::convert::TryFrom;
use std::path::Path;

use tracing::{debug, error, warn};

use crate::buffer::{AddressBuffer, ExtendableBuffer};
use crate::constants::{
  NOT_A_DICT_POS, NOT_A_TERMINAL_ADDRESS, TERMINAL_ADDRESS_TABLE_ADDRESS_SIZE,
  TERMINAL_ADDRESS_TABLE_FILE_EXTENSION,
};
use crate::dict_content::SingleDictContent;
use crate::error::TableError;

const ADDRESS_SIZE: usize = TERMINAL_ADDRESS_TABLE_ADDRESS_SIZE;

#[derive(Debug)]
pub struct TerminalPositionLookupTable {
  content: SingleDictContent,
  size: usize,
  header_region_size: i32,
}

impl Default for TerminalPositionLookupTable {
  fn default() -> Self {
    TerminalPositionLookupTable::new()
  }
}

impl TerminalPositionLookupTable {
  // Empty, updatable, in-memory table with no header bias.
  pub fn new() -> TerminalPositionLookupTable {
    TerminalPositionLookupTable::with_header_region_size(0)
  }

  pub fn with_header_region_size(header_region_size: i32) -> TerminalPositionLookupTable {
    TerminalPositionLookupTable {
      content: SingleDictContent::new(),
      size: 0,
      header_region_size,
    }
  }

  // Wraps existing content, the size comes from its tail position.
  pub fn from_content(
    content: SingleDictContent,
    header_region_size: i32,
  ) -> Result<TerminalPositionLookupTable, TableError> {
    let len = content.buffer().tail_position();
    if len % ADDRESS_SIZE != 0 {
      return Err(TableError::MisalignedTable {
        len,
        width: ADDRESS_SIZE,
      });
    }
    Ok(TerminalPositionLookupTable {
      content,
      size: len / ADDRESS_SIZE,
      header_region_size,
    })
  }

  pub fn open(
    dict_dir: &Path,
    updatable: bool,
    header_region_size: i32,
  ) -> Result<TerminalPositionLookupTable, TableError> {
    let content =
      SingleDictContent::open(dict_dir, TERMINAL_ADDRESS_TABLE_FILE_EXTENSION, updatable)?;
    let table = TerminalPositionLookupTable::from_content(content, header_region_size)?;
    debug!(
      dir = %dict_dir.display(),
      size = table.size,
      header_region_size,
      "opened terminal position lookup table"
    );
    Ok(table)
  }

  pub fn size(&self) -> usize {
    self.size
  }

  pub fn is_empty(&self) -> bool {
    self.size == 0
  }

  pub fn header_region_size(&self) -> i32 {
    self.header_region_size
  }

  pub fn is_updatable(&self) -> bool {
    self.content.buffer().is_updatable()
  }

  // The id to hand to the next new terminal PtNode.
  pub fn next_terminal_id(&self) -> i32 {
    self.id_bound()
  }

  // Ids are i32, a table mapped from a file can in principle hold more records
  fn id_bound(&self) -> i32 {
    i32::try_from(self.size).unwrap_or(i32::MAX)
  }

  // None if the id is out of range or has not been assigned a position.
  pub fn terminal_pt_node_position(&self, terminal_id: i32) -> Option<i32> {
    if terminal_id < 0 || terminal_id as usize >= self.size {
      return None;
    }
    let value = self
      .content
      .buffer()
      .read_uint(ADDRESS_SIZE, entry_pos(terminal_id as usize));
    if value == NOT_A_TERMINAL_ADDRESS {
      None
    } else {
      Some((value as i64 - self.header_region_size as i64) as i32)
    }
  }

  pub fn terminal_pt_node_position_or_sentinel(&self, terminal_id: i32) -> i32 {
    self
      .terminal_pt_node_position(terminal_id)
      .unwrap_or(NOT_A_DICT_POS)
  }

  // Every materialized id in order, with its position if it has one.
  pub fn iter(&self) -> impl Iterator<Item = (i32, Option<i32>)> + '_ {
    (0..self.id_bound()).map(move |id| (id, self.terminal_pt_node_position(id)))
  }

  pub fn set_terminal_pt_node_position(
    &mut self,
    terminal_id: i32,
    terminal_pt_node_pos: i32,
  ) -> Result<(), TableError> {
    if terminal_id < 0 {
      return Err(TableError::InvalidTerminalId(terminal_id));
    }
    let value = self.biased(terminal_id, terminal_pt_node_pos as i64)?;
    let terminal_id = terminal_id as usize;
    if terminal_id >= self.size {
      self.grow_to(terminal_id)?;
    }
    self
      .content
      .writable_buffer()
      .write_uint(value, ADDRESS_SIZE, entry_pos(terminal_id))
      .map_err(|e| {
        warn!(terminal_id, error = %e, "cannot write terminal position");
        TableError::from(e)
      })
  }

  // Writes the table into `dict_dir`. If the header region size changed the
  // stored values are rebased into a new table first and that is written instead.
  pub fn flush_to_file(
    &self,
    dict_dir: &Path,
    new_header_region_size: i32,
  ) -> Result<(), TableError> {
    let diff = new_header_region_size as i64 - self.header_region_size as i64;
    if diff == 0 {
      self
        .content
        .flush(dict_dir, TERMINAL_ADDRESS_TABLE_FILE_EXTENSION)?;
      return Ok(());
    }

    let rebased = self.rebased(diff)?;
    debug!(
      dir = %dict_dir.display(),
      size = rebased.size,
      diff,
      "flushing rebased terminal position lookup table"
    );
    rebased
      .content
      .flush(dict_dir, TERMINAL_ADDRESS_TABLE_FILE_EXTENSION)?;
    Ok(())
  }

  // Same bias, every assigned position moved by diff, unassigned ids stay unassigned.
  fn rebased(&self, diff: i64) -> Result<TerminalPositionLookupTable, TableError> {
    // Mapped records don't count against the cap, so size it to hold the whole table
    let buffer = self.content.buffer();
    let max_additional_size = buffer
      .max_additional_size()
      .max(buffer.tail_position());
    let content = SingleDictContent::from_buffer(
      ExtendableBuffer::new().with_max_additional_size(max_additional_size),
    );
    let mut table = TerminalPositionLookupTable::from_content(content, self.header_region_size)?;
    for (id, pos) in self.iter() {
      let pos = match pos {
        Some(pos) => pos as i64 + diff,
        None => continue,
      };
      let result = i32::try_from(pos)
        .map_err(|_| TableError::PositionOutOfRange {
          id,
          position: pos,
          header_region_size: self.header_region_size,
        })
        .and_then(|p| table.set_terminal_pt_node_position(id, p));
      if let Err(e) = result {
        error!(terminal_id = id, position = pos, error = %e, "cannot set terminal position in rebased table");
        return Err(TableError::RebaseFailed {
          id,
          position: pos,
          source: Box::new(e),
        });
      }
    }
    if table.size < self.size {
      // Trailing ids that were never assigned
      let last = self.size - 1;
      table.grow_to(last).map_err(|e| {
        error!(terminal_id = last, error = %e, "cannot grow rebased table");
        TableError::RebaseFailed {
          id: last as i32,
          position: NOT_A_DICT_POS as i64,
          source: Box::new(e),
        }
      })?;
    }
    Ok(table)
  }

  fn biased(&self, terminal_id: i32, pos: i64) -> Result<u32, TableError> {
    let value = pos + self.header_region_size as i64;
    if value < 0 || value >= NOT_A_TERMINAL_ADDRESS as i64 {
      return Err(TableError::PositionOutOfRange {
        id: terminal_id,
        position: pos,
        header_region_size: self.header_region_size,
      });
    }
    Ok(value as u32)
  }

  // Appends sentinel records until terminal_id has one. The size follows the
  // tail even if a write fails part way through.
  fn grow_to(&mut self, terminal_id: usize) -> Result<(), TableError> {
    let target = entry_pos(terminal_id);
    let buffer = self.content.writable_buffer();
    let mut writing_pos = buffer.tail_position();
    let mut result: Result<(), TableError> = Ok(());
    while writing_pos <= target {
      if let Err(e) =
        buffer.write_uint_and_advance(NOT_A_TERMINAL_ADDRESS, ADDRESS_SIZE, &mut writing_pos)
      {
        warn!(terminal_id, writing_pos, error = %e, "cannot extend terminal position lookup table");
        result = Err(e.into());
        break;
      }
    }
    let old_size = self.size;
    self.size = buffer.tail_position() / ADDRESS_SIZE;
    debug!(old_size, new_size = self.size, "grew terminal position lookup table");
    result
  }
}

#[inline(always)]
fn entry_pos(terminal_id: usize) -> usize {
  terminal_id * ADDRESS_SIZE
}
