// A byte addressable buffer made of an original region, usually mapped from a
// file, followed by an additional in-memory region that grows on append.
//
// Tail is original.len() + additional.len()
// Writes may land anywhere before the tail, or exactly at the tail to grow it.

use std::io::Write;

use memmap::{Mmap, MmapMut};

use crate::constants::{DEFAULT_MAX_ADDITIONAL_BUFFER_SIZE, MAX_UINT_WIDTH};
use crate::error::BufferError;

pub trait AddressBuffer {
  fn tail_position(&self) -> usize;
  fn is_updatable(&self) -> bool;
  // Big endian, pos + width must be within the tail
  fn read_uint(&self, width: usize, pos: usize) -> u32;
  fn write_uint(&mut self, value: u32, width: usize, pos: usize) -> Result<(), BufferError>;
  fn write_uint_and_advance(
    &mut self,
    value: u32,
    width: usize,
    pos: &mut usize,
  ) -> Result<(), BufferError>;
}

#[derive(Debug)]
enum Original {
  Empty,
  Owned(Vec<u8>),
  Mapped(Mmap),
  CopyOnWrite(MmapMut),
}

impl Original {
  fn as_slice(&self) -> &[u8] {
    match self {
      Original::Empty => &[],
      Original::Owned(v) => &v[..],
      Original::Mapped(m) => &m[..],
      Original::CopyOnWrite(m) => &m[..],
    }
  }

  fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
    match self {
      Original::Empty | Original::Mapped(_) => None,
      Original::Owned(v) => Some(&mut v[..]),
      Original::CopyOnWrite(m) => Some(&mut m[..]),
    }
  }

  fn len(&self) -> usize {
    self.as_slice().len()
  }
}

#[derive(Debug)]
pub struct ExtendableBuffer {
  original: Original,
  additional: Vec<u8>,
  updatable: bool,
  max_additional_size: usize,
}

impl Default for ExtendableBuffer {
  fn default() -> Self {
    ExtendableBuffer::new()
  }
}

impl ExtendableBuffer {
  // An empty, updatable, memory only buffer.
  pub fn new() -> ExtendableBuffer {
    ExtendableBuffer {
      original: Original::Empty,
      additional: Vec::new(),
      updatable: true,
      max_additional_size: DEFAULT_MAX_ADDITIONAL_BUFFER_SIZE,
    }
  }

  pub fn from_bytes(bytes: Vec<u8>, updatable: bool) -> ExtendableBuffer {
    ExtendableBuffer {
      original: Original::Owned(bytes),
      updatable,
      ..ExtendableBuffer::new()
    }
  }

  // Read only view over a mapped file.
  pub fn mapped(mmap: Mmap) -> ExtendableBuffer {
    ExtendableBuffer {
      original: Original::Mapped(mmap),
      updatable: false,
      ..ExtendableBuffer::new()
    }
  }

  // Updatable view over a private mapping, writes never reach the file.
  pub fn copy_on_write(mmap: MmapMut) -> ExtendableBuffer {
    ExtendableBuffer {
      original: Original::CopyOnWrite(mmap),
      updatable: true,
      ..ExtendableBuffer::new()
    }
  }

  pub fn with_max_additional_size(mut self, max_additional_size: usize) -> ExtendableBuffer {
    self.max_additional_size = max_additional_size;
    self
  }

  pub(crate) fn max_additional_size(&self) -> usize {
    self.max_additional_size
  }

  pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
    writer.write_all(self.original.as_slice())?;
    writer.write_all(&self.additional)
  }

  pub fn to_vec(&self) -> Vec<u8> {
    let mut out = Vec::with_capacity(self.tail_position());
    out.extend_from_slice(self.original.as_slice());
    out.extend_from_slice(&self.additional);
    out
  }

  #[inline(always)]
  fn byte_at(&self, pos: usize) -> u8 {
    let original = self.original.as_slice();
    if pos < original.len() {
      original[pos]
    } else {
      self.additional[pos - original.len()]
    }
  }

  fn overwrite(&mut self, bytes: &[u8], pos: usize) -> Result<(), BufferError> {
    let original_len = self.original.len();
    if pos < original_len && self.original.as_mut_slice().is_none() {
      return Err(BufferError::ReadOnly);
    }
    for (i, &byte) in bytes.iter().enumerate() {
      let p = pos + i;
      match self.original.as_mut_slice() {
        Some(original) if p < original_len => original[p] = byte,
        _ => self.additional[p - original_len] = byte,
      }
    }
    Ok(())
  }

  fn append(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
    let requested = self.additional.len() + bytes.len();
    if requested > self.max_additional_size {
      return Err(BufferError::CapacityExceeded {
        requested,
        max: self.max_additional_size,
      });
    }
    self.additional.extend_from_slice(bytes);
    Ok(())
  }
}

fn check_width(width: usize) -> Result<(), BufferError> {
  if width == 0 || width > MAX_UINT_WIDTH {
    Err(BufferError::InvalidWidth(width))
  } else {
    Ok(())
  }
}

fn to_be_bytes(value: u32, width: usize) -> Result<[u8; MAX_UINT_WIDTH], BufferError> {
  if width < MAX_UINT_WIDTH && (value >> (8 * width)) != 0 {
    return Err(BufferError::ValueTooLarge { value, width });
  }
  let mut out = [0u8; MAX_UINT_WIDTH];
  for (i, byte) in out.iter_mut().take(width).enumerate() {
    *byte = (value >> (8 * (width - 1 - i))) as u8;
  }
  Ok(out)
}

impl AddressBuffer for ExtendableBuffer {
  fn tail_position(&self) -> usize {
    self.original.len() + self.additional.len()
  }

  fn is_updatable(&self) -> bool {
    self.updatable
  }

  fn read_uint(&self, width: usize, pos: usize) -> u32 {
    (pos..pos + width).fold(0u32, |acc, p| (acc << 8) | self.byte_at(p) as u32)
  }

  fn write_uint(&mut self, value: u32, width: usize, pos: usize) -> Result<(), BufferError> {
    check_width(width)?;
    if !self.updatable {
      return Err(BufferError::ReadOnly);
    }
    let bytes = to_be_bytes(value, width)?;
    let bytes = &bytes[..width];
    let tail = self.tail_position();
    if pos + width <= tail {
      self.overwrite(bytes, pos)
    } else if pos == tail {
      self.append(bytes)
    } else {
      Err(BufferError::OutOfBounds { pos, width, tail })
    }
  }

  fn write_uint_and_advance(
    &mut self,
    value: u32,
    width: usize,
    pos: &mut usize,
  ) -> Result<(), BufferError> {
    self.write_uint(value, width, *pos)?;
    *pos += width;
    Ok(())
  }
}
