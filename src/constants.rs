// Format parameters shared by every version 4 dictionary content file.

// Width in bytes of one terminal address table record.
pub const TERMINAL_ADDRESS_TABLE_ADDRESS_SIZE: usize = 3;

// Stored in a record that has been allocated but not assigned a PtNode.
// All ones for the record width, so it can never collide with a biased position.
pub const NOT_A_TERMINAL_ADDRESS: u32 = (1 << (8 * TERMINAL_ADDRESS_TABLE_ADDRESS_SIZE)) - 1;

pub const TERMINAL_ADDRESS_TABLE_FILE_EXTENSION: &str = ".tat";

// Flat integer form of "no such PtNode".
pub const NOT_A_DICT_POS: i32 = i32::MIN;

// 8MB, enough for a full sized dictionary's worth of growth between saves
pub const DEFAULT_MAX_ADDITIONAL_BUFFER_SIZE: usize = 8 * 1024 * 1024;

pub const MAX_UINT_WIDTH: usize = 4;

// Suffix of the scratch file written before being renamed into place
pub const TEMP_FILE_SUFFIX: &str = ".tmp";
