// Version 4 dictionary content storage.
//
// The terminal position lookup table maps dense terminal ids to the positions of
// their PtNodes, stored in a flat file of fixed width records next to the trie.

pub mod buffer;
pub mod constants;
pub mod dict_content;
pub mod error;
pub mod terminal_position_lookup_table;

pub use buffer::{AddressBuffer, ExtendableBuffer};
pub use dict_content::SingleDictContent;
pub use error::{BufferError, TableError};
pub use terminal_position_lookup_table::TerminalPositionLookupTable;
