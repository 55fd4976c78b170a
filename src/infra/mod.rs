mod channel_storage;
mod memory_storage;
mod operation_table;
mod storage_channel_fake;

pub use channel_storage::*;
pub use memory_storage::*;
pub use operation_table::*;
pub use storage_channel_fake::*;
