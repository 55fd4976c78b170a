mod storage_channel_redis;

pub use storage_channel_redis::*;
