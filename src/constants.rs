// Centralized magic numbers & default values
pub const DEFAULT_BLOCK_SIZE: u64 = 64;
pub const DEFAULT_TOPIC: &str = "suit/suit_update-riot.suit_signed.latest.bin";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_QOS: u8 = 1;
pub const DEFAULT_CLIENT_ID: &str = "suit_publisher";
pub const KEEP_ALIVE_SECS: u64 = 60;
pub const TOPIC_SEPARATOR: char = '/';
/// Room for the fixed header, topic length prefix and packet id of a PUBLISH.
pub const PUBLISH_OVERHEAD: usize = 16;
pub const FILE_MISSING_MESSAGE: &str = "Error: File does not exist";
