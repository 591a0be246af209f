use thiserror::Error;

#[derive(Error, Debug)]
pub enum QlogError {
    #[error("Invalid pool geometry: block_total={block_total}, block_size={block_size}")]
    InvalidPoolGeometry { block_total: usize, block_size: usize },

    #[error("Arena too small: need {required} bytes, got {actual}")]
    ArenaTooSmall { required: usize, actual: usize },

    #[error("Pool exhausted: no free blocks left in '{0}'")]
    PoolExhausted(String),

    #[error("Block {index} belongs to another pool")]
    ForeignBlock { index: usize },

    #[error("Block {0} is not allocated")]
    BlockNotAllocated(usize),

    #[error("Invalid block index: {0}")]
    InvalidBlock(usize),

    #[error("Tag too long: '{tag}' exceeds {capacity} bytes")]
    TagTooLong { tag: String, capacity: usize },

    #[error("Tag cannot be empty")]
    EmptyTag,

    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Writer not found: {0}")]
    WriterNotFound(String),

    #[error("Logger is not initialized")]
    NotInitialized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, QlogError>;
