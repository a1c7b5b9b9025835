use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    EmptyKey,
    KeyOverflow,
    Cancelled,
    Decode(&'static str, io::Error),
    Encode(&'static str, io::Error),
    CorruptedRun(String),
    InvalidState(String),
    Transform(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::EmptyKey => write!(f, "Cannot compute the next key of an empty key"),
            Error::KeyOverflow => write!(f, "Overflow while computing the next key"),
            Error::Cancelled => write!(f, "Cancelled"),
            Error::Decode(field, err) => write!(f, "Failed to decode {}: {}", field, err),
            Error::Encode(field, err) => write!(f, "Failed to encode {}: {}", field, err),
            Error::CorruptedRun(msg) => write!(f, "Corrupted run file: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::Transform(msg) => write!(f, "Transform failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
