use std::fmt;

#[derive(Debug)]
pub enum ResponseError {
    Io(std::io::Error),
    Signal(String),
    Command(String),
    InvalidInput(String),
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Signal(msg) => write!(f, "signal error: {}", msg),
            Self::Command(msg) => write!(f, "{}", msg),
            Self::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
        }
    }
}

impl std::error::Error for ResponseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ResponseError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

pub type ResponseResult<T> = std::result::Result<T, ResponseError>;
