use std::fmt;

#[derive(Debug)]
pub enum GalleyError {
    InvalidGeometry(String),
    InvalidConfiguration(String),
    Font(String),
    Image(String),
    Io(std::io::Error),
}

impl fmt::Display for GalleyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GalleyError::InvalidGeometry(message) => {
                write!(f, "invalid page geometry: {}", message)
            }
            GalleyError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            GalleyError::Font(message) => write!(f, "font error: {}", message),
            GalleyError::Image(message) => write!(f, "image error: {}", message),
            GalleyError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for GalleyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GalleyError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GalleyError {
    fn from(value: std::io::Error) -> Self {
        GalleyError::Io(value)
    }
}
