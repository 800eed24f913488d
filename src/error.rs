use thiserror::Error;

#[derive(Error, Debug)]
pub enum McamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Camera error: {details}")]
    Camera { details: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl McamError {
    pub fn camera<S: Into<String>>(details: S) -> Self {
        Self::Camera {
            details: details.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, McamError>;
