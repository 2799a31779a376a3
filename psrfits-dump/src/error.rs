use psrfits_types::{DecodeError, FormatError};
use thiserror::Error;

pub type DumpResult<T> = std::result::Result<T, DumpError>;

#[derive(Debug, Error)]
pub enum DumpError {
    /// Неверный аргумент командной строки
    #[error("Invalid argument --{arg}: {reason}")]
    Argument { arg: &'static str, reason: String },

    /// Ошибка открытия файла или разбора заголовков
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Ошибка декодирования строк
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Ошибка записи результата
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DumpError {
    pub fn argument(
        arg: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        DumpError::Argument {
            arg,
            reason: reason.into(),
        }
    }
}
