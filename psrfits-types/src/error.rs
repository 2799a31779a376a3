use thiserror::Error;

/// Результат операций читателя таблиц.
pub type TableResult<T> = std::result::Result<T, TableError>;

/// Результат разбора заголовков.
pub type FormatResult<T> = std::result::Result<T, FormatError>;

/// Результат декодирования строк SUBINT.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Ошибки читателя таблиц (контейнер FITS или его заменитель).
#[derive(Debug, Error)]
pub enum TableError {
    /// Ошибка библиотеки FITS (открытие файла, чтение карточек и ячеек)
    #[error("FITS error: {0}")]
    Fits(String),

    /// Таблица (HDU) с таким именем отсутствует
    #[error("Table not found: {0}")]
    MissingTable(String),

    /// Колонка отсутствует в таблице
    #[error("Column {column} not found in table {table}")]
    MissingColumn { table: String, column: String },

    /// Номер строки за пределами таблицы
    #[error("Row {row} out of range (table has {nrows} rows)")]
    RowOutOfRange { row: usize, nrows: usize },

    /// Формат колонки или HDU не поддерживается
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Повреждённые или некорректные данные
    #[error("Malformed data: {0}")]
    Malformed(String),
}

/// Ошибки интерпретации заголовков.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Ошибка нижележащего читателя
    #[error("Table reader error: {0}")]
    Table(#[from] TableError),

    /// Обязательное поле заголовка отсутствует
    #[error("Missing header field {key} in {table}")]
    MissingField { table: String, key: String },

    /// Значение поля не приводится к нужному типу
    #[error("Header field {key} is not a valid {expected}: {found}")]
    BadFieldType {
        key: String,
        expected: &'static str,
        found: String,
    },

    /// Файл записан не в режиме SEARCH
    #[error("Decoding only works on SEARCH-mode PSRFITS, found OBS_MODE={found:?}")]
    ObsMode { found: String },
}

/// Ошибки декодирования.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Ошибка заголовка (в том числе ленивая проверка OBS_MODE)
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Разрядность, которую декодер не умеет распаковывать
    #[error("Unsupported bit depth: NBITS={0}")]
    UnsupportedBitDepth(u32),

    /// Коэффициент прореживания не делит размерность нацело
    #[error("{axis} downsample factor {factor} does not evenly divide {size}")]
    BadDownsample {
        axis: SampleAxis,
        factor: usize,
        size: usize,
    },

    /// Диапазон строк пуст, перевёрнут или выходит за пределы файла
    #[error("Invalid row range {start}..={end} (file has {nrows} rows)")]
    InvalidRowRange { start: i64, end: i64, nrows: usize },

    /// Размер данных строки не согласуется с NBITS/NCHAN/NPOL/NSBLK
    #[error("Row {row}: payload is {found} bytes, expected {expected}")]
    PayloadSize {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Ошибка чтения конкретной строки
    #[error("Failed to read row {row}: {source}")]
    RowReadFailure {
        row: usize,
        #[source]
        source: TableError,
    },
}

/// Ось прореживания (для сообщений об ошибках).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleAxis {
    Time,
    Frequency,
}

impl std::fmt::Display for SampleAxis {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            SampleAxis::Time => write!(f, "time"),
            SampleAxis::Frequency => write!(f, "frequency"),
        }
    }
}

impl TableError {
    /// Удобные конструкторы
    pub fn fits<S: Into<String>>(s: S) -> Self {
        Self::Fits(s.into())
    }

    pub fn malformed<S: Into<String>>(s: S) -> Self {
        Self::Malformed(s.into())
    }

    pub fn unsupported<S: Into<String>>(s: S) -> Self {
        Self::Unsupported(s.into())
    }

    pub fn missing_column<T: Into<String>, C: Into<String>>(
        table: T,
        column: C,
    ) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl FormatError {
    pub fn missing_field<T: Into<String>, K: Into<String>>(
        table: T,
        key: K,
    ) -> Self {
        Self::MissingField {
            table: table.into(),
            key: key.into(),
        }
    }
}

impl DecodeError {
    /// Оборачивает ошибку читателя в `RowReadFailure` для строки `row`.
    pub fn row_read(
        row: usize,
        source: TableError,
    ) -> Self {
        Self::RowReadFailure { row, source }
    }
}
