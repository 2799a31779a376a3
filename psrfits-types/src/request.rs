/// Параметры одного вызова декодирования.
///
/// Значения берутся как есть; нормализация (0 → 1, ограничение сверху,
/// отрицательный `end_row`) выполняется декодером.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    /// Первая строка (с нуля)
    pub start_row: usize,
    /// Последняя строка включительно. `None` — только `start_row`,
    /// отрицательные значения отсчитываются от конца файла
    /// (`-1` — последняя строка)
    pub end_row: Option<i64>,
    /// Прореживание по времени; 0 означает 1
    pub time_downsample: usize,
    /// Прореживание по частоте; 0 означает один канал на всю полосу
    pub freq_downsample: usize,
    /// Применять DAT_SCL / DAT_OFFS
    pub apply_scales: bool,
    /// Возвращать оси времени и частоты
    pub with_axes: bool,
    /// Удалять оси длины 1
    pub squeeze: bool,
    /// Развернуть порядок осей
    pub transpose: bool,
}

impl DecodeRequest {
    /// Запрос одной строки без прореживания.
    pub fn new(start_row: usize) -> Self {
        DecodeRequest {
            start_row,
            end_row: None,
            time_downsample: 1,
            freq_downsample: 1,
            apply_scales: false,
            with_axes: false,
            squeeze: false,
            transpose: false,
        }
    }

    /// Запрос всех строк файла.
    pub fn all_rows() -> Self {
        Self::new(0).end_row(-1)
    }

    pub fn end_row(
        mut self,
        end_row: i64,
    ) -> Self {
        self.end_row = Some(end_row);
        self
    }

    pub fn time_downsample(
        mut self,
        factor: usize,
    ) -> Self {
        self.time_downsample = factor;
        self
    }

    pub fn freq_downsample(
        mut self,
        factor: usize,
    ) -> Self {
        self.freq_downsample = factor;
        self
    }

    pub fn apply_scales(
        mut self,
        on: bool,
    ) -> Self {
        self.apply_scales = on;
        self
    }

    pub fn with_axes(
        mut self,
        on: bool,
    ) -> Self {
        self.with_axes = on;
        self
    }

    pub fn squeeze(
        mut self,
        on: bool,
    ) -> Self {
        self.squeeze = on;
        self
    }

    pub fn transpose(
        mut self,
        on: bool,
    ) -> Self {
        self.transpose = on;
        self
    }
}

impl Default for DecodeRequest {
    fn default() -> Self {
        Self::new(0)
    }
}
