//! Чтение поисковых PSRFITS файлов
//!
//! Разбор заголовков PRIMARY и SUBINT и декодирование строк SUBINT в
//! плотный массив `[time, pol, chan]` с прореживанием по времени и частоте.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use psrfits_core::SubintDecoder;
//! use psrfits_types::DecodeRequest;
//!
//! let mut decoder = SubintDecoder::open("obs.sf")?;
//! println!("{} rows", decoder.subint_header().nrows);
//!
//! let req = DecodeRequest::all_rows().time_downsample(16).with_axes(true);
//! let block = decoder.decode(&req)?;
//! println!("shape = {:?}", block.shape());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod decimate;
pub mod decoder;
pub mod fits_reader;
pub mod header;
pub mod table;
pub mod unpack;

pub use decoder::*;
pub use fits_reader::FitsReader;
pub use header::{read_headers, FromHeaderMap};
pub use table::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
