//! Декодер формата RDB.
//!
//! Модули расположены от листьев к корню: курсор и кодеки длин, строк и LZF
//! используются декодером значений, а тот — парсером верхнего уровня.

pub mod cursor;
pub mod expiry;
pub mod filter;
pub mod length;
pub mod listener;
pub mod lzf;
pub mod parser;
pub mod string;
pub mod tags;
pub mod value;

pub use cursor::*;
pub use expiry::*;
pub use filter::*;
pub use length::*;
pub use listener::*;
pub use parser::*;
pub use string::*;
pub use tags::*;
pub use value::*;
