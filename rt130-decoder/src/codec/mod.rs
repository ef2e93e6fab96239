//! Record field codecs
//!
//! Pure functions decoding fixed-width ASCII numeric/text sub-fields and
//! packed decimal digits from a positioned byte cursor.

pub mod bcd;
pub mod field;

pub use field::{
    date_from_day_of_year, parse_decimal, parse_int, parse_time, timestamp_from_parts,
    trim_text, FieldCursor,
};
