//! Google Encoded Polyline Algorithm Format.
//!
//! Each coordinate is quantized to 1e-5 degrees and stored as the delta from
//! the previous point. Every delta is zig-zag signed, then split into 5-bit
//! groups (least significant first), with `0x20` marking "more groups follow"
//! and `63` added to land in printable ASCII.

use shared::LatLng;
use thiserror::Error;

const PRECISION: f64 = 1e5;
const ASCII_BIAS: u8 = 63;
const CONTINUATION: u64 = 0x20;
const GROUP_MASK: u64 = 0x1f;
const MAX_SHIFT: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolylineError {
    #[error("polyline ends inside a value at byte {offset}")]
    Truncated { offset: usize },
    #[error("polyline ends after a latitude with no longitude at byte {offset}")]
    MissingLongitude { offset: usize },
    #[error("invalid polyline character {byte:#04x} at byte {offset}")]
    InvalidCharacter { offset: usize, byte: u8 },
    #[error("polyline value starting at byte {offset} overflows 64 bits")]
    Overflow { offset: usize },
}

/// Decodes an encoded polyline into its points.
///
/// Malformed input fails as a whole; no prefix of the path is returned.
pub fn decode(encoded: &str) -> Result<Vec<LatLng>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut path = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0;
    let mut lat = 0i64;
    let mut lng = 0i64;

    while index < bytes.len() {
        lat = accumulate(lat, bytes, &mut index)?;
        if index >= bytes.len() {
            return Err(PolylineError::MissingLongitude { offset: index });
        }
        lng = accumulate(lng, bytes, &mut index)?;

        path.push(LatLng {
            lat: lat as f64 / PRECISION,
            lng: lng as f64 / PRECISION,
        });
    }

    Ok(path)
}

/// Encodes points as a polyline, rounding each axis to 5 decimal places.
pub fn encode(path: &[LatLng]) -> String {
    let mut out = String::with_capacity(path.len() * 8);
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;

    for point in path {
        let lat = quantize(point.lat);
        let lng = quantize(point.lng);
        write_delta(lat.wrapping_sub(prev_lat), &mut out);
        write_delta(lng.wrapping_sub(prev_lng), &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn quantize(value: f64) -> i64 {
    (value * PRECISION).round() as i64
}

fn accumulate(total: i64, bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let offset = *index;
    let delta = read_delta(bytes, index)?;
    total
        .checked_add(delta)
        .ok_or(PolylineError::Overflow { offset })
}

fn read_delta(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let start = *index;
    let mut result = 0u64;
    let mut shift = 0u32;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::Truncated { offset: *index });
        };
        if !(ASCII_BIAS..=b'~').contains(&byte) {
            return Err(PolylineError::InvalidCharacter {
                offset: *index,
                byte,
            });
        }

        let value = u64::from(byte - ASCII_BIAS);
        // The group at bit 60 only has room for four bits.
        if shift > MAX_SHIFT || (shift == MAX_SHIFT && value & GROUP_MASK > 0x0f) {
            return Err(PolylineError::Overflow { offset: start });
        }
        *index += 1;
        result |= (value & GROUP_MASK) << shift;
        shift += 5;

        if value & CONTINUATION == 0 {
            break;
        }
    }

    let magnitude = (result >> 1) as i64;
    Ok(if result & 1 == 1 { !magnitude } else { magnitude })
}

fn write_delta(delta: i64, out: &mut String) {
    let mut value = if delta < 0 {
        !(delta << 1) as u64
    } else {
        (delta << 1) as u64
    };

    while value >= CONTINUATION {
        out.push(char::from(
            ((CONTINUATION | (value & GROUP_MASK)) as u8) + ASCII_BIAS,
        ));
        value >>= 5;
    }
    out.push(char::from(value as u8 + ASCII_BIAS));
}
