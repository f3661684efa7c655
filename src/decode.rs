//! Primitive decoders built on [`ByteCursor`].
//!
//! Every decoder is total: exhaustion substitutes a documented fallback and
//! never errors. The only failures are bad parameters supplied by a harness
//! (empty allow-lists, inverted bounds).

use crate::cursor::ByteCursor;
use crate::error::Error;

/// Picks an entry from `allow` with one selector byte (`byte % len`).
///
/// Fallback: selector byte `0`, i.e. the first entry.
pub fn decode_enum<T: Copy>(cursor: &mut ByteCursor<'_>, allow: &[T]) -> Result<T, Error> {
    if allow.is_empty() {
        return Err(Error::EmptySelection);
    }
    let selector = cursor.read_byte(0);
    Ok(allow[selector as usize % allow.len()])
}

/// Maps one byte into `[min_rank, max_rank]`.
///
/// Fallback: selector byte `0`, i.e. `min_rank`.
pub fn decode_rank(cursor: &mut ByteCursor<'_>, min_rank: u8, max_rank: u8) -> Result<u8, Error> {
    if min_rank > max_rank {
        return Err(Error::InvalidBounds { lo: min_rank.into(), hi: max_rank.into() });
    }
    let range = u16::from(max_rank - min_rank) + 1;
    let byte = cursor.read_byte(0);
    Ok((u16::from(byte) % range) as u8 + min_rank)
}

/// Reduces `raw` into `[lo, hi]`, treating `raw` by magnitude.
///
/// `i64::MIN` has no positive counterpart, so the magnitude is taken as
/// unsigned before reducing.
pub fn reduce_into(raw: i64, lo: i64, hi: i64) -> Result<i64, Error> {
    if lo > hi {
        return Err(Error::InvalidBounds { lo, hi });
    }
    let span = (i128::from(hi) - i128::from(lo) + 1) as u128;
    let offset = u128::from(raw.unsigned_abs()) % span;
    Ok((i128::from(lo) + offset as i128) as i64)
}

/// Reads an 8-byte word and reduces it into `[lo, hi]`.
///
/// Fallback: `lo`.
pub fn decode_bounded_int(cursor: &mut ByteCursor<'_>, lo: i64, hi: i64) -> Result<i64, Error> {
    match cursor.try_read::<i64>() {
        Some(raw) => reduce_into(raw, lo, hi),
        None if lo <= hi => Ok(lo),
        None => Err(Error::InvalidBounds { lo, hi }),
    }
}

/// Reads one byte and reduces it into `[lo, hi]`.
///
/// Fallback: `lo`.
pub fn decode_small_int(cursor: &mut ByteCursor<'_>, lo: i64, hi: i64) -> Result<i64, Error> {
    match cursor.try_read::<u8>() {
        Some(raw) => reduce_into(raw.into(), lo, hi),
        None if lo <= hi => Ok(lo),
        None => Err(Error::InvalidBounds { lo, hi }),
    }
}

fn clamp_finite(raw: f64, lo: f64, hi: f64) -> f64 {
    if raw.is_finite() { raw.clamp(lo, hi) } else { lo }
}

fn check_float_bounds(lo: f64, hi: f64) -> Result<(), Error> {
    if lo.is_finite() && hi.is_finite() && lo <= hi {
        Ok(())
    } else {
        Err(Error::InvalidBounds { lo: lo as i64, hi: hi as i64 })
    }
}

/// Reads an 8-byte float and clamps it into `[lo, hi]`.
///
/// NaN, infinities and exhaustion all yield `lo`.
pub fn decode_float_clamped(cursor: &mut ByteCursor<'_>, lo: f64, hi: f64) -> Result<f64, Error> {
    check_float_bounds(lo, hi)?;
    Ok(cursor.try_read::<f64>().map_or(lo, |raw| clamp_finite(raw, lo, hi)))
}

/// 4-byte variant of [`decode_float_clamped`].
pub fn decode_f32_clamped(cursor: &mut ByteCursor<'_>, lo: f32, hi: f32) -> Result<f32, Error> {
    check_float_bounds(lo.into(), hi.into())?;
    Ok(cursor
        .try_read::<f32>()
        .map_or(lo, |raw| clamp_finite(raw.into(), lo.into(), hi.into()) as f32))
}

/// Low bit of one byte.
pub fn decode_bool(cursor: &mut ByteCursor<'_>, default: bool) -> bool {
    cursor.try_read::<u8>().map_or(default, |b| b & 1 == 1)
}

/// Maps an 8-byte float into `[0, 1)` by its fractional magnitude.
///
/// Non-finite values and exhaustion yield `default`.
pub fn decode_fraction(cursor: &mut ByteCursor<'_>, default: f64) -> f64 {
    match cursor.try_read::<f64>() {
        Some(raw) if raw.is_finite() => {
            let magnitude = raw.abs();
            magnitude - magnitude.floor()
        }
        _ => default,
    }
}

/// Optional axis selection for a tensor of `rank` dimensions.
///
/// Consumes one 8-byte word when available. The low bit decides whether an
/// axis is used; the remaining bits pick it modulo `rank`.
pub fn decode_axis(cursor: &mut ByteCursor<'_>, rank: usize) -> Option<usize> {
    let raw = cursor.try_read::<u64>()?;
    if raw & 1 == 0 || rank == 0 {
        return None;
    }
    Some(((raw >> 1) % rank as u64) as usize)
}
