//! Shape decoding.

use crate::cursor::ByteCursor;
use crate::decode::{decode_bounded_int, decode_rank};
use crate::error::Error;
use crate::models::{DIM_WORD_SIZE, Shape, ShapeBounds};

/// Dimension used when the cursor runs dry mid-shape, kept inside the bounds.
fn fallback_dim(min_dim: i64, max_dim: i64) -> i64 {
    1i64.clamp(min_dim, max_dim)
}

/// Decodes `rank` dimensions, each from one 8-byte word reduced into
/// `[min_dim, max_dim]`.
///
/// Once fewer than 8 bytes remain, the leftover bytes are discarded and the
/// remaining dimensions default to `1` (clamped into the bounds), so the
/// payload and any later attributes take their fallbacks too. A rank of zero
/// consumes nothing.
pub fn decode_shape(
    cursor: &mut ByteCursor<'_>,
    rank: u8,
    min_dim: i64,
    max_dim: i64,
) -> Result<Shape, Error> {
    if min_dim < 0 || min_dim > max_dim {
        return Err(Error::InvalidBounds { lo: min_dim, hi: max_dim });
    }
    let mut dims = Vec::with_capacity(rank as usize);
    for _ in 0..rank {
        let dim = if cursor.remaining() >= DIM_WORD_SIZE {
            decode_bounded_int(cursor, min_dim, max_dim)?
        } else {
            cursor.exhaust();
            fallback_dim(min_dim, max_dim)
        };
        dims.push(dim as usize);
    }
    tracing::debug!(rank, dims = ?dims, offset = cursor.offset(), "decoded shape");
    Ok(Shape::new(dims))
}

impl ShapeBounds {
    /// Rank byte followed by the dimension words.
    pub fn decode(&self, cursor: &mut ByteCursor<'_>) -> Result<Shape, Error> {
        let rank = decode_rank(cursor, self.min_rank, self.max_rank)?;
        decode_shape(cursor, rank, self.min_dim, self.max_dim)
    }

    pub fn contains(&self, shape: &Shape) -> bool {
        let rank_ok = (self.min_rank as usize..=self.max_rank as usize).contains(&shape.rank());
        rank_ok
            && shape
                .dims()
                .iter()
                .all(|&d| (self.min_dim..=self.max_dim).contains(&(d as i64)))
    }
}
