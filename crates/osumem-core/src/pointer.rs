//! Pointer chain resolution.

use crate::error::{ChainBroken, ChainFault};
use crate::process::ReadMemory;

/// Walk a pointer chain from `base`.
///
/// Every offset but the last is applied and then dereferenced with the
/// target's pointer width; the last offset is only added. A failed read, a
/// zero pointer or an address overflow stops the walk with [`ChainBroken`].
/// An empty chain yields `base`.
///
/// The returned address is only meaningful for the current poll cycle.
pub fn resolve<R: ReadMemory + ?Sized>(
    reader: &R,
    base: u64,
    offsets: &[i64],
) -> Result<u64, ChainBroken> {
    let Some((last, walk)) = offsets.split_last() else {
        return Ok(base);
    };

    let mut current = base;
    for (step, &offset) in walk.iter().enumerate() {
        let address = apply(current, offset, step)?;
        let next = reader.read_pointer(address).map_err(|e| ChainBroken {
            step,
            address,
            kind: ChainFault::Read(e),
        })?;
        if next == 0 {
            return Err(ChainBroken {
                step,
                address,
                kind: ChainFault::NullPointer,
            });
        }
        current = next;
    }

    apply(current, *last, walk.len())
}

fn apply(current: u64, offset: i64, step: usize) -> Result<u64, ChainBroken> {
    current
        .checked_add_signed(offset)
        .ok_or(ChainBroken {
            step,
            address: current,
            kind: ChainFault::Overflow,
        })
}
