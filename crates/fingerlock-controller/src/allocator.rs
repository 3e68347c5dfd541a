//! Slot allocation for new enrollments.
//!
//! Slots are handed out sequentially. Templates can only be erased all at
//! once, so the stored templates always occupy `1..=count` and the next free
//! slot is `count + 1`.

use fingerlock_core::{Error, Result, SlotId};

/// Next free slot for a database holding `count` of `capacity` templates.
///
/// # Errors
///
/// Returns [`Error::DatabaseFull`] when `count >= capacity`.
///
/// # Examples
///
/// ```
/// use fingerlock_controller::allocator::next_free_slot;
///
/// assert_eq!(next_free_slot(0, 50).unwrap().as_u16(), 1);
/// assert!(next_free_slot(50, 50).is_err());
/// ```
pub fn next_free_slot(count: u16, capacity: u16) -> Result<SlotId> {
    if count >= capacity {
        return Err(Error::DatabaseFull { count, capacity });
    }
    // count < capacity <= u16::MAX, so count + 1 cannot overflow
    SlotId::new(count + 1)
}
