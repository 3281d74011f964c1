//! Kernel heap
//!
//! A `linked_list_allocator` heap placed in the largest usable region of
//! the Limine memory map, reached through the higher-half direct map.

use limine::memory_map::{Entry, EntryType};
use linked_list_allocator::LockedHeap;

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Lowest physical address the heap may start at
const LOW_MEMORY: u64 = 0x10_0000;
/// Upper bound on the heap; the rest of the region stays untouched
const MAX_HEAP_SIZE: u64 = 512 * 1024 * 1024;

fn align_up(addr: u64, align: u64) -> u64 {
    (addr + align - 1) & !(align - 1)
}

/// Pick the heap region: `(physical start, size)`
pub fn choose_region(entries: &[&Entry]) -> Option<(u64, u64)> {
    entries
        .iter()
        .filter(|entry| entry.entry_type == EntryType::USABLE)
        .filter_map(|entry| {
            let end = entry.base.saturating_add(entry.length);
            let start = align_up(entry.base.max(LOW_MEMORY), 0x1000);
            (end > start).then(|| (start, (end - start).min(MAX_HEAP_SIZE)))
        })
        .max_by_key(|&(_, size)| size)
}

/// Hand `[phys, phys + size)` to the allocator
///
/// # Safety
/// The range must be usable RAM mapped at `hhdm_offset + phys` and never
/// touched by anything else.
pub unsafe fn init(hhdm_offset: u64, phys: u64, size: u64) {
    let start = (hhdm_offset + phys) as *mut u8;
    ALLOCATOR.lock().init(start, size as usize);
}

pub fn used() -> usize {
    ALLOCATOR.lock().used()
}

pub fn free() -> usize {
    ALLOCATOR.lock().free()
}
