use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
static PEAK: AtomicUsize = AtomicUsize::new(0);
static TOTAL_BYTES: AtomicUsize = AtomicUsize::new(0);
static ALLOCATIONS: AtomicUsize = AtomicUsize::new(0);
static DEALLOCATIONS: AtomicUsize = AtomicUsize::new(0);

/// Counting wrapper around the system allocator. Installed as the global
/// allocator so the sampler can report the process's own heap behaviour.
pub struct TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            let size = layout.size();
            let current = ALLOCATED.fetch_add(size, Relaxed) + size;
            PEAK.fetch_max(current, Relaxed);
            TOTAL_BYTES.fetch_add(size, Relaxed);
            ALLOCATIONS.fetch_add(1, Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        ALLOCATED.fetch_sub(layout.size(), Relaxed);
        DEALLOCATIONS.fetch_add(1, Relaxed);
        unsafe { System.dealloc(ptr, layout) };
    }
}

pub struct AllocStats {
    pub allocated_bytes: usize,
    pub peak_bytes: usize,
    pub total_bytes: usize,
    pub allocations: usize,
    pub deallocations: usize,
}

pub fn snapshot() -> AllocStats {
    AllocStats {
        allocated_bytes: ALLOCATED.load(Relaxed),
        peak_bytes: PEAK.load(Relaxed),
        total_bytes: TOTAL_BYTES.load(Relaxed),
        allocations: ALLOCATIONS.load(Relaxed),
        deallocations: DEALLOCATIONS.load(Relaxed),
    }
}
