// crates/wv_algo/src/lib.rs
#![forbid(unsafe_code)]

// ----------------------------- Allocation (public surface) ---------------------------

pub mod allocation {
    // File modules (actual implementations)
    pub mod largest_remainder;

    // Pipeline-friendly names.
    pub use largest_remainder::{allocate_counts, allocate_waves, AllocError, ShareInput, SHARE_EPSILON};
}

pub use allocation::{allocate_counts, allocate_waves, AllocError, ShareInput, SHARE_EPSILON};
