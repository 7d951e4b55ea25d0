//! Specialized data structures
//!
//! - **[`ring_buffer`]**: fixed-capacity buffer that overwrites its oldest
//!   entry, used as the per-bucket latency reservoir of the percentile window
//!
//! ## Usage
//!
//! ```rust
//! use bulwark_common::collections::RingBuffer;
//!
//! let mut buffer = RingBuffer::new(2);
//! buffer.push(1);
//! buffer.push(2);
//! buffer.push(3);
//! assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
//! ```

pub mod ring_buffer;

// Re-export commonly used types
pub use ring_buffer::RingBuffer;
