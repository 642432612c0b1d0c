//! # Row Options
//!
//! `RowOptions` carries the tunables shared by a buffer, its cursors and the
//! record-stream helpers. It follows the builder pattern: start from
//! `RowOptions::default()` and chain setters.
//!
//! ## Configuration Options
//!
//! | Option                | Default         | Description                                        |
//! |-----------------------|-----------------|----------------------------------------------------|
//! | initial_capacity      | layout estimate | Bytes reserved when a buffer is created            |
//! | max_row_size          | u32::MAX        | Growth beyond this fails with `BufferTooSmall`     |
//! | max_nesting_depth     | 32              | Deepest scope a writer may open or a reader enter  |
//! | fill_defaults         | true            | Fill unwritten required columns from defaults      |
//! | skip_corrupt_segments | false           | Stream reader skips corrupt segments instead of failing |
//!
//! ## Usage
//!
//! ```ignore
//! let options = RowOptions::default()
//!     .max_row_size(64 * 1024)
//!     .fill_defaults(false);
//! let buffer = RowBuffer::new(layout, resolver, options)?;
//! ```

use crate::config::constants::{DEFAULT_MAX_NESTING_DEPTH, MAX_ROW_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowOptions {
    initial_capacity: Option<usize>,
    max_row_size: usize,
    max_nesting_depth: usize,
    fill_defaults: bool,
    skip_corrupt_segments: bool,
}

impl Default for RowOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RowOptions {
    pub const fn new() -> Self {
        Self {
            initial_capacity: None,
            max_row_size: MAX_ROW_SIZE,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            fill_defaults: true,
            skip_corrupt_segments: false,
        }
    }

    /// Bytes to reserve up front. When unset the layout's size estimate is used.
    pub fn initial_capacity(mut self, bytes: usize) -> Self {
        self.initial_capacity = Some(bytes);
        self
    }

    /// Upper bound for a single row. Clamped to the wire limit of `u32::MAX`.
    pub fn max_row_size(mut self, bytes: usize) -> Self {
        self.max_row_size = bytes.min(MAX_ROW_SIZE);
        self
    }

    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// When false, closing a scope with an unwritten required column fails with
    /// `MissingRequiredField` instead of writing the column default.
    pub fn fill_defaults(mut self, enabled: bool) -> Self {
        self.fill_defaults = enabled;
        self
    }

    pub fn skip_corrupt_segments(mut self, enabled: bool) -> Self {
        self.skip_corrupt_segments = enabled;
        self
    }

    pub fn initial_capacity_hint(&self) -> Option<usize> {
        self.initial_capacity
    }

    pub fn max_row_size_limit(&self) -> usize {
        self.max_row_size
    }

    pub fn max_depth(&self) -> usize {
        self.max_nesting_depth
    }

    pub fn fills_defaults(&self) -> bool {
        self.fill_defaults
    }

    pub fn skips_corrupt_segments(&self) -> bool {
        self.skip_corrupt_segments
    }
}
