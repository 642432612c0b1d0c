//! # HybridRow Wire Constants
//!
//! This module centralizes the sizes and limits of the encoding, grouping values
//! that depend on each other and checking the relationships at compile time.
//!
//! ## Dependency Graph
//!
//! ```text
//! ROW_HEADER_SIZE (8 bytes)
//!       │
//!       ├─> SCHEMA_ID_SIZE (4) + ROW_LENGTH_SIZE (4)
//!       │
//!       └─> MIN_ROW_SIZE (header only: a layout with no columns)
//!
//! SCOPE_PREFIX_SIZE (8 bytes)
//!       │
//!       └─> SCOPE_LENGTH_SIZE (4) + SCOPE_COUNT_SIZE (4)
//!             Patched in place when a scope closes; both are fixed-width so
//!             the patch never moves any byte.
//!
//! SEGMENT_LENGTH_SIZE (4 bytes)
//!       │
//!       ├─> STRING_PREFIX_SIZE (4) for comment and for sdl
//!       │
//!       └─> MIN_SEGMENT_SIZE (length + two empty strings)
//!
//! MAX_ROW_SIZE (u32::MAX)
//!       │
//!       └─> row_length is a u32, so no row can exceed it
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use crate::config::{ROW_HEADER_SIZE, SCOPE_PREFIX_SIZE};
//! ```

// ============================================================================
// ROW HEADER
// ============================================================================

/// Size of the schema id that starts every row.
pub const SCHEMA_ID_SIZE: usize = 4;

/// Size of the total row length that follows the schema id.
pub const ROW_LENGTH_SIZE: usize = 4;

/// Size of the row header: schema id + row length.
pub const ROW_HEADER_SIZE: usize = SCHEMA_ID_SIZE + ROW_LENGTH_SIZE;

/// A row for a layout without columns is just its header.
pub const MIN_ROW_SIZE: usize = ROW_HEADER_SIZE;

/// `row_length` is a u32 on the wire.
pub const MAX_ROW_SIZE: usize = u32::MAX as usize;

const _: () = assert!(ROW_HEADER_SIZE == 8, "row header must stay 8 bytes");

// ============================================================================
// SCOPES
// ============================================================================

/// Byte length of a scope body (u32).
pub const SCOPE_LENGTH_SIZE: usize = 4;

/// Item count of a scope body (u32).
pub const SCOPE_COUNT_SIZE: usize = 4;

/// Placeholder reserved in front of every scope body.
pub const SCOPE_PREFIX_SIZE: usize = SCOPE_LENGTH_SIZE + SCOPE_COUNT_SIZE;

/// Default bound on scope nesting for writers and readers.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

/// Hard bound on type argument nesting when decoding untrusted bytes.
pub const MAX_TYPE_ARGUMENT_DEPTH: usize = 64;

const _: () = assert!(
    SCOPE_PREFIX_SIZE == SCOPE_LENGTH_SIZE + SCOPE_COUNT_SIZE,
    "SCOPE_PREFIX_SIZE derivation mismatch"
);

const _: () = assert!(
    DEFAULT_MAX_NESTING_DEPTH <= MAX_TYPE_ARGUMENT_DEPTH,
    "writers must not produce type arguments readers refuse"
);

// ============================================================================
// SEGMENTS
// ============================================================================

/// Total segment length stored at the start of every segment (u32).
pub const SEGMENT_LENGTH_SIZE: usize = 4;

/// Length prefix of the comment and sdl strings (u32).
pub const STRING_PREFIX_SIZE: usize = 4;

/// A segment with an empty comment, an empty sdl and no rows.
pub const MIN_SEGMENT_SIZE: usize = SEGMENT_LENGTH_SIZE + 2 * STRING_PREFIX_SIZE;

// ============================================================================
// BUFFER SIZING
// ============================================================================

/// Initial capacity used when neither the options nor the layout give a hint.
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Initial read buffer for stream helpers.
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = 8 * 1024;
