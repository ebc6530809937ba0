//! Static compilation of node trees into replayable byte segments.

/// Per-process cache of compiled sequences.
pub mod cache;
/// Compiled segment sequences and their fingerprint.
pub mod compiled;
