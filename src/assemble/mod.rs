//! Clip Assembler: concat manifest, final mux and duration reconciliation.

/// Concatenation, audio mux and the reconciliation checks around it.
pub mod concat;
