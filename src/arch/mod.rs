//! Architecture-specific relocation arithmetic.
//!
//! Only ARM32/Thumb-2 is supported: no AArch64, no other machine.

pub mod arm32;
