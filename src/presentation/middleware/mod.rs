//! Middleware
//!
//! Tower middleware layered onto the ambient shell's router.

pub mod cors;
pub mod logging;
