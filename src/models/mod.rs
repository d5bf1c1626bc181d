//! Data models for the leave document, the active-approvals index, and the
//! incremental sync cursor.

pub mod approval;
pub mod cursor;
pub mod leave;

pub use approval::*;
pub use cursor::*;
pub use leave::*;
