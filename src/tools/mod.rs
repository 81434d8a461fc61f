pub mod diagnostics;
pub mod expect;
