pub mod completions;
pub mod replay;
pub mod show;
