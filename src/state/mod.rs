pub mod history;
pub mod selection;

pub use selection::SourceSelector;
