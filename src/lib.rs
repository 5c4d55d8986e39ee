pub mod cli;
pub mod columns;
pub mod console;
pub mod page;
pub mod preprocess;
pub mod recognizer;
pub mod region;
pub mod segmenter;
pub mod session;
pub mod settings;
pub mod speech;
