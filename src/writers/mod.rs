/// Contains writers for the accuracy (`.qscore.txt`) files
pub mod accuracy_writer;
/// Output path helpers
pub mod paths;
/// Contains the writer for optimization progression (`.opt.txt`) files
pub mod progress_writer;
