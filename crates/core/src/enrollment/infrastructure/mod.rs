pub mod reference_file;
