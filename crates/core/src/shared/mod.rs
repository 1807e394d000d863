pub mod constants;
pub mod descriptor;
pub mod frame;
pub mod settings;
