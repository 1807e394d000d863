pub mod descriptor_sets;
pub mod enrollment_engine;
pub mod session;
pub mod verification_engine;
