pub mod ruz;
