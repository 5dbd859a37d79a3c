pub mod poses;
pub mod predict;
