pub mod palette;
pub mod pixel_grid;
pub mod scorer;
pub mod selector;
