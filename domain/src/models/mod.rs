mod zipcode;

pub use zipcode::*;
