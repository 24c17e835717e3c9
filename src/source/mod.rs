pub mod corrector;
pub mod cursor;
pub mod fields;
pub mod legacy;
pub mod timestamp;
