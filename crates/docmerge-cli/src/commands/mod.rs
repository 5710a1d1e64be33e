pub mod columns;
pub mod generate;
pub mod inspect;
