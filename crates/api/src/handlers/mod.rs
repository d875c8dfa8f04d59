pub mod reference;
pub mod results;
pub mod verification;
