pub mod identity;
pub mod traits;
pub mod voice;
