pub mod notification;
pub mod post;
pub mod profile;

pub use notification::*;
pub use post::*;
pub use profile::*;
