pub mod home;
pub mod media;
pub mod portfolio;
