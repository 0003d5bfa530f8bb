//! relwatch-source-filelist: the filelist.io tracker collaborator.
//! HTTP search client plus profile-page credential discovery, implementing
//! the seams defined in `relwatch-core::source`.

pub mod client;
pub mod credentials;

pub use client::{ClientError, FilelistClient};
pub use credentials::ProfileScraper;
