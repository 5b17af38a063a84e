mod da;
mod fetcher;
mod origin;
mod s3;

pub use da::DaOrigin;
pub use fetcher::{FetchOutcome, Fetcher};
pub use s3::S3Origin;

#[cfg(test)]
mod tests;
