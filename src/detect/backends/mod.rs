pub mod fixture;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use fixture::FixtureBackend;
pub use stub::StubBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
