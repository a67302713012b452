// Adapters layer: concrete backend capability providers (in-memory and http).

pub mod fixture;
pub mod http;
pub mod synthesized;

pub use fixture::FixtureProvider;
pub use http::HttpProvider;
pub use synthesized::SynthesizingProvider;
