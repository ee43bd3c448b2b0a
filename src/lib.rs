pub mod acs_fetch;
pub mod api_client;
pub mod cache_store;
pub mod error;
pub mod fake_source;
pub mod match_doc;
pub mod pairing;
pub mod report;
pub mod riot_fetch;
pub mod roster;
pub mod scan;
pub mod source;
