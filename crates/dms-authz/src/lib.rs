//! Auth context resolution, permission-scope resolution, and ABAC team-code
//! resolution for the search & authorization engine (spec §4.7.1–§4.7.3).

mod abac;
mod context;
mod error;
mod jwks;
mod scopes;
mod session_cache;

pub use abac::resolve_team_entity_keys;
pub use context::{resolve_auth_context, AuthContext, JwksEndpoints};
pub use error::AuthzError;
pub use jwks::JwksCache;
pub use scopes::{scopes_for, MicroserviceEntry, MicroservicesData, TeamEntry, WILDCARD_TEAM};
pub use session_cache::{InMemorySessionCache, RedisSessionCache, SessionCache};
