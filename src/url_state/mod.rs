//! Table state as URL query parameters
//!
//! - [`query_codec`]: readable `page=2&sort=name&filter_status=open` form
//! - [`compact`]: short-key JSON packed into base64
//! - [`remote_query`]: parameters for server-driven tables

pub mod compact;
pub mod query_codec;
pub mod remote_query;

pub use compact::{decode_compact, encode_compact, try_decode_compact};
pub use query_codec::{
    decode_query, encode_query, is_state_empty, shareable_url, try_decode_query,
    update_query_partially, QueryPatch,
};
pub use remote_query::{remote_query_pairs, remote_query_string, RemoteDialect};
