pub mod connection;
pub mod datastore;
pub mod rpc_error;
pub mod serializer;

pub use connection::{Connection, ConnectionBuilder};
pub use datastore::{
    Datastore, HttpDatastore, HttpDatastoreBuilder, InMemoryDatastore, NoopTokenProvider,
    TokenProvider, TokenProviderArc, WriteOperation, WriteRule,
};
pub use rpc_error::map_http_error;
pub use serializer::JsonProtoSerializer;
