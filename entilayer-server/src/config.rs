//! Command line and environment configuration.

use std::net::{IpAddr, SocketAddr};

use clap::{Parser, ValueEnum};

/// Storage backend selection.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreKind {
    /// MongoDB server reached through `--mongodb-uri`
    #[default]
    Mongodb,
    /// Process-local store, lost on exit
    Memory,
}

/// Arguments for the entilayer server
#[derive(Parser, Debug, Clone)]
#[command(name = "entilayer", version, about = "REST service for schema-less entity collections")]
pub struct ServerArgs {
    /// Address to bind to
    #[arg(long, env = "ENTILAYER_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, short = 'p', env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Storage backend
    #[arg(long, env = "ENTILAYER_STORE", value_enum, default_value_t = StoreKind::Mongodb)]
    pub store: StoreKind,

    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://127.0.0.1:27017")]
    pub mongodb_uri: String,

    /// Database holding the entity collections
    #[arg(long, env = "ENTILAYER_DATABASE", default_value = "entilayer")]
    pub database: String,

    /// Enable debug logging (unless RUST_LOG is set)
    #[arg(long)]
    pub debug: bool,
}

impl ServerArgs {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
