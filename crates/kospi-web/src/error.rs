use thiserror::Error;

/// Binary-level failures mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] kospi_core::ConfigError),

    #[error(transparent)]
    Warehouse(#[from] kospi_warehouse::WarehouseError),

    #[error(transparent)]
    Service(#[from] kospi_core::ServiceError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Warehouse(_) => 4,
            Self::Service(_) => 3,
            Self::Io(_) => 10,
        }
    }
}
