use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] forge_core::ConfigError),
    #[error(transparent)]
    Assets(#[from] forge_assets::AssetsError),
    #[error(transparent)]
    Runtime(#[from] forge_runtime::RuntimeError),
    #[error(transparent)]
    Storage(#[from] forge_storage::StorageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
