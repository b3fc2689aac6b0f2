//! Application context - wires everything together

use quorum_approval::{
    EngineConfig, IntentService, SqliteTransactionStore, ThresholdAuthorizationEngine,
};
use quorum_ledger::{MockLedger, ResilientGateway, SANDBOX_NETWORK};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Application context - wires together all components
pub struct AppContext {
    pub ledger: Arc<MockLedger>,
    pub engine: Arc<ThresholdAuthorizationEngine>,
    pub intents: IntentService,
    data_path: PathBuf,
}

impl AppContext {
    /// Create a new application context over `data_path`.
    ///
    /// The engine configuration comes from `config_path` when given, else
    /// from `config.json` in the data directory, else defaults.
    pub async fn new(
        data_path: impl AsRef<Path>,
        config_path: Option<&Path>,
    ) -> Result<Self, anyhow::Error> {
        let data_path = data_path.as_ref();
        std::fs::create_dir_all(data_path)?;

        let config = Self::load_config(data_path, config_path)?;

        let ledger = Arc::new(MockLedger::open(
            data_path.join("ledger.json"),
            SANDBOX_NETWORK,
        )?);
        let gateway = ResilientGateway::new(Arc::clone(&ledger), config.ledger_timeout());
        let store = SqliteTransactionStore::open(data_path.join("transactions.db"))?;

        let engine = Arc::new(ThresholdAuthorizationEngine::new(
            Arc::new(gateway),
            Arc::new(store),
            config,
        ));
        let intents = IntentService::new(Arc::clone(&engine));

        info!(data = %data_path.display(), "Context ready");

        Ok(Self {
            ledger,
            engine,
            intents,
            data_path: data_path.to_path_buf(),
        })
    }

    fn load_config(data_path: &Path, config_path: Option<&Path>) -> Result<EngineConfig, anyhow::Error> {
        let default_path = data_path.join("config.json");
        let path = match config_path {
            Some(path) => path,
            None if default_path.exists() => default_path.as_path(),
            None => {
                debug!("No config file, using defaults");
                return Ok(EngineConfig::default());
            }
        };
        let config = EngineConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e))?;
        debug!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    /// Get data directory path
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }
}
