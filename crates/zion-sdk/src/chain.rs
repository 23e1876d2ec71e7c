use lwk_wollet::blocking::BlockchainBackend;
use lwk_wollet::elements::{Transaction, Txid};
use lwk_wollet::{ElectrumClient, ElectrumUrl};

use crate::error::{Error, Result};

/// Submits fully signed transactions to the network.
pub trait Broadcaster {
    /// Broadcast a signed transaction and return its txid.
    fn broadcast(&self, tx: &Transaction) -> Result<Txid>;
}

/// Electrum-based chain backend for Liquid.
#[derive(Debug, Clone)]
pub struct ElectrumBackend {
    electrum_url: String,
}

impl ElectrumBackend {
    pub fn new(electrum_url: &str) -> Self {
        Self {
            electrum_url: electrum_url.to_string(),
        }
    }

    /// Open a new connection to the configured server.
    pub fn client(&self) -> Result<ElectrumClient> {
        let url: ElectrumUrl = self
            .electrum_url
            .parse()
            .map_err(|e| Error::Electrum(format!("{:?}", e)))?;
        ElectrumClient::new(&url).map_err(|e| Error::Electrum(e.to_string()))
    }
}

impl Broadcaster for ElectrumBackend {
    fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        let client = self.client()?;
        client
            .broadcast(tx)
            .map_err(|e| Error::BroadcastFailed(e.to_string()))
    }
}

impl<B: Broadcaster + ?Sized> Broadcaster for std::sync::Arc<B> {
    fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        (**self).broadcast(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_url_is_an_electrum_error() {
        let backend = ElectrumBackend::new("not a url");
        assert!(matches!(backend.client(), Err(Error::Electrum(_))));
    }
}
