use zion_sdk::TradeService;

/// Shared by every request handler.
pub struct AppState<W, B> {
    pub service: TradeService<W, B>,
}

impl<W, B> AppState<W, B> {
    pub fn new(service: TradeService<W, B>) -> Self {
        Self { service }
    }
}

// Derive would require `W: Clone` and `B: Clone`.
impl<W, B> Clone for AppState<W, B> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}
