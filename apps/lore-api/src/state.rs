use std::sync::Arc;

use lore_service::LoreService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<LoreService>,
}
impl AppState {
	pub fn new(config: lore_config::Config) -> color_eyre::Result<Self> {
		let service = LoreService::new(config)?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: LoreService) -> Self {
		Self { service: Arc::new(service) }
	}
}
