use crate::config::Config;
use mongodb::{Client as MongoClient, Database};

use gemini_service::GeminiClient;
use youtube_service::YouTubeClient;

pub struct AppState {
    pub config: Config,
    pub mongo: Database,
    pub gemini: GeminiClient,
    pub youtube: YouTubeClient,
}

impl AppState {
    pub async fn new(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        // External clients are constructed once here and injected through
        // the state; credentials come from Config, never read ad hoc.
        let gemini = GeminiClient::new(&config);
        let youtube = YouTubeClient::new(config.youtube_api_key.clone());

        Ok(Self {
            config,
            mongo,
            gemini,
            youtube,
        })
    }
}

pub mod course_service;
pub mod enrollment_service;
pub mod gemini_service;
pub mod youtube_service;
