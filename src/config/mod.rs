pub mod schema;

pub use schema::{
    AuthConfig, AvatarConfig, BlobStoreConfig, Config, DatabaseConfig, OpenAiConfig,
    PipelineConfig, PresignConfig, RecoveryConfig, ResilienceConfig, ServerConfig, SttConfig,
    TargetPolicy, TtsConfig, VoiceConfig,
};
