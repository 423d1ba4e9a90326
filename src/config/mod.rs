mod bot_config;

pub use bot_config::{
    BotConfig, DropContract, FaucetConfig, GasConfig, MintConfig, NodeConfig, RetrySettings,
    TransferConfig,
};
