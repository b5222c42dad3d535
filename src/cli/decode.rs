//! Decode command implementation

use crate::config::Config;
use crate::decoder::PriceDecoder;
use crate::sink::FeedEvent;
use base64::Engine;
use clap::Args;

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Base64 account data, as found in `value.data[0]` of a notification
    pub payload: String,

    /// Slot to tag the output with
    #[arg(long, default_value = "0")]
    pub slot: u64,
}

impl DecodeArgs {
    /// Decode the payload into the event the live feed would emit
    pub fn event(&self, config: &Config) -> anyhow::Result<FeedEvent> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(self.payload.trim())
            .map_err(|e| anyhow::anyhow!("Invalid base64 payload: {}", e))?;

        let decoder = PriceDecoder::new(config.layout.clone());
        Ok(match decoder.decode(&data) {
            Ok(observation) => FeedEvent::Price {
                slot: self.slot,
                observation,
            },
            Err(error) => FeedEvent::DecodeFailed {
                slot: self.slot,
                error,
            },
        })
    }

    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let event = self.event(config)?;
        println!("{}", serde_json::to_string_pretty(&event)?);
        Ok(())
    }
}
