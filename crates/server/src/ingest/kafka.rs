// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kafka-backed frame source.
//!
//! One consumer group, one topic. Offsets auto-commit, so a frame the
//! handler rejects is not redelivered.

use bytes::Bytes;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::{ClientConfig, Message};

use crate::config::KafkaConfig;
use crate::ingest::FrameSource;

pub struct KafkaSource {
    consumer: StreamConsumer,
}

impl KafkaSource {
    /// Build the consumer and subscribe to the configured topic.
    pub fn connect(config: &KafkaConfig) -> anyhow::Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", config.brokers.join(","))
            .set("group.id", &config.group_id)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.auto.commit", "true")
            .create()?;
        consumer.subscribe(&[config.topic.as_str()])?;
        tracing::info!(topic = %config.topic, group_id = %config.group_id, "subscribed to bus topic");
        Ok(Self { consumer })
    }
}

impl FrameSource for KafkaSource {
    async fn read(&mut self) -> anyhow::Result<Bytes> {
        let message = self.consumer.recv().await?;
        tracing::debug!(
            topic = message.topic(),
            partition = message.partition(),
            offset = message.offset(),
            "bus message received"
        );
        Ok(Bytes::copy_from_slice(message.payload().unwrap_or_default()))
    }

    fn close(&mut self) {
        tracing::info!("closing bus consumer");
        self.consumer.unsubscribe();
    }
}
