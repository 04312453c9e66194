use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::backends::memory::{MemorySubscription, MemoryTopic};
use crate::backends::stub::{BlockingSubscription, FailingSubscription};
use crate::config::PipelineConfig;
use crate::engine::{PipelineParams, SubscriberPipeline};
use crate::errors::StageError;
use crate::message::{Message, TRACE_ID_ATTRIBUTE};
use crate::publisher::{PublishInput, PublisherClient};

/// Integration tests for complete subscriber pipelines over in-memory subscriptions
#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    fn numbered(count: usize) -> Vec<Message> {
        (0..count).map(|i| Message::new(i.to_string())).collect()
    }

    fn parse(msg: Message) -> anyhow::Result<i64> {
        Ok(String::from_utf8(msg.data)?.trim().parse::<i64>()?)
    }

    fn params(subscription: impl crate::traits::Subscription + 'static) -> PipelineParams {
        PipelineParams::new(Arc::new(subscription))
    }

    #[tokio::test]
    async fn test_identity_map_preserves_order() {
        let mut running = SubscriberPipeline::must_new(params(MemorySubscription::from_messages(
            numbered(100),
        )))
        .map(parse)
        .run(CancellationToken::new());

        for expected in 0..100 {
            let value = timeout(WAIT, running.recv()).await.unwrap();
            assert_eq!(value, Some(expected));
        }
        assert_eq!(timeout(WAIT, running.recv()).await.unwrap(), None);
        assert!(running.errors().try_recv().is_err());
        timeout(WAIT, running.join()).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_map_batch_reduce_sums_each_batch() {
        let mut running = SubscriberPipeline::must_new(params(MemorySubscription::from_messages(
            numbered(9),
        )))
        .map(parse)
        .batch(3, Duration::from_secs(10))
        .reduce(|sum: i64, value: i64, _| Ok(sum + value), || 0)
        .run(CancellationToken::new());

        let mut totals = Vec::new();
        while let Some(total) = timeout(WAIT, running.recv()).await.unwrap() {
            totals.push(total);
        }

        assert_eq!(totals, vec![3, 12, 21]);
        assert_eq!(running.dropped_errors(), 0);
        assert!(timeout(WAIT, running.errors().recv()).await.unwrap().is_none());
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Reading {
        group: String,
        value: i64,
    }

    #[tokio::test]
    async fn test_reduce_groups_batches_by_key() {
        let readings = [("a", 1), ("b", 10), ("a", 2), ("c", 100), ("b", 20)];
        let messages = readings
            .iter()
            .map(|(group, value)| {
                let body = serde_json::json!({ "group": group, "value": value });
                Message::new(serde_json::to_vec(&body).unwrap())
            })
            .collect();

        let mut running = SubscriberPipeline::must_new(params(MemorySubscription::from_messages(
            messages,
        )))
        .map(|msg: Message| Ok(msg.decode_json::<Reading>()?))
        .batch(5, Duration::from_secs(10))
        .reduce(
            |mut totals: BTreeMap<String, i64>, reading: Reading, _| {
                *totals.entry(reading.group).or_default() += reading.value;
                Ok(totals)
            },
            BTreeMap::new,
        )
        .run(CancellationToken::new());

        let totals = timeout(WAIT, running.recv()).await.unwrap().unwrap();
        assert_eq!(
            totals,
            BTreeMap::from([("a".to_string(), 3), ("b".to_string(), 30), ("c".to_string(), 100)])
        );
        assert_eq!(timeout(WAIT, running.recv()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failures_reach_error_channel_while_outputs_continue() {
        let (mut output, mut errors, handle) = SubscriberPipeline::must_new(params(
            MemorySubscription::from_messages(numbered(9)),
        ))
        .map(|msg: Message| {
            let value = parse(msg)?;
            anyhow::ensure!(value % 3 != 0, "multiple of three: {}", value);
            Ok(value)
        })
        .run(CancellationToken::new())
        .into_parts();

        let drain = tokio::spawn(async move {
            let mut collected = Vec::new();
            while let Some(error) = errors.recv().await {
                collected.push(error);
            }
            collected
        });

        let mut values = Vec::new();
        while let Some(value) = timeout(WAIT, output.recv()).await.unwrap() {
            values.push(value);
        }
        timeout(WAIT, handle.join()).await.unwrap().unwrap();
        let failures = timeout(WAIT, drain).await.unwrap().unwrap();

        assert_eq!(values, vec![1, 2, 4, 5, 7, 8]);
        assert_eq!(failures.len(), 3);
        assert!(failures.iter().all(|e| matches!(e, StageError::Map(_))));
    }

    #[tokio::test]
    async fn test_non_list_values_are_skipped_by_reducer() {
        let messages = vec![
            Message::new("[1,2,3]"),
            Message::new("\"scalar\""),
            Message::new("[4]"),
        ];

        let mut running = SubscriberPipeline::must_new(params(MemorySubscription::from_messages(
            messages,
        )))
        .map(|msg: Message| Ok(msg.decode_json::<serde_json::Value>()?))
        .reduce(
            |sum: i64, item: serde_json::Value, _| {
                item.as_i64()
                    .map(|n| sum + n)
                    .ok_or_else(|| anyhow::anyhow!("not a number: {}", item))
            },
            || 0,
        )
        .run(CancellationToken::new());

        assert_eq!(timeout(WAIT, running.recv()).await.unwrap(), Some(6));
        assert_eq!(timeout(WAIT, running.recv()).await.unwrap(), Some(4));
        assert_eq!(timeout(WAIT, running.recv()).await.unwrap(), None);

        let error = timeout(WAIT, running.errors().recv()).await.unwrap().unwrap();
        assert!(matches!(error, StageError::NonListValue));
        assert_eq!(error.stage(), "reducer");
    }

    #[tokio::test]
    async fn test_subscription_failure_surfaces_once() {
        let subscription = FailingSubscription::new(numbered(2), "connection reset");
        let mut running = SubscriberPipeline::must_new(params(subscription))
            .map(parse)
            .run(CancellationToken::new());

        assert_eq!(timeout(WAIT, running.recv()).await.unwrap(), Some(0));
        assert_eq!(timeout(WAIT, running.recv()).await.unwrap(), Some(1));
        assert_eq!(timeout(WAIT, running.recv()).await.unwrap(), None);

        let error = timeout(WAIT, running.errors().recv()).await.unwrap().unwrap();
        assert!(matches!(error, StageError::Subscription(_)));
        assert_eq!(error.to_string(), "subscription receive failed: connection reset");
        assert!(timeout(WAIT, running.errors().recv()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undrained_errors_are_dropped_not_blocking() {
        let mut config = PipelineConfig::default();
        config.error_buffer = Some(2);
        let pipeline_params =
            params(MemorySubscription::from_messages(numbered(10))).with_config(config);

        let mut running = SubscriberPipeline::must_new(pipeline_params)
            .map(|_: Message| -> anyhow::Result<i64> { anyhow::bail!("rejected") })
            .run(CancellationToken::new());

        // the stage finishes even though nobody reads the error channel
        assert_eq!(timeout(WAIT, running.recv()).await.unwrap(), None);
        assert_eq!(running.dropped_errors(), 8);

        let mut buffered = 0;
        while let Ok(Some(_)) = timeout(WAIT, running.errors().recv()).await {
            buffered += 1;
        }
        assert_eq!(buffered, 2);
    }

    #[tokio::test]
    async fn test_cancellation_stops_every_stage() {
        let token = CancellationToken::new();
        let mut running = SubscriberPipeline::must_new(params(BlockingSubscription))
            .map(parse)
            .batch(10, Duration::from_secs(10))
            .reduce(|sum: i64, value: i64, _| Ok(sum + value), || 0)
            .run(token.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        assert_eq!(timeout(WAIT, running.recv()).await.unwrap(), None);
        assert!(timeout(WAIT, running.errors().recv()).await.unwrap().is_none());
        timeout(WAIT, running.join()).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancellation_with_items_in_flight() {
        let (sender, subscription) = MemorySubscription::channel(16);
        let mut running = SubscriberPipeline::must_new(params(subscription))
            .map(parse)
            .batch(100, Duration::from_secs(10))
            .run(CancellationToken::new());

        for message in numbered(5) {
            sender.send(message).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        running.cancel();

        // a partial batch is discarded on cancellation
        assert_eq!(timeout(WAIT, running.recv()).await.unwrap(), None);
        timeout(WAIT, running.join()).await.unwrap().unwrap();
        drop(sender);
    }

    #[tokio::test]
    async fn test_published_messages_flow_through_pipeline() {
        let (topic, subscription) = MemoryTopic::with_subscription(8);
        let client = PublisherClient::new(topic);

        let inputs = vec![
            PublishInput::new(Reading { group: "a".into(), value: 1 }),
            PublishInput::new(Reading { group: "a".into(), value: 2 }),
        ];
        let failures = client.publish(Some("trace-1"), inputs).await;
        assert!(failures.is_empty());
        drop(client);

        let mut running = SubscriberPipeline::must_new(params(subscription))
            .map(|msg: Message| {
                let trace = msg.attribute(TRACE_ID_ATTRIBUTE).unwrap_or_default().to_string();
                Ok((trace, msg.decode_json::<Reading>()?.value))
            })
            .run(CancellationToken::new());

        assert_eq!(
            timeout(WAIT, running.recv()).await.unwrap(),
            Some(("trace-1".to_string(), 1))
        );
        assert_eq!(
            timeout(WAIT, running.recv()).await.unwrap(),
            Some(("trace-1".to_string(), 2))
        );
        assert_eq!(timeout(WAIT, running.recv()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unread_output_holds_back_the_subscription() {
        let (sender, subscription) = MemorySubscription::channel(1);
        let mut running = SubscriberPipeline::must_new(params(subscription))
            .map(parse)
            .run(CancellationToken::new());

        let accepted = Arc::new(AtomicUsize::new(0));
        let feeder = tokio::spawn({
            let accepted = Arc::clone(&accepted);
            async move {
                for message in numbered(50) {
                    sender.send(message).await.unwrap();
                    accepted.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        // subscription, receiver output and mapper output channels hold one
        // message each, and the receiver and mapper each hold one more
        let in_flight = accepted.load(Ordering::SeqCst);
        assert!(in_flight <= 5, "{} messages accepted with no reader", in_flight);
        assert!(!feeder.is_finished());

        let mut values = Vec::new();
        while let Some(value) = timeout(WAIT, running.recv()).await.unwrap() {
            values.push(value);
        }
        assert_eq!(values, (0..50).collect::<Vec<i64>>());
        assert_eq!(accepted.load(Ordering::SeqCst), 50);
        timeout(WAIT, feeder).await.unwrap().unwrap();
    }
}
